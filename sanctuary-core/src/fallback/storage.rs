//! Object-storage client: per-user uploads and time-boxed signed URLs.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::config::StorageSection;

use super::error::{FallbackError, FallbackResult};

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> FallbackResult<()>;
    async fn signed_url(&self, key: &str, expires_in_seconds: u64) -> FallbackResult<String>;
}

/// REST client for the managed storage bucket.
pub struct BucketClient {
    base_url: String,
    bucket: String,
    service_key: String,
    request_timeout: Duration,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SignResponse {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

impl BucketClient {
    pub fn new(section: &StorageSection) -> Self {
        Self {
            base_url: section.base_url.trim_end_matches('/').to_string(),
            bucket: section.bucket.clone(),
            service_key: section.service_key.clone(),
            request_timeout: Duration::from_millis(section.request_timeout_ms),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ObjectStore for BucketClient {
    async fn upload(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> FallbackResult<()> {
        let url = format!("{}/object/{}/{}", self.base_url, self.bucket, key);
        debug!(key, size = bytes.len(), "uploading object");
        let response = self
            .http
            .post(url)
            .timeout(self.request_timeout)
            .bearer_auth(&self.service_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FallbackError::Storage {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }

    async fn signed_url(&self, key: &str, expires_in_seconds: u64) -> FallbackResult<String> {
        let url = format!("{}/object/sign/{}/{}", self.base_url, self.bucket, key);
        let response = self
            .http
            .post(url)
            .timeout(self.request_timeout)
            .bearer_auth(&self.service_key)
            .json(&json!({ "expiresIn": expires_in_seconds }))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FallbackError::Storage {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        let signed: SignResponse = response.json().await?;
        if signed.signed_url.starts_with("http") {
            Ok(signed.signed_url)
        } else {
            let path = signed.signed_url.trim_start_matches('/');
            Ok(format!("{}/{}", self.base_url, path))
        }
    }
}
