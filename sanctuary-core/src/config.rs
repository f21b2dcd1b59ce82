use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// Environment variable overriding `browserless.api_key`.
pub const BROWSERLESS_API_KEY_VAR: &str = "SANCTUARY_BROWSERLESS_API_KEY";
/// Environment variable overriding `storage.service_key`.
pub const STORAGE_SERVICE_KEY_VAR: &str = "SANCTUARY_STORAGE_SERVICE_KEY";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SanctuaryConfig {
    pub service: ServiceSection,
    pub browserless: BrowserlessSection,
    pub storage: StorageSection,
    pub ledger: LedgerSection,
}

impl SanctuaryConfig {
    /// Validates that every credential the fallback service requires is
    /// present. Runs once at startup; requests never re-validate.
    pub fn validate(&self) -> Result<()> {
        if self.browserless.api_key.trim().is_empty() {
            return Err(ConfigError::MissingValue("browserless.api_key"));
        }
        if self.browserless.base_url.trim().is_empty() {
            return Err(ConfigError::MissingValue("browserless.base_url"));
        }
        if self.storage.service_key.trim().is_empty() {
            return Err(ConfigError::MissingValue("storage.service_key"));
        }
        if self.storage.bucket.trim().is_empty() {
            return Err(ConfigError::MissingValue("storage.bucket"));
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var(BROWSERLESS_API_KEY_VAR) {
            if !key.trim().is_empty() {
                self.browserless.api_key = key;
            }
        }
        if let Ok(key) = std::env::var(STORAGE_SERVICE_KEY_VAR) {
            if !key.trim().is_empty() {
                self.storage.service_key = key;
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceSection {
    pub environment: String,
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrowserlessSection {
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    /// Upper bound on page navigation inside the browser service.
    pub navigation_timeout_ms: u64,
    /// Settle time after load before scraping, in milliseconds.
    pub wait_for_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSection {
    pub base_url: String,
    pub bucket: String,
    #[serde(default)]
    pub service_key: String,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerSection {
    pub db_path: String,
}

impl LedgerSection {
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.db_path)
    }
}

pub fn load_sanctuary_config<P: AsRef<Path>>(path: P) -> Result<SanctuaryConfig> {
    let mut config: SanctuaryConfig = load_toml(path)?;
    config.apply_env_overrides();
    Ok(config)
}

fn load_toml<T, P>(path: P) -> Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        source,
        path: path.to_path_buf(),
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        source,
        path: path.to_path_buf(),
    })
}
