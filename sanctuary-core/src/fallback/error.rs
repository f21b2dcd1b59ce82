use thiserror::Error;

pub type FallbackResult<T> = Result<T, FallbackError>;

#[derive(Debug, Error)]
pub enum FallbackError {
    #[error("browser service returned {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("storage service returned {status}: {message}")]
    Storage { status: u16, message: String },
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("no media candidate in scrape results")]
    NoCandidate,
    #[error("payload too small to be media: {0} bytes")]
    PayloadTooSmall(usize),
}
