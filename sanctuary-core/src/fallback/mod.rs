mod browserless;
mod error;
mod fetch;
mod service;
mod storage;

pub use browserless::{
    BrowserlessClient, HeadlessBrowser, ScrapeElement, ScrapeReport, ScrapeSelector, ScrapeValue,
    MEDIA_SELECTORS, NAVIGATION_TIMEOUT_MS,
};
pub use error::{FallbackError, FallbackResult};
pub use fetch::{HttpMediaFetcher, MediaFetcher, BROWSER_USER_AGENT};
pub use service::{
    FallbackOutcome, FallbackRequest, FallbackService, MIN_MEDIA_BYTES, MIN_SIGNED_URL_SECONDS,
};
pub use storage::{BucketClient, ObjectStore};
