pub mod config;
pub mod content;
pub mod embed;
pub mod error;
pub mod fallback;
pub mod ledger;
pub mod quota;
pub mod sqlite;
pub mod timer;

pub use config::{
    load_sanctuary_config, BrowserlessSection, LedgerSection, SanctuaryConfig, ServiceSection,
    StorageSection,
};
pub use content::{SavedItem, SearchResult};
pub use embed::{is_known_embeddable, resolve_embed_url, EmbedPlatform};
pub use error::{ConfigError, Result};
pub use fallback::{
    BrowserlessClient, BucketClient, FallbackError, FallbackOutcome, FallbackRequest,
    FallbackResult, FallbackService, HeadlessBrowser, HttpMediaFetcher, MediaFetcher, ObjectStore,
    ScrapeReport, ScrapeSelector, MEDIA_SELECTORS, MIN_MEDIA_BYTES, MIN_SIGNED_URL_SECONDS,
};
pub use ledger::{
    LedgerError, LedgerResult, Profile, ProfileStore, SessionLedger, SessionLedgerBuilder,
    SessionRecorder, ViewingSession,
};
pub use quota::{allowed_minutes, remaining_minutes, remaining_seconds, DAILY_LIMIT_MINUTES};
pub use timer::{
    spawn_session, EndReason, SessionHandle, SessionTimer, TimerCommand, TimerEvent, TimerPhase,
    LOW_TIME_WARNING_SECONDS, PERSIST_INTERVAL_SECONDS,
};
