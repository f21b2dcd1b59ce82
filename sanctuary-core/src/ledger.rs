//! Viewing-session ledger backed by SQLite.
//!
//! Records session lifecycle (create, periodic duration upserts, terminal
//! end) and the per-user daily usage aggregate that gates the next playback
//! attempt. A session's usage is accumulated before `end_session` returns,
//! so the next quota evaluation always sees it.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::quota;
use crate::sqlite::configure_connection;
use crate::timer::TimerEvent;

const LEDGER_SCHEMA: &str = include_str!("../sql/sessions.sql");

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("failed to open ledger database {path}: {source}")]
    Open {
        source: rusqlite::Error,
        path: PathBuf,
    },
    #[error("failed to execute statement on ledger database: {0}")]
    Execute(#[from] rusqlite::Error),
    #[error("ledger path not configured")]
    MissingStore,
    #[error("viewing session not found: {0}")]
    NotFound(String),
    #[error("viewing session already ended: {0}")]
    SessionClosed(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Per-user wellness record: position in the program and usage so far today.
/// `total_watch_time_today` is reset daily by an external scheduled process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub user_id: String,
    pub current_day: i64,
    pub total_watch_time_today: i64,
}

impl Profile {
    pub fn remaining_seconds(&self) -> i64 {
        quota::remaining_seconds(self.current_day, self.total_watch_time_today)
    }

    pub fn remaining_minutes(&self) -> i64 {
        quota::remaining_minutes(self.current_day, self.total_watch_time_today)
    }
}

/// Read access to profiles. The fallback service depends on this seam so
/// its server-authoritative quota check can be exercised without SQLite.
pub trait ProfileStore: Send + Sync {
    fn load_profile(&self, user_id: &str) -> LedgerResult<Option<Profile>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewingSession {
    pub session_id: String,
    pub user_id: String,
    pub search_query: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub duration_seconds: i64,
    pub ended_at: Option<DateTime<Utc>>,
    pub was_auto_stopped: bool,
}

impl ViewingSession {
    pub fn active(&self) -> bool {
        self.ended_at.is_none()
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let started_at: Option<NaiveDateTime> = row.get("started_at")?;
        let ended_at: Option<NaiveDateTime> = row.get("ended_at")?;
        Ok(Self {
            session_id: row.get("session_id")?,
            user_id: row.get("user_id")?,
            search_query: row.get("search_query")?,
            started_at: started_at.map(|dt| Utc.from_utc_datetime(&dt)),
            duration_seconds: row.get("duration_seconds")?,
            ended_at: ended_at.map(|dt| Utc.from_utc_datetime(&dt)),
            was_auto_stopped: row.get("was_auto_stopped")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SessionLedgerBuilder {
    path: Option<PathBuf>,
    read_only: bool,
    create_if_missing: bool,
}

impl Default for SessionLedgerBuilder {
    fn default() -> Self {
        Self {
            path: None,
            read_only: false,
            create_if_missing: true,
        }
    }
}

impl SessionLedgerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn read_only(mut self, value: bool) -> Self {
        self.read_only = value;
        self
    }

    pub fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    pub fn build(self) -> LedgerResult<SessionLedger> {
        let path = self.path.ok_or(LedgerError::MissingStore)?;
        let mut flags = if self.read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY
        } else {
            OpenFlags::SQLITE_OPEN_READ_WRITE
        };
        if !self.read_only && self.create_if_missing {
            flags |= OpenFlags::SQLITE_OPEN_CREATE;
        }
        Ok(SessionLedger { path, flags })
    }
}

#[derive(Debug, Clone)]
pub struct SessionLedger {
    path: PathBuf,
    flags: OpenFlags,
}

impl SessionLedger {
    pub fn builder() -> SessionLedgerBuilder {
        SessionLedgerBuilder::new()
    }

    pub fn new(path: impl AsRef<Path>) -> LedgerResult<Self> {
        SessionLedgerBuilder::new().path(path).build()
    }

    fn open(&self) -> LedgerResult<Connection> {
        let conn = Connection::open_with_flags(&self.path, self.flags).map_err(|source| {
            LedgerError::Open {
                path: self.path.clone(),
                source,
            }
        })?;
        configure_connection(&conn).map_err(|source| LedgerError::Open {
            path: self.path.clone(),
            source,
        })?;
        Ok(conn)
    }

    pub fn initialize(&self) -> LedgerResult<()> {
        let conn = self.open()?;
        conn.execute_batch(LEDGER_SCHEMA)?;
        Ok(())
    }

    /// Creates a session record. Playback must not start unless this
    /// succeeds.
    pub fn create_session(&self, user_id: &str, query: Option<&str>) -> LedgerResult<String> {
        let session_id = Uuid::new_v4().to_string();
        let conn = self.open()?;
        conn.execute(
            "INSERT INTO viewing_sessions (session_id, user_id, search_query)
             VALUES (?1, ?2, ?3)",
            params![session_id, user_id, query],
        )?;
        debug!(session_id = %session_id, user_id = %user_id, "viewing session created");
        Ok(session_id)
    }

    /// Last-write-wins duration upsert. Duplicate or out-of-order writes are
    /// fine; the most recent call is authoritative. Fails once the session
    /// has ended.
    pub fn update_duration(&self, session_id: &str, elapsed_seconds: i64) -> LedgerResult<()> {
        let conn = self.open()?;
        let updated = conn.execute(
            "UPDATE viewing_sessions
             SET duration_seconds = ?1, updated_at = CURRENT_TIMESTAMP
             WHERE session_id = ?2 AND ended_at IS NULL",
            params![elapsed_seconds, session_id],
        )?;
        if updated == 0 {
            return match self.session_exists(&conn, session_id)? {
                true => Err(LedgerError::SessionClosed(session_id.to_string())),
                false => Err(LedgerError::NotFound(session_id.to_string())),
            };
        }
        Ok(())
    }

    /// Terminal write. Idempotent: ending an already-ended session is a
    /// no-op, and no later write can touch the record.
    pub fn end_session(&self, session_id: &str, was_auto_stopped: bool) -> LedgerResult<()> {
        let conn = self.open()?;
        let updated = conn.execute(
            "UPDATE viewing_sessions
             SET ended_at = CURRENT_TIMESTAMP,
                 was_auto_stopped = ?1,
                 updated_at = CURRENT_TIMESTAMP
             WHERE session_id = ?2 AND ended_at IS NULL",
            params![was_auto_stopped, session_id],
        )?;
        if updated == 0 && !self.session_exists(&conn, session_id)? {
            return Err(LedgerError::NotFound(session_id.to_string()));
        }
        Ok(())
    }

    pub fn fetch_session(&self, session_id: &str) -> LedgerResult<Option<ViewingSession>> {
        let conn = self.open()?;
        let session = conn
            .query_row(
                "SELECT session_id, user_id, search_query, started_at, duration_seconds,
                        ended_at, was_auto_stopped
                 FROM viewing_sessions WHERE session_id = ?1",
                params![session_id],
                ViewingSession::from_row,
            )
            .optional()?;
        Ok(session)
    }

    /// Adds `delta_seconds` to the user's daily aggregate in one atomic
    /// statement, creating the profile row on first use. Concurrent session
    /// ends for the same user serialize on this update instead of racing a
    /// read-modify-write.
    pub fn accumulate_daily_usage(&self, user_id: &str, delta_seconds: i64) -> LedgerResult<()> {
        let conn = self.open()?;
        conn.execute(
            "INSERT INTO profiles (user_id, current_day, total_watch_time_today, updated_at)
             VALUES (?1, 1, ?2, CURRENT_TIMESTAMP)
             ON CONFLICT(user_id) DO UPDATE SET
                 total_watch_time_today = total_watch_time_today + excluded.total_watch_time_today,
                 updated_at = CURRENT_TIMESTAMP",
            params![user_id, delta_seconds.max(0)],
        )?;
        Ok(())
    }

    pub fn upsert_profile(&self, profile: &Profile) -> LedgerResult<()> {
        let conn = self.open()?;
        conn.execute(
            "INSERT INTO profiles (user_id, current_day, total_watch_time_today, updated_at)
             VALUES (?1, ?2, ?3, CURRENT_TIMESTAMP)
             ON CONFLICT(user_id) DO UPDATE SET
                 current_day = excluded.current_day,
                 total_watch_time_today = excluded.total_watch_time_today,
                 updated_at = CURRENT_TIMESTAMP",
            params![
                profile.user_id,
                profile.current_day,
                profile.total_watch_time_today
            ],
        )?;
        Ok(())
    }

    fn session_exists(&self, conn: &Connection, session_id: &str) -> LedgerResult<bool> {
        let exists = conn
            .query_row(
                "SELECT 1 FROM viewing_sessions WHERE session_id = ?1",
                params![session_id],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        Ok(exists)
    }
}

impl ProfileStore for SessionLedger {
    fn load_profile(&self, user_id: &str) -> LedgerResult<Option<Profile>> {
        let conn = self.open()?;
        let profile = conn
            .query_row(
                "SELECT user_id, current_day, total_watch_time_today
                 FROM profiles WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok(Profile {
                        user_id: row.get("user_id")?,
                        current_day: row.get("current_day")?,
                        total_watch_time_today: row.get("total_watch_time_today")?,
                    })
                },
            )
            .optional()?;
        Ok(profile)
    }
}

/// Bridges timer events into ledger writes for one session.
///
/// Construction creates the session record; a failure here must block
/// playback. `PersistDue` refreshes the stored duration, and the terminal
/// event performs the final duration write, the terminal end write, and the
/// daily-usage accumulation in that order.
pub struct SessionRecorder {
    ledger: SessionLedger,
    session_id: String,
    user_id: String,
}

impl SessionRecorder {
    pub fn begin(
        ledger: SessionLedger,
        user_id: &str,
        query: Option<&str>,
    ) -> LedgerResult<Self> {
        let session_id = ledger.create_session(user_id, query)?;
        Ok(Self {
            ledger,
            session_id,
            user_id: user_id.to_string(),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn handle_event(&self, event: &TimerEvent) -> LedgerResult<()> {
        match event {
            TimerEvent::PersistDue { elapsed } => self
                .ledger
                .update_duration(&self.session_id, i64::from(*elapsed)),
            TimerEvent::Ended { reason, elapsed } => {
                self.ledger
                    .update_duration(&self.session_id, i64::from(*elapsed))?;
                self.ledger
                    .end_session(&self.session_id, reason.was_auto_stopped())?;
                self.ledger
                    .accumulate_daily_usage(&self.user_id, i64::from(*elapsed))?;
                info!(
                    session_id = %self.session_id,
                    elapsed,
                    auto_stopped = reason.was_auto_stopped(),
                    "viewing session ended"
                );
                Ok(())
            }
            TimerEvent::TimeUpdate { .. } | TimerEvent::LowTimeWarning { .. } => Ok(()),
        }
    }

    /// Consumes timer events until the terminal one, mirroring each into the
    /// ledger. Returns once the session has ended and its usage is durably
    /// recorded.
    pub async fn drive(&self, mut events: mpsc::Receiver<TimerEvent>) -> LedgerResult<()> {
        while let Some(event) = events.recv().await {
            let terminal = matches!(event, TimerEvent::Ended { .. });
            self.handle_event(&event)?;
            if terminal {
                break;
            }
        }
        Ok(())
    }
}
