mod schema;
pub mod sqlite;
pub mod timestamp;

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use thiserror::Error;

pub use schema::{SCHEMA, SCHEMA_VERSION};
pub use sqlite::DiaryStore;

/// Errors surfaced by the diary store.
///
/// Missing rows that another row points at are logic bugs, not runtime
/// conditions, so they are reported instead of papered over.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("entry {0} does not exist")]
    EntryNotFound(i64),

    #[error("day {0} does not exist")]
    DayNotFound(i64),

    #[error("storage failure: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One calendar date: at most one photo and any number of entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Day {
    pub id: i64,
    /// Path of the attached photo, empty when there is none.
    pub filename: String,
    pub created: String,
}

impl Day {
    pub fn has_photo(&self) -> bool {
        !self.filename.is_empty()
    }

    /// The `yyyyMMdd` part of the creation timestamp.
    pub fn date_key(&self) -> &str {
        timestamp::date_key(&self.created)
    }
}

/// A single journal note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub id: i64,
    pub day_id: i64,
    pub message: String,
    pub mood: Option<String>,
    pub created: String,
}

pub const MAX_GRACE_PERIOD_HOURS: u32 = 168;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("accepted values are whole hours from 0 to {max}, got {0:?}", max = MAX_GRACE_PERIOD_HOURS)]
pub struct GracePeriodError(pub String);

/// Window after creation during which an entry's message and mood may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct GracePeriod(u32);

impl GracePeriod {
    pub fn new(hours: u32) -> Result<Self, GracePeriodError> {
        if hours > MAX_GRACE_PERIOD_HOURS {
            return Err(GracePeriodError(hours.to_string()));
        }
        Ok(Self(hours))
    }

    pub fn hours(&self) -> u32 {
        self.0
    }

    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.0))
    }
}

impl Default for GracePeriod {
    fn default() -> Self {
        Self(1)
    }
}

impl TryFrom<u32> for GracePeriod {
    type Error = GracePeriodError;

    fn try_from(hours: u32) -> Result<Self, Self::Error> {
        Self::new(hours)
    }
}

impl From<GracePeriod> for u32 {
    fn from(period: GracePeriod) -> Self {
        period.0
    }
}

/// Parses user input: digits only, no leading zero unless the value is `0`.
impl FromStr for GracePeriod {
    type Err = GracePeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || GracePeriodError(s.to_string());
        let well_formed = s == "0"
            || (!s.is_empty() && !s.starts_with('0') && s.bytes().all(|b| b.is_ascii_digit()));
        if !well_formed {
            return Err(invalid());
        }
        let hours: u32 = s.parse().map_err(|_| invalid())?;
        Self::new(hours).map_err(|_| invalid())
    }
}

/// Source of "now" for timestamps and grace period checks.
pub trait Clock: Send {
    fn now(&self) -> NaiveDateTime;
}

/// Local wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock(Arc<Mutex<NaiveDateTime>>);

impl ManualClock {
    pub fn new(start: NaiveDateTime) -> Self {
        Self(Arc::new(Mutex::new(start)))
    }

    pub fn set(&self, time: NaiveDateTime) {
        *self.0.lock().unwrap_or_else(|e| e.into_inner()) = time;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.0.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.0.lock().unwrap_or_else(|e| e.into_inner())
    }
}
