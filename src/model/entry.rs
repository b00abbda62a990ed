//! Cache entries, statuses and the change sets returned by cache mutations.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Display;
use std::time::{SystemTime, UNIX_EPOCH};

/// Timestamp marking an entry whose freshness has been revoked.
pub const STALE_TIMESTAMP: u64 = 0;

/// Milliseconds since the Unix epoch, never equal to [`STALE_TIMESTAMP`].
pub fn now() -> u64 {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default();
    millis.max(STALE_TIMESTAMP + 1)
}

/// Lifecycle status of a cached entry or a fetch result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Complete,
    Partial,
    Pending,
    #[default]
    Stale,
    Error,
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Complete => write!(f, "complete"),
            Self::Partial => write!(f, "partial"),
            Self::Pending => write!(f, "pending"),
            Self::Stale => write!(f, "stale"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// What a query address currently returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryData {
    /// Member ids of a collection, in first-seen order.
    Ids(Vec<String>),
    /// The single id behind an item address.
    Id(String),
    /// Opaque snapshot of a singleton resource.
    Snapshot(Value),
}

impl QueryData {
    /// True when this is an id list containing `id`.
    pub fn lists(&self, id: &str) -> bool {
        matches!(self, Self::Ids(ids) if ids.iter().any(|i| i == id))
    }
}

/// One cached record: a fragment (entity snapshot) or a query result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<D> {
    pub status: Status,
    pub timestamp: u64,
    pub data: Option<D>,
}

impl<D> Default for CacheEntry<D> {
    fn default() -> Self {
        Self {
            status: Status::Stale,
            timestamp: STALE_TIMESTAMP,
            data: None,
        }
    }
}

impl<D> CacheEntry<D> {
    pub fn new(status: Status, timestamp: u64, data: Option<D>) -> Self {
        Self {
            status,
            timestamp,
            data,
        }
    }

    /// Revokes freshness, dropping the data too when `clear` is set.
    pub fn mark_stale(&mut self, clear: bool) {
        self.status = Status::Stale;
        self.timestamp = STALE_TIMESTAMP;
        if clear {
            self.data = None;
        }
    }

    pub fn apply(&mut self, patch: &Touch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(timestamp) = patch.timestamp {
            self.timestamp = timestamp;
        }
    }
}

impl<D: PartialEq> CacheEntry<D> {
    /// Timestamps are ignored: a refresh with identical content is not a change.
    pub fn same_content(&self, other: &Self) -> bool {
        self.status == other.status && self.data == other.data
    }
}

/// Metadata patch applied by `touch` without altering cached data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Touch {
    pub status: Option<Status>,
    pub timestamp: Option<u64>,
}

impl Touch {
    pub fn status(status: Status) -> Self {
        Self {
            status: Some(status),
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.timestamp.is_none()
    }
}

/// Result of a cache read. Always well formed, even for unknown addresses.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult {
    pub status: Status,
    pub timestamp: u64,
    pub data: Option<Value>,
}

impl Default for FetchResult {
    fn default() -> Self {
        Self {
            status: Status::Stale,
            timestamp: STALE_TIMESTAMP,
            data: None,
        }
    }
}

impl FetchResult {
    pub fn is_fresh(&self) -> bool {
        self.timestamp > STALE_TIMESTAMP && self.status == Status::Complete
    }
}

/// Fragment ids and query paths whose stored value changed during a mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Touched {
    pub fragments: Vec<String>,
    pub queries: Vec<String>,
}

impl Touched {
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty() && self.queries.is_empty()
    }

    pub fn fragment(&mut self, id: &str) {
        if !self.fragments.iter().any(|f| f == id) {
            self.fragments.push(id.to_string());
        }
    }

    pub fn query(&mut self, path: &str) {
        if !self.queries.iter().any(|q| q == path) {
            self.queries.push(path.to_string());
        }
    }
}
