use serde::{Deserialize, Serialize};
use service::SeriesData;
use signature::Signature;
use std::fmt;
use uuid::Uuid;

/// Opaque identifier for one configured series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeriesId(Uuid);

impl SeriesId {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Fetch state of one series' cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    /// No configuration has been seen for this series yet.
    Absent,
    /// A fetch for the current signature is outstanding.
    Pending,
    /// The payload matches the current signature.
    Ready,
    /// The fetch for the current signature failed; retry is manual.
    Error,
}

/// Cached derived-data state for one series.
///
/// `generation` increments on every fetch issued for this series; a
/// completion commits only when its captured generation (and signature)
/// still match, which is what keeps slow stale responses from overwriting
/// a newer result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub status: FetchStatus,
    pub signature: Option<Signature>,
    pub payload: Option<SeriesData>,
    pub error: Option<String>,
    pub generation: u64,
}

impl Default for CacheEntry {
    fn default() -> Self {
        Self {
            status: FetchStatus::Absent,
            signature: None,
            payload: None,
            error: None,
            generation: 0,
        }
    }
}

impl CacheEntry {
    pub fn is_ready(&self) -> bool {
        self.status == FetchStatus::Ready
    }
}

/// Broadcast whenever a series entry changes state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheEvent {
    pub series: SeriesId,
    pub status: FetchStatus,
    pub generation: u64,
}

/// Broadcast when a debounced render resolves. `error` is `None` when the
/// image was committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderEvent {
    pub generation: u64,
    pub error: Option<String>,
}
