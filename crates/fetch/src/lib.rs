//! Derived-data synchronization for the xsplot engine.
//!
//! Two async pipelines live here, both built on the same idea: tag every
//! issued request with what was true at issue time, and at completion
//! commit only if it is still true.
//!
//! - [`FetchCoordinator`] — the per-series derived-data cache. Keyed by
//!   series id, deduplicated by signature, guarded by generation tokens.
//! - [`RenderScheduler`] — the coarse full-image path. Time-based
//!   coalescing (debounce) plus the same generation-token staleness
//!   rejection.
//!
//! Neither aborts in-flight network operations; a superseded response is
//! simply dropped when it arrives. A hung call leaves its series
//! `Pending` until a newer configuration supersedes it or the user
//! retries — timeouts belong to the service implementation.

mod coordinator;
mod debounce;
mod types;

pub use crate::coordinator::FetchCoordinator;
pub use crate::debounce::{RenderScheduler, DEFAULT_QUIET_WINDOW};
pub use crate::types::{CacheEntry, CacheEvent, FetchStatus, RenderEvent, SeriesId};
