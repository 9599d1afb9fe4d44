//! Source-file workspace for the xsplot engine.
//!
//! This is where uploads enter the system. The store owns every ingested
//! file and walks it through its lifecycle:
//!
//! ```text
//! Pending ──(kind assigned)──▶ Classifying ──▶ Ready
//!                                   │
//!                                   └────────▶ Error ──(reclassify)──▶ Classifying
//! ```
//!
//! Classification is a user decision first: without an explicit kind a
//! file stays `Pending`, and heuristic detection is an opt-in courtesy.
//! Authoritative parsing is delegated to the external service; a rejection
//! marks only that file and is recoverable by picking a different kind.
//!
//! Sessions that opt into durability persist per-scope summary records
//! (never raw content) through the versioned [`SummaryStore`] interface;
//! guest sessions use [`NoopSummaryStore`] and always start empty.

mod error;
mod persist;
mod store;
mod types;

pub use crate::error::{LibraryError, PersistError};
pub use crate::persist::{
    JsonFileStore, MemorySummaryStore, NoopSummaryStore, SourceSummary, SummaryStore,
    SUMMARY_SCHEMA_VERSION,
};
pub use crate::store::SourceLibrary;
pub use crate::types::{hash_content, SourceFile, SourceId, SourceStatus, UploadedFile};
