use crate::types::SourceId;
use service::ServiceError;
use thiserror::Error;

/// Errors produced by workspace operations.
///
/// Nothing here is globally fatal: file-level failures are scoped to the
/// file that caused them and never abort sibling ingestion.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LibraryError {
    #[error("unknown source file: {0}")]
    UnknownSource(SourceId),

    /// Detection was ambiguous and no explicit kind was supplied; the file
    /// stays pending until the user decides.
    #[error("an explicit kind is required for `{name}`")]
    KindRequired { name: String },

    /// The authoritative parser rejected the content for the chosen kind.
    /// Recoverable: reclassify with a different kind.
    #[error("parse failed for `{name}`: {source}")]
    ParseFailed {
        name: String,
        #[source]
        source: ServiceError,
    },

    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Errors from the summary persistence layer.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PersistError {
    #[error("summary store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("summary store payload malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unsupported summary schema version {found} (expected {expected})")]
    SchemaVersion { found: u32, expected: u32 },
}
