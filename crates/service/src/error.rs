use detect::SourceKind;
use thiserror::Error;

/// Errors surfaced by the external data/plotting service.
///
/// All variants are cloneable and comparable so callers can store them in
/// cache entries and tests can assert on exact outcomes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ServiceError {
    /// The authoritative parser rejected the content for the chosen kind.
    /// Recoverable: the user can pick a different kind and reclassify.
    #[error("parse rejected for kind {kind}: {reason}")]
    ParseRejected { kind: SourceKind, reason: String },

    /// A stable identity was presented that the service no longer knows.
    /// The caller falls back to raw content, or fails the fetch if no
    /// content is available locally.
    #[error("stable identity expired or unknown: {0}")]
    IdentityExpired(String),

    /// The remote computation failed (service-side error or bad request).
    #[error("computation failed: {0}")]
    ComputeFailed(String),

    /// The image render call failed.
    #[error("render failed: {0}")]
    RenderFailed(String),

    /// Transport-level failure reaching the service.
    #[error("service unreachable: {0}")]
    Unavailable(String),
}

impl ServiceError {
    /// True when retrying the same request later could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ServiceError::Unavailable(_) | ServiceError::ComputeFailed(_)
        )
    }
}
