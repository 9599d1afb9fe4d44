//! External service contract for the xsplot engine.
//!
//! The engine never computes cross sections or renders figures itself —
//! both are delegated to a remote data/plotting backend. This crate pins
//! down that boundary: the [`DataService`] trait, the request/response
//! types that cross it, and the typed errors that come back.
//!
//! Timeouts, retries, and backoff are the implementation's business, not
//! the engine's; a hung call simply never resolves and the caller's
//! staleness machinery deals with it.
//!
//! [`ScriptedService`] is the deterministic in-memory implementation used
//! by tests and the demo binary.

use async_trait::async_trait;
use detect::SourceKind;

mod error;
mod scripted;
mod types;

pub use crate::error::ServiceError;
pub use crate::scripted::{ComputeHandle, RenderCall, RenderHandle, ScriptedService};
pub use crate::types::{
    ComputeRequest, FigureConfig, ImageFormat, Quantity, RenderQuality, RenderedImage, SeriesData,
    SeriesParams, SeriesSnapshot, SourceIdentity, SourceMetadata, UncertaintyBand,
};

/// The remote data/plotting backend.
///
/// Implementations must be safe to share across tasks; the engine clones
/// one `Arc<dyn DataService>` into every in-flight request.
#[async_trait]
pub trait DataService: Send + Sync {
    /// Authoritative parsing of uploaded content for an explicit kind.
    ///
    /// May disagree with the local heuristic guess; callers surface a
    /// "try a different kind" recovery flow on rejection.
    async fn classify_and_parse(
        &self,
        kind: SourceKind,
        content: &str,
    ) -> Result<SourceMetadata, ServiceError>;

    /// Compute one derived data series. Called with either a stable
    /// identity or raw content (the [`SourceIdentity`] enum guarantees one
    /// of the two is present).
    async fn compute_series(&self, request: ComputeRequest) -> Result<SeriesData, ServiceError>;

    /// Regenerate the full figure image from resolved series data.
    async fn render_image(
        &self,
        series: &[SeriesSnapshot],
        figure: &FigureConfig,
        quality: RenderQuality,
    ) -> Result<RenderedImage, ServiceError>;
}
