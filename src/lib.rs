//! Workspace umbrella crate for the xsplot engine.
//!
//! This crate stitches the pipeline stages together so a front end can
//! drive the whole derived-data synchronization engine through a single
//! [`PlotSession`]: ingest files into the workspace, configure series,
//! read cache entries, and kick debounced full-image renders.
//!
//! The stage crates remain usable on their own:
//!
//! - [`detect`] — content heuristics classifying uploads as ACE or ENDF
//! - [`library`] — the source-file workspace and persisted summaries
//! - [`signature`] — deterministic series fingerprints
//! - [`fetch`] — fetch coordination, caching, and debounced rendering
//! - [`service`] — the external data/plotting service contract

mod config;
mod session;

pub use crate::config::{ConfigLoadError, LibraryYamlConfig, RenderYamlConfig, XsplotConfig};
pub use crate::session::{PlotSession, SeriesConfig, SeriesStyle, SessionOptions};

pub use detect::{classify, classify_report, DetectReport, SourceKind};
pub use fetch::{
    CacheEntry, CacheEvent, FetchCoordinator, FetchStatus, RenderEvent, RenderScheduler, SeriesId,
    DEFAULT_QUIET_WINDOW,
};
pub use library::{
    JsonFileStore, LibraryError, MemorySummaryStore, NoopSummaryStore, PersistError, SourceFile,
    SourceId, SourceLibrary, SourceStatus, SourceSummary, SummaryStore, UploadedFile,
    SUMMARY_SCHEMA_VERSION,
};
pub use service::{
    ComputeRequest, DataService, FigureConfig, ImageFormat, Quantity, RenderQuality, RenderedImage,
    ScriptedService, SeriesData, SeriesParams, SeriesSnapshot, ServiceError, SourceIdentity,
    SourceMetadata, UncertaintyBand,
};
pub use signature::{compute_signature, content_prefix_hash, Signature, SIGNATURE_VERSION};

use std::sync::Arc;

/// Build a session from a loaded configuration file.
///
/// Persistence is wired up when the config opts in; the caller still
/// decides when to [`SourceLibrary::restore`] the workspace.
pub fn session_from_config(
    service: Arc<dyn DataService>,
    config: &XsplotConfig,
) -> Result<PlotSession, ConfigLoadError> {
    let persistence = match (&config.library.persistence_dir, &config.library.scope) {
        (Some(dir), Some(scope)) => {
            let store: Arc<dyn SummaryStore> = Arc::new(JsonFileStore::new(dir.clone()));
            Some((store, scope.clone()))
        }
        _ => None,
    };
    // Surface a bad quality value at session construction, not first render.
    config.render.parsed_quality()?;
    Ok(PlotSession::with_options(
        service,
        SessionOptions {
            persistence,
            quiet_window: config.render.quiet_window(),
        },
    ))
}
