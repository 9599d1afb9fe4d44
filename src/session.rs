//! The session facade: one object per user session wiring the workspace,
//! signature computation, fetch coordination, and the render scheduler
//! together. No ambient globals — tests build as many isolated sessions
//! as they like.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use fetch::{CacheEntry, CacheEvent, FetchCoordinator, RenderEvent, RenderScheduler, SeriesId};
use library::{SourceId, SourceLibrary, SummaryStore};
use serde::{Deserialize, Serialize};
use service::{
    ComputeRequest, DataService, FigureConfig, RenderQuality, SeriesParams, SeriesSnapshot,
    SourceIdentity,
};
use signature::compute_signature;
use tokio::sync::broadcast;
use tracing::debug;

/// Presentation-only fields of a series. None of this participates in the
/// signature: restyling a series must never trigger a refetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesStyle {
    /// Display label; falls back to the computed series label.
    pub label: Option<String>,
    pub color: Option<String>,
    pub line_width: Option<f32>,
}

/// One user-configured series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesConfig {
    pub id: SeriesId,
    /// Weak reference into the workspace; if it stops resolving the series
    /// goes inert rather than erroring.
    pub source: SourceId,
    pub params: SeriesParams,
    pub style: SeriesStyle,
}

/// Construction options beyond the service handle.
pub struct SessionOptions {
    /// Summary store plus identity scope; `None` is a guest session.
    pub persistence: Option<(Arc<dyn SummaryStore>, String)>,
    pub quiet_window: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            persistence: None,
            quiet_window: fetch::DEFAULT_QUIET_WINDOW,
        }
    }
}

/// A plotting session: the engine's whole public surface.
pub struct PlotSession {
    library: SourceLibrary,
    coordinator: FetchCoordinator,
    renderer: RenderScheduler,
    series: RwLock<Vec<SeriesConfig>>,
}

impl PlotSession {
    /// A guest session: nothing persisted, default quiet window.
    pub fn new(service: Arc<dyn DataService>) -> Self {
        Self::with_options(service, SessionOptions::default())
    }

    pub fn with_options(service: Arc<dyn DataService>, options: SessionOptions) -> Self {
        let library = match options.persistence {
            Some((store, scope)) => {
                SourceLibrary::with_persistence(Arc::clone(&service), store, scope)
            }
            None => SourceLibrary::new(Arc::clone(&service)),
        };
        Self {
            library,
            coordinator: FetchCoordinator::new(Arc::clone(&service)),
            renderer: RenderScheduler::with_quiet_window(service, options.quiet_window),
            series: RwLock::new(Vec::new()),
        }
    }

    /// The source-file workspace (ingest, reclassify, remove, rename,
    /// query live there).
    pub fn library(&self) -> &SourceLibrary {
        &self.library
    }

    /// Apply a series configuration and drive the fetch state machine.
    ///
    /// Returns `true` when a fetch was issued or joined; `false` on a
    /// memoization hit or when the series is inert (source unresolvable,
    /// not `Ready`, or restored without content and without a stable
    /// identity).
    pub fn configure_series(&self, config: SeriesConfig) -> bool {
        let series_id = config.id;
        let source_id = config.source;
        let params = config.params.clone();
        self.upsert_config(config);

        let Some(file) = self.library.get(source_id) else {
            debug!(series = %series_id, source = %source_id, "series_inert_unresolved_source");
            self.coordinator.invalidate(series_id);
            return false;
        };
        if !file.is_ready() {
            debug!(series = %series_id, source = %source_id, "series_inert_source_not_ready");
            return false;
        }

        let identity = match file.stable_id() {
            Some(stable) => SourceIdentity::Stable(stable.to_string()),
            None if !file.content.is_empty() => SourceIdentity::Content(file.content.clone()),
            None => {
                // Restored entry with no content and no stable identity:
                // nothing to send until content is supplied again.
                debug!(series = %series_id, source = %source_id, "series_inert_no_identity");
                return false;
            }
        };

        let new_signature = compute_signature(&file, &params);
        let request = ComputeRequest {
            identity,
            kind: file.detected_kind,
            params,
        };
        self.coordinator
            .on_config_changed(series_id, new_signature, request)
    }

    /// Re-issue the fetch for a series in `Error` state. The coordinator
    /// never memoizes errors, so re-entering the ordinary transition with
    /// the unchanged configuration is exactly a retry.
    pub fn retry_series(&self, id: SeriesId) -> bool {
        let Some(config) = self.series_config(id) else {
            return false;
        };
        self.configure_series(config)
    }

    /// Drop a series and its cache entry. Any in-flight result for it is
    /// discarded when it arrives.
    pub fn remove_series(&self, id: SeriesId) {
        self.write_series().retain(|c| c.id != id);
        self.coordinator.invalidate(id);
    }

    /// Current cache state for a series (`Absent` if never fetched).
    pub fn snapshot(&self, id: SeriesId) -> CacheEntry {
        self.coordinator.snapshot(id)
    }

    pub fn series_config(&self, id: SeriesId) -> Option<SeriesConfig> {
        self.read_series().iter().find(|c| c.id == id).cloned()
    }

    pub fn series_configs(&self) -> Vec<SeriesConfig> {
        self.read_series().clone()
    }

    /// Kick the debounced full-image regeneration with the current set of
    /// resolved series.
    pub fn request_render(&self, figure: FigureConfig, quality: RenderQuality) {
        let snapshots: Vec<SeriesSnapshot> = self
            .read_series()
            .iter()
            .filter_map(|config| {
                let entry = self.coordinator.snapshot(config.id);
                let payload = entry.payload?;
                Some(SeriesSnapshot {
                    label: config
                        .style
                        .label
                        .clone()
                        .unwrap_or_else(|| payload.label.clone()),
                    x: payload.x,
                    y: payload.y,
                    uncertainty: payload.uncertainty,
                    color: config.style.color.clone(),
                    line_width: config.style.line_width,
                })
            })
            .collect();
        self.renderer.request_render(snapshots, figure, quality);
    }

    /// Most recently committed figure image.
    pub fn last_render(&self) -> Option<service::RenderedImage> {
        self.renderer.last_render()
    }

    pub fn subscribe_cache(&self) -> broadcast::Receiver<CacheEvent> {
        self.coordinator.subscribe()
    }

    pub fn subscribe_renders(&self) -> broadcast::Receiver<RenderEvent> {
        self.renderer.subscribe()
    }

    fn upsert_config(&self, config: SeriesConfig) {
        let mut series = self.write_series();
        match series.iter_mut().find(|c| c.id == config.id) {
            Some(existing) => *existing = config,
            None => series.push(config),
        }
    }

    fn read_series(&self) -> RwLockReadGuard<'_, Vec<SeriesConfig>> {
        self.series.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write_series(&self) -> RwLockWriteGuard<'_, Vec<SeriesConfig>> {
        self.series.write().unwrap_or_else(|p| p.into_inner())
    }
}
