//! Deterministic in-memory service implementation.
//!
//! `ScriptedService` stands in for the remote data/plotting backend in
//! tests and demos. In auto mode it answers every call immediately with
//! synthesized-but-deterministic data; in manual mode calls park until the
//! test releases them, which is how the integration suites interleave
//! completions out of order.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use detect::SourceKind;
use sha2::{Digest, Sha256};
use tokio::sync::{oneshot, Notify};

use crate::error::ServiceError;
use crate::types::{
    ComputeRequest, FigureConfig, ImageFormat, Quantity, RenderQuality, RenderedImage, SeriesData,
    SeriesSnapshot, SourceMetadata, UncertaintyBand,
};
use crate::DataService;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Auto,
    Manual,
}

/// One parked `compute_series` call, handed to the test for release.
pub struct ComputeHandle {
    request: ComputeRequest,
    responder: oneshot::Sender<Result<SeriesData, ServiceError>>,
}

impl ComputeHandle {
    pub fn request(&self) -> &ComputeRequest {
        &self.request
    }

    /// Complete the call with an explicit result.
    pub fn respond(self, result: Result<SeriesData, ServiceError>) {
        let _ = self.responder.send(result);
    }

    /// Complete the call with the same data auto mode would have produced.
    pub fn respond_synthesized(self) {
        let data = ScriptedService::synthesize(&self.request);
        self.respond(Ok(data));
    }
}

/// One parked `render_image` call.
pub struct RenderHandle {
    call: RenderCall,
    responder: oneshot::Sender<Result<RenderedImage, ServiceError>>,
}

impl RenderHandle {
    pub fn call(&self) -> &RenderCall {
        &self.call
    }

    pub fn respond(self, result: Result<RenderedImage, ServiceError>) {
        let _ = self.responder.send(result);
    }

    pub fn respond_synthesized(self) {
        let image = ScriptedService::synthesize_image(self.call.quality);
        self.respond(Ok(image));
    }
}

/// Recorded arguments of one render call.
#[derive(Debug, Clone)]
pub struct RenderCall {
    pub labels: Vec<String>,
    pub figure: FigureConfig,
    pub quality: RenderQuality,
}

struct PendingCompute {
    request: ComputeRequest,
    responder: oneshot::Sender<Result<SeriesData, ServiceError>>,
}

struct PendingRender {
    call: RenderCall,
    responder: oneshot::Sender<Result<RenderedImage, ServiceError>>,
}

#[derive(Default)]
struct State {
    pending_computes: VecDeque<PendingCompute>,
    pending_renders: VecDeque<PendingRender>,
    compute_log: Vec<ComputeRequest>,
    render_log: Vec<RenderCall>,
    failing_parse_kinds: HashSet<SourceKind>,
    failing_computes: bool,
    identities_expired: bool,
}

struct Inner {
    mode: Mode,
    state: Mutex<State>,
    arrivals: Notify,
}

/// See the module docs.
#[derive(Clone)]
pub struct ScriptedService {
    inner: Arc<Inner>,
}

impl ScriptedService {
    /// Every call answers immediately with deterministic synthesized data.
    pub fn auto() -> Self {
        Self::with_mode(Mode::Auto)
    }

    /// Calls park until released through [`next_compute`](Self::next_compute)
    /// / [`next_render`](Self::next_render).
    pub fn manual() -> Self {
        Self::with_mode(Mode::Manual)
    }

    fn with_mode(mode: Mode) -> Self {
        Self {
            inner: Arc::new(Inner {
                mode,
                state: Mutex::new(State::default()),
                arrivals: Notify::new(),
            }),
        }
    }

    /// Script `classify_and_parse` to reject content of the given kind.
    pub fn fail_parses_for(&self, kind: SourceKind) {
        self.lock().failing_parse_kinds.insert(kind);
    }

    /// Undo [`fail_parses_for`](Self::fail_parses_for).
    pub fn accept_parses_for(&self, kind: SourceKind) {
        self.lock().failing_parse_kinds.remove(&kind);
    }

    /// Script `compute_series` to fail with a transient error.
    pub fn fail_computes(&self, failing: bool) {
        self.lock().failing_computes = failing;
    }

    /// Script stable identities as expired server-side; requests carrying
    /// them fail with [`ServiceError::IdentityExpired`].
    pub fn expire_identities(&self, expired: bool) {
        self.lock().identities_expired = expired;
    }

    pub fn compute_calls(&self) -> usize {
        self.lock().compute_log.len()
    }

    pub fn compute_log(&self) -> Vec<ComputeRequest> {
        self.lock().compute_log.clone()
    }

    pub fn render_calls(&self) -> usize {
        self.lock().render_log.len()
    }

    pub fn render_log(&self) -> Vec<RenderCall> {
        self.lock().render_log.clone()
    }

    pub fn pending_computes(&self) -> usize {
        self.lock().pending_computes.len()
    }

    /// Wait for the next parked compute call (FIFO). Only meaningful in
    /// manual mode.
    pub async fn next_compute(&self) -> ComputeHandle {
        loop {
            if let Some(pending) = self.lock().pending_computes.pop_front() {
                return ComputeHandle {
                    request: pending.request,
                    responder: pending.responder,
                };
            }
            self.inner.arrivals.notified().await;
        }
    }

    /// Wait for the next parked render call (FIFO).
    pub async fn next_render(&self) -> RenderHandle {
        loop {
            if let Some(pending) = self.lock().pending_renders.pop_front() {
                return RenderHandle {
                    call: pending.call,
                    responder: pending.responder,
                };
            }
            self.inner.arrivals.notified().await;
        }
    }

    /// The data auto mode produces for a request: a geometric energy grid
    /// with a smooth reaction-dependent curve. Deterministic per request.
    pub fn synthesize(request: &ComputeRequest) -> SeriesData {
        let params = &request.params;
        let n = 16usize;
        let e0 = params.energy_min_ev.max(1e-11);
        let e1 = params.energy_max_ev.max(e0 * 10.0);
        let ratio = (e1 / e0).powf(1.0 / (n as f64 - 1.0));

        let x: Vec<f64> = (0..n).map(|i| e0 * ratio.powi(i as i32)).collect();
        let base = params.reaction as f64 + 1.0;
        let y: Vec<f64> = x
            .iter()
            .map(|&e| match params.quantity {
                Quantity::CrossSection => base / e.sqrt(),
                Quantity::AngularDistribution => base * (1.0 + e.ln().cos()),
                Quantity::EnergySpectrum => base * (-e / e1).exp(),
            })
            .collect();

        let uncertainty = params.include_uncertainty.then(|| {
            let spread = 0.05 * params.uncertainty_factor;
            UncertaintyBand {
                lower: y.iter().map(|v| v * (1.0 - spread)).collect(),
                upper: y.iter().map(|v| v * (1.0 + spread)).collect(),
            }
        });

        SeriesData {
            label: format!("{} mt={}", request.kind, params.reaction),
            x,
            y,
            uncertainty,
        }
    }

    fn synthesize_image(quality: RenderQuality) -> RenderedImage {
        RenderedImage {
            bytes: vec![0x89, b'P', b'N', b'G'],
            format: ImageFormat::Png,
            width: 1280,
            height: 960,
            dpi: match quality {
                RenderQuality::Draft => 96,
                RenderQuality::High => 300,
            },
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn short_hash(content: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        hex::encode(&hasher.finalize()[..4])
    }

    fn parse_metadata(kind: SourceKind, content: &str) -> Result<SourceMetadata, ServiceError> {
        let stable_id = Some(format!("svc-{}", Self::short_hash(content)));
        match kind {
            SourceKind::Ace => {
                let table_id = content
                    .lines()
                    .find(|l| !l.trim().is_empty())
                    .and_then(|l| l.split_whitespace().next())
                    .unwrap_or("unknown")
                    .to_string();
                Ok(SourceMetadata::Ace {
                    table_id,
                    stable_id,
                    temperature_k: 293.6,
                    reactions: vec![1, 2, 18, 102],
                })
            }
            SourceKind::Endf => {
                let mat = content
                    .lines()
                    .filter(|l| l.is_ascii() && l.len() >= 14)
                    .find_map(|l| {
                        l[l.len() - 14..]
                            .split_whitespace()
                            .next()
                            .and_then(|t| t.parse::<u32>().ok())
                    })
                    .unwrap_or(9999);
                Ok(SourceMetadata::Endf {
                    mat,
                    stable_id,
                    files: vec![3, 4],
                    reactions: vec![1, 2, 18, 102],
                })
            }
            SourceKind::Unknown => Err(ServiceError::ParseRejected {
                kind,
                reason: "cannot parse a file of unknown kind".into(),
            }),
        }
    }
}

#[async_trait]
impl DataService for ScriptedService {
    async fn classify_and_parse(
        &self,
        kind: SourceKind,
        content: &str,
    ) -> Result<SourceMetadata, ServiceError> {
        if self.lock().failing_parse_kinds.contains(&kind) {
            return Err(ServiceError::ParseRejected {
                kind,
                reason: "scripted rejection".into(),
            });
        }
        Self::parse_metadata(kind, content)
    }

    async fn compute_series(&self, request: ComputeRequest) -> Result<SeriesData, ServiceError> {
        let receiver = {
            let mut state = self.lock();
            state.compute_log.push(request.clone());

            if state.identities_expired {
                if let crate::SourceIdentity::Stable(id) = &request.identity {
                    return Err(ServiceError::IdentityExpired(id.clone()));
                }
            }
            if state.failing_computes {
                return Err(ServiceError::ComputeFailed("scripted failure".into()));
            }

            match self.inner.mode {
                Mode::Auto => return Ok(Self::synthesize(&request)),
                Mode::Manual => {
                    let (tx, rx) = oneshot::channel();
                    state.pending_computes.push_back(PendingCompute {
                        request,
                        responder: tx,
                    });
                    rx
                }
            }
        };
        self.inner.arrivals.notify_one();

        receiver
            .await
            .map_err(|_| ServiceError::Unavailable("scripted responder dropped".into()))?
    }

    async fn render_image(
        &self,
        series: &[SeriesSnapshot],
        figure: &FigureConfig,
        quality: RenderQuality,
    ) -> Result<RenderedImage, ServiceError> {
        let call = RenderCall {
            labels: series.iter().map(|s| s.label.clone()).collect(),
            figure: figure.clone(),
            quality,
        };

        let receiver = {
            let mut state = self.lock();
            state.render_log.push(call.clone());

            match self.inner.mode {
                Mode::Auto => return Ok(Self::synthesize_image(quality)),
                Mode::Manual => {
                    let (tx, rx) = oneshot::channel();
                    state.pending_renders.push_back(PendingRender {
                        call,
                        responder: tx,
                    });
                    rx
                }
            }
        };
        self.inner.arrivals.notify_one();

        receiver
            .await
            .map_err(|_| ServiceError::Unavailable("scripted responder dropped".into()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SourceIdentity;

    fn request() -> ComputeRequest {
        ComputeRequest {
            identity: SourceIdentity::Stable("svc-1".into()),
            kind: SourceKind::Ace,
            params: Default::default(),
        }
    }

    #[tokio::test]
    async fn auto_mode_answers_immediately_and_logs() {
        let svc = ScriptedService::auto();
        let data = svc.compute_series(request()).await.expect("compute");
        assert_eq!(data.x.len(), data.y.len());
        assert!(!data.is_empty());
        assert_eq!(svc.compute_calls(), 1);
    }

    #[tokio::test]
    async fn synthesis_is_deterministic() {
        let a = ScriptedService::synthesize(&request());
        let b = ScriptedService::synthesize(&request());
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn manual_mode_parks_until_released() {
        let svc = ScriptedService::manual();
        let call = {
            let svc = svc.clone();
            tokio::spawn(async move { svc.compute_series(request()).await })
        };

        let handle = svc.next_compute().await;
        assert_eq!(handle.request().kind, SourceKind::Ace);
        handle.respond_synthesized();

        let data = call.await.expect("join").expect("compute");
        assert!(!data.is_empty());
    }

    #[tokio::test]
    async fn expired_identities_reject_stable_requests_only() {
        let svc = ScriptedService::auto();
        svc.expire_identities(true);

        let err = svc.compute_series(request()).await.unwrap_err();
        assert!(matches!(err, ServiceError::IdentityExpired(_)));

        let by_content = ComputeRequest {
            identity: SourceIdentity::Content("raw".into()),
            ..request()
        };
        assert!(svc.compute_series(by_content).await.is_ok());
    }

    #[tokio::test]
    async fn parse_failure_scripting_is_per_kind() {
        let svc = ScriptedService::auto();
        svc.fail_parses_for(SourceKind::Endf);

        assert!(svc.classify_and_parse(SourceKind::Ace, "1001.02c").await.is_ok());
        let err = svc
            .classify_and_parse(SourceKind::Endf, "content")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ParseRejected { .. }));
    }
}
