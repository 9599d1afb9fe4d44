//! Debounced full-image regeneration.
//!
//! The secondary render path is coarse: one external call regenerates the
//! whole figure. Edits arrive in bursts (a user dragging a slider), so
//! every configuration change restarts a quiet-window timer and only the
//! timer that survives the burst issues a render.
//!
//! The timer task and the render are deliberately separate tasks: a new
//! edit aborts the *timer*, never an in-flight render. Superseded renders
//! are handled the same way as superseded fetches — a monotonic counter is
//! captured when the render is issued and compared at completion, and a
//! mismatch drops the image.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use service::{DataService, FigureConfig, RenderQuality, RenderedImage, SeriesSnapshot};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::types::RenderEvent;

const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Default quiet window between the last edit and the render call.
pub const DEFAULT_QUIET_WINDOW: Duration = Duration::from_millis(300);

struct Inner {
    service: Arc<dyn DataService>,
    quiet_window: Duration,
    /// Monotonic render counter; incremented when a timer fires, compared
    /// at render completion.
    counter: AtomicU64,
    timer: Mutex<Option<JoinHandle<()>>>,
    latest: Mutex<Option<RenderedImage>>,
    events: broadcast::Sender<RenderEvent>,
}

/// Coalesces render requests and discards superseded results. Cheap to
/// clone; clones share state.
#[derive(Clone)]
pub struct RenderScheduler {
    inner: Arc<Inner>,
}

impl RenderScheduler {
    pub fn new(service: Arc<dyn DataService>) -> Self {
        Self::with_quiet_window(service, DEFAULT_QUIET_WINDOW)
    }

    pub fn with_quiet_window(service: Arc<dyn DataService>, quiet_window: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                service,
                quiet_window,
                counter: AtomicU64::new(0),
                timer: Mutex::new(None),
                latest: Mutex::new(None),
                events,
            }),
        }
    }

    /// Note a configuration change and (re)start the quiet-window timer.
    ///
    /// The snapshots passed with the *last* call before the window closes
    /// are the ones rendered. Must be called within a tokio runtime.
    pub fn request_render(
        &self,
        series: Vec<SeriesSnapshot>,
        figure: FigureConfig,
        quality: RenderQuality,
    ) {
        let mut timer = self.lock_timer();
        if let Some(pending) = timer.take() {
            pending.abort();
        }

        let inner = Arc::clone(&self.inner);
        *timer = Some(tokio::spawn(async move {
            tokio::time::sleep(inner.quiet_window).await;

            let generation = inner.counter.fetch_add(1, Ordering::SeqCst) + 1;
            debug!(generation, series = series.len(), "render_issued");

            // Separate task so a later edit aborting the timer can never
            // abort a render that already left the building.
            tokio::spawn(async move {
                let result = inner.service.render_image(&series, &figure, quality).await;

                let current = inner.counter.load(Ordering::SeqCst);
                if generation != current {
                    debug!(generation, current, "stale_render_discarded");
                    return;
                }

                let error = match result {
                    Ok(image) => {
                        *inner.latest.lock().unwrap_or_else(|p| p.into_inner()) = Some(image);
                        debug!(generation, "render_committed");
                        None
                    }
                    Err(err) => {
                        warn!(generation, error = %err, "render_failed");
                        Some(err.to_string())
                    }
                };
                let _ = inner.events.send(RenderEvent { generation, error });
            });
        }));
    }

    /// The most recently committed image, if any.
    pub fn last_render(&self) -> Option<RenderedImage> {
        self.inner
            .latest
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RenderEvent> {
        self.events_sender().subscribe()
    }

    pub fn quiet_window(&self) -> Duration {
        self.inner.quiet_window
    }

    fn events_sender(&self) -> &broadcast::Sender<RenderEvent> {
        &self.inner.events
    }

    fn lock_timer(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.inner.timer.lock().unwrap_or_else(|p| p.into_inner())
    }
}
