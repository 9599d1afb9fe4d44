//! Per-series fetch coordination.
//!
//! The coordinator keeps two maps. `entries` is the per-series view the
//! UI reads: one [`CacheEntry`] per series id, because two series with
//! identical configuration still render independently. `by_signature`
//! dedups the actual network traffic: an in-flight slot collects every
//! (series, generation) waiting on that signature, and a completed slot
//! serves later subscribers without another call.
//!
//! Every completion commits through a compare-and-set against the current
//! entry: signature *and* generation must still match what the request
//! captured at issue time, otherwise the result is dropped. Discarding,
//! not aborting, is all correctness needs here — a superseded response
//! must never become visible, but the transport is free to finish.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use service::{ComputeRequest, DataService, SeriesData, ServiceError};
use signature::Signature;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::types::{CacheEntry, CacheEvent, FetchStatus, SeriesId};

const EVENT_CHANNEL_CAPACITY: usize = 64;

enum SignatureSlot {
    /// A fetch is outstanding; these (series, generation) pairs commit
    /// when it resolves.
    InFlight { waiters: Vec<(SeriesId, u64)> },
    /// The signature resolved; later subscribers are served from here.
    Ready(SeriesData),
}

/// Derived-data cache and fetch deduplicator. Cheap to clone; clones share
/// state.
#[derive(Clone)]
pub struct FetchCoordinator {
    entries: Arc<DashMap<SeriesId, CacheEntry>>,
    by_signature: Arc<DashMap<Signature, SignatureSlot>>,
    service: Arc<dyn DataService>,
    events: broadcast::Sender<CacheEvent>,
}

impl FetchCoordinator {
    pub fn new(service: Arc<dyn DataService>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            entries: Arc::new(DashMap::new()),
            by_signature: Arc::new(DashMap::new()),
            service,
            events,
        }
    }

    /// Drive the state machine for one series.
    ///
    /// A no-op when the entry already carries this signature in `Ready` or
    /// `Pending` state (the memoization guarantee; an `Error` entry never
    /// memoizes, so re-entering with the same signature is the manual
    /// retry path). Otherwise the entry moves to `Pending` under a fresh
    /// generation and the fetch is issued — or attached to an in-flight
    /// fetch, or served straight from a completed slot, when another
    /// series already asked for the same signature.
    ///
    /// Returns `true` when the configuration change was accepted (anything
    /// but a memoization hit). Must be called within a tokio runtime.
    pub fn on_config_changed(
        &self,
        series: SeriesId,
        new_signature: Signature,
        request: ComputeRequest,
    ) -> bool {
        let generation = {
            let mut entry = self.entries.entry(series).or_default();
            let memo_hit = entry.signature.as_ref() == Some(&new_signature)
                && matches!(entry.status, FetchStatus::Ready | FetchStatus::Pending);
            if memo_hit {
                debug!(series = %series, "fetch_deduplicated");
                return false;
            }
            entry.generation += 1;
            entry.status = FetchStatus::Pending;
            entry.signature = Some(new_signature.clone());
            entry.payload = None;
            entry.error = None;
            entry.generation
        };
        self.emit(series, FetchStatus::Pending, generation);

        let served = match self.by_signature.entry(new_signature.clone()) {
            Entry::Occupied(mut slot) => match slot.get_mut() {
                SignatureSlot::Ready(data) => Some(data.clone()),
                SignatureSlot::InFlight { waiters } => {
                    waiters.push((series, generation));
                    debug!(series = %series, generation, "fetch_joined_in_flight");
                    None
                }
            },
            Entry::Vacant(slot) => {
                slot.insert(SignatureSlot::InFlight {
                    waiters: vec![(series, generation)],
                });
                info!(series = %series, generation, signature = %new_signature, "fetch_issued");
                let coordinator = self.clone();
                let signature = new_signature.clone();
                tokio::spawn(async move {
                    let result = coordinator.service.compute_series(request).await;
                    coordinator.resolve_signature(&signature, result);
                });
                None
            }
        };

        if let Some(data) = served {
            debug!(series = %series, "fetch_served_from_signature_cache");
            self.commit(series, &new_signature, generation, Ok(data));
        }
        true
    }

    /// Current state for a series; `Absent` if never configured.
    pub fn snapshot(&self, series: SeriesId) -> CacheEntry {
        self.entries
            .get(&series)
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    /// Drop a series' entry (e.g. when the series is deleted). Any
    /// in-flight result for it is discarded at commit time.
    pub fn invalidate(&self, series: SeriesId) {
        self.entries.remove(&series);
    }

    /// Drop everything, including the signature-level result cache.
    pub fn clear(&self) {
        self.entries.clear();
        self.by_signature.clear();
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    /// Resolve a completed fetch for everything waiting on its signature.
    fn resolve_signature(&self, sig: &Signature, result: Result<SeriesData, ServiceError>) {
        match result {
            Ok(data) => {
                let waiters = match self.by_signature.get_mut(sig) {
                    Some(mut slot) => {
                        let waiters = match &mut *slot {
                            SignatureSlot::InFlight { waiters } => std::mem::take(waiters),
                            SignatureSlot::Ready(_) => Vec::new(),
                        };
                        *slot = SignatureSlot::Ready(data.clone());
                        waiters
                    }
                    None => Vec::new(),
                };
                for (series, generation) in waiters {
                    self.commit(series, sig, generation, Ok(data.clone()));
                }
            }
            Err(err) => {
                // Errors are never cached by signature: the next
                // configuration change (or manual retry) re-issues.
                let waiters = match self.by_signature.remove(sig) {
                    Some((_, SignatureSlot::InFlight { waiters })) => waiters,
                    _ => Vec::new(),
                };
                for (series, generation) in waiters {
                    self.commit(series, sig, generation, Err(err.clone()));
                }
            }
        }
    }

    /// Compare-and-set commit of one completion into one series entry.
    fn commit(
        &self,
        series: SeriesId,
        signature: &Signature,
        generation: u64,
        result: Result<SeriesData, ServiceError>,
    ) {
        let status = {
            let Some(mut entry) = self.entries.get_mut(&series) else {
                debug!(series = %series, generation, "stale_result_discarded");
                return;
            };
            if entry.signature.as_ref() != Some(signature) || entry.generation != generation {
                debug!(
                    series = %series,
                    generation,
                    current_generation = entry.generation,
                    "stale_result_discarded"
                );
                return;
            }
            match result {
                Ok(data) => {
                    entry.status = FetchStatus::Ready;
                    entry.payload = Some(data);
                    entry.error = None;
                    info!(series = %series, generation, "series_data_ready");
                }
                Err(err) => {
                    entry.status = FetchStatus::Error;
                    entry.error = Some(err.to_string());
                    warn!(series = %series, generation, error = %err, "series_fetch_failed");
                }
            }
            entry.status
        };
        self.emit(series, status, generation);
    }

    fn emit(&self, series: SeriesId, status: FetchStatus, generation: u64) {
        let _ = self.events.send(CacheEvent {
            series,
            status,
            generation,
        });
    }
}
