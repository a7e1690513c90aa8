use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use tracing::warn;

/// Shared cap on the number of chunk calls in flight.
///
/// Every observed transient failure lowers the cap by one, never below one.
/// The cap is never raised again during a run.
#[derive(Debug, Clone)]
pub struct ConcurrencyGovernor {
    cap: Arc<AtomicUsize>,
    initial: usize,
}

impl ConcurrencyGovernor {
    pub fn new(max_in_flight: usize) -> Self {
        let initial = max_in_flight.max(1);
        Self {
            cap: Arc::new(AtomicUsize::new(initial)),
            initial,
        }
    }

    pub fn cap(&self) -> usize {
        self.cap.load(Ordering::SeqCst)
    }

    pub fn initial(&self) -> usize {
        self.initial
    }

    pub fn is_degraded(&self) -> bool {
        self.cap() < self.initial
    }

    pub fn has_room(&self, in_flight: usize) -> bool {
        in_flight < self.cap()
    }

    /// Ratchets the cap down after a transient failure.
    ///
    /// Returns the new cap when it changed.
    pub fn record_transient_failure(&self) -> Option<usize> {
        let lowered = self
            .cap
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |cap| {
                (cap > 1).then(|| cap - 1)
            })
            .ok()
            .map(|previous| previous - 1);

        if let Some(cap) = lowered {
            warn!(cap, initial = self.initial, "Lowering chunk concurrency after transient failure");
        }
        lowered
    }
}
