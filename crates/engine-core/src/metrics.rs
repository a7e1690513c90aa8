use model::result::RunCounters;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

#[derive(Debug, Default)]
struct InnerMetrics {
    chunks_submitted: AtomicU64,
    chunks_succeeded: AtomicU64,
    chunks_failed: AtomicU64,
    transient_failures: AtomicU64,
    retries: AtomicU64,
    concurrency_downgrades: AtomicU64,
    discarded_results: AtomicU64,
}

#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<InnerMetrics>,
}

impl Metrics {
    pub fn new() -> Self {
        Metrics {
            inner: Arc::new(InnerMetrics::default()),
        }
    }

    pub fn increment_submitted(&self) {
        self.inner.chunks_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_succeeded(&self) {
        self.inner.chunks_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_failed(&self) {
        self.inner.chunks_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_transient_failures(&self) {
        self.inner
            .transient_failures
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_retries(&self) {
        self.inner.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_downgrades(&self) {
        self.inner
            .concurrency_downgrades
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_discarded(&self) {
        self.inner.discarded_results.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RunCounters {
        RunCounters {
            chunks_submitted: self.inner.chunks_submitted.load(Ordering::Relaxed),
            chunks_succeeded: self.inner.chunks_succeeded.load(Ordering::Relaxed),
            chunks_failed: self.inner.chunks_failed.load(Ordering::Relaxed),
            transient_failures: self.inner.transient_failures.load(Ordering::Relaxed),
            retries: self.inner.retries.load(Ordering::Relaxed),
            concurrency_downgrades: self.inner.concurrency_downgrades.load(Ordering::Relaxed),
            discarded_results: self.inner.discarded_results.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
