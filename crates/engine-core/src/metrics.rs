use serde::Serialize;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

#[derive(Debug, Default)]
struct InnerMetrics {
    orders_streamed: AtomicU64,
    items_streamed: AtomicU64,
    batches_appended: AtomicU64,
    bytes_appended: AtomicU64,
    failure_count: AtomicU64,
}

/// Run counters shared by every instance of one invocation.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    inner: Arc<InnerMetrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub orders_streamed: u64,
    pub items_streamed: u64,
    pub batches_appended: u64,
    pub bytes_appended: u64,
    pub failure_count: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_orders(&self, count: u64) {
        self.inner.orders_streamed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_items(&self, count: u64) {
        self.inner.items_streamed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_batches(&self, count: u64) {
        self.inner.batches_appended.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_bytes(&self, count: u64) {
        self.inner.bytes_appended.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_failures(&self, count: u64) {
        self.inner.failure_count.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            orders_streamed: self.inner.orders_streamed.load(Ordering::Relaxed),
            items_streamed: self.inner.items_streamed.load(Ordering::Relaxed),
            batches_appended: self.inner.batches_appended.load(Ordering::Relaxed),
            bytes_appended: self.inner.bytes_appended.load(Ordering::Relaxed),
            failure_count: self.inner.failure_count.load(Ordering::Relaxed),
        }
    }
}
