//! Operational counters for the association store.
//!
//! Cache failures never fail a request, so these counters are where they
//! become visible.

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters, shared between the store and whoever reports them.
#[derive(Debug, Default)]
pub struct StoreMetrics {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    degraded_reads: AtomicU64,
    invalidations: AtomicU64,
    failed_invalidations: AtomicU64,
    evicted_pages: AtomicU64,
}

/// Point-in-time copy of [`StoreMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Listings served straight from the backing store because the cache
    /// tier errored or held an unreadable page.
    pub degraded_reads: u64,
    pub invalidations: u64,
    /// Invalidations that errored after the write had already committed.
    pub failed_invalidations: u64,
    pub evicted_pages: u64,
}

impl StoreMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_degraded_read(&self) {
        self.degraded_reads.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_invalidation(&self, evicted: u64) {
        self.invalidations.fetch_add(1, Ordering::Relaxed);
        self.evicted_pages.fetch_add(evicted, Ordering::Relaxed);
    }

    pub(crate) fn record_failed_invalidation(&self) {
        self.failed_invalidations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            degraded_reads: self.degraded_reads.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            failed_invalidations: self.failed_invalidations.load(Ordering::Relaxed),
            evicted_pages: self.evicted_pages.load(Ordering::Relaxed),
        }
    }
}
