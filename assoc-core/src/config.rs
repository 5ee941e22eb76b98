//! Configuration types

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the association store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// TTL applied to every cached page.
    pub page_ttl: Duration,
    /// Page size used when the caller does not supply one.
    pub default_limit: u32,
    /// Largest page size a listing accepts.
    pub max_limit: u32,
    /// Keys requested per scan step during invalidation.
    pub scan_batch: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            page_ttl: Duration::from_secs(3600), // 1 hour
            default_limit: 20,
            max_limit: 100,
            scan_batch: 100,
        }
    }
}

impl StoreConfig {
    /// Create a new store config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cached page TTL.
    pub fn with_page_ttl(mut self, ttl: Duration) -> Self {
        self.page_ttl = ttl;
        self
    }

    /// Set the default page size.
    pub fn with_default_limit(mut self, limit: u32) -> Self {
        self.default_limit = limit;
        self
    }

    /// Set the maximum page size.
    pub fn with_max_limit(mut self, limit: u32) -> Self {
        self.max_limit = limit;
        self
    }

    /// Set the invalidation scan batch size.
    pub fn with_scan_batch(mut self, batch: usize) -> Self {
        self.scan_batch = batch.max(1);
        self
    }
}
