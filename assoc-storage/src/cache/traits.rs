//! Cache tier trait and statistics.
//!
//! A cache tier is a string key/value store with per-entry TTL and a
//! cursor-based pattern scan. Page invalidation is built entirely on
//! [`CacheTier::scan`] and [`CacheTier::delete`], so any store offering
//! ordered iteration can back it.

use async_trait::async_trait;
use assoc_core::AssocResult;
use std::time::Duration;

use super::pattern::KeyPattern;

/// Minimum clock time between expiry sweeps triggered by [`CacheTier::set`].
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// One step of a pattern scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanBatch {
    /// Keys in this step that matched the pattern.
    pub keys: Vec<String>,
    /// Where to resume, or `None` once the scan is exhausted.
    pub next: Option<String>,
}

/// Cache tier trait for pluggable page caches.
///
/// Implementations must be safe to share across tasks. Errors are reported
/// as `StorageError::Cache`; callers decide whether they are fatal.
#[async_trait]
pub trait CacheTier: Send + Sync {
    /// Get a live value. Expired entries read as absent.
    async fn get(&self, key: &str) -> AssocResult<Option<String>>;

    /// Store a value, replacing any previous one, for `ttl`.
    ///
    /// At most once per [`SWEEP_INTERVAL`] a write also reclaims every
    /// expired entry, so dead pages do not pile up in a tier that is only
    /// ever written.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> AssocResult<()>;

    /// Examine up to `count` keys in key order, starting after `after`,
    /// and return the ones matching `pattern`.
    ///
    /// Resuming from a returned `next` never skips or repeats a key that
    /// existed for the whole scan, even when keys are deleted in between.
    async fn scan(
        &self,
        after: Option<&str>,
        pattern: &KeyPattern,
        count: usize,
    ) -> AssocResult<ScanBatch>;

    /// Delete keys. Returns how many were present.
    async fn delete(&self, keys: &[String]) -> AssocResult<u64>;

    /// Remove every expired entry now. Returns how many were removed.
    async fn purge_expired(&self) -> AssocResult<u64>;

    /// Get cache statistics.
    async fn stats(&self) -> AssocResult<CacheStats>;

    /// Round-trip to the tier.
    async fn ping(&self) -> AssocResult<()>;

    /// Scan for `pattern` until exhausted, deleting each matched batch.
    /// Returns the number of keys removed.
    async fn scan_and_delete(&self, pattern: &KeyPattern, batch: usize) -> AssocResult<u64> {
        let batch = batch.max(1);
        let mut after: Option<String> = None;
        let mut removed = 0;
        loop {
            let ScanBatch { keys, next } = self.scan(after.as_deref(), pattern, batch).await?;
            if !keys.is_empty() {
                removed += self.delete(&keys).await?;
            }
            match next {
                Some(resume) => after = Some(resume),
                None => break,
            }
        }
        Ok(removed)
    }
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of entries currently stored, expired ones included until
    /// the next sweep.
    pub entry_count: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.8).abs() < 0.001);

        let empty_stats = CacheStats::default();
        assert!((empty_stats.hit_rate() - 0.0).abs() < 0.001);
    }
}
