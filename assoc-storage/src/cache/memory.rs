//! In-memory cache tier.
//!
//! An ordered map with lazy expiry: expired entries read as absent, and a
//! write sweeps them all out once every [`SWEEP_INTERVAL`]. Key order makes
//! the pattern scan a range walk from the pattern's literal prefix.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use assoc_core::{AssocResult, Clock, StorageError, SystemClock, Timestamp};

use super::pattern::KeyPattern;
use super::traits::{CacheStats, CacheTier, ScanBatch, SWEEP_INTERVAL};

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    /// `None` when the TTL is too large to represent.
    expires_at: Option<Timestamp>,
}

impl CacheEntry {
    fn is_live(&self, now: Timestamp) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// Process-local cache tier.
#[derive(Debug)]
pub struct InMemoryCacheTier {
    entries: RwLock<BTreeMap<String, CacheEntry>>,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
    unavailable: AtomicBool,
    /// Unix millis at or after which the next `set` sweeps.
    next_sweep: AtomicI64,
}

impl Default for InMemoryCacheTier {
    fn default() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }
}

impl InMemoryCacheTier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tier whose TTLs are measured against `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            clock,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            unavailable: AtomicBool::new(false),
            next_sweep: AtomicI64::new(i64::MIN),
        }
    }

    /// Make every subsequent call fail with a cache error (or recover).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Live keys, in order. Test and diagnostics helper.
    pub fn keys(&self) -> Vec<String> {
        let now = self.clock.now();
        self.entries
            .read()
            .map(|entries| {
                entries
                    .iter()
                    .filter(|(_, entry)| entry.is_live(now))
                    .map(|(key, _)| key.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn check_available(&self) -> AssocResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::cache("in-memory tier marked unavailable").into());
        }
        Ok(())
    }

    fn expiry(now: Timestamp, ttl: Duration) -> Option<Timestamp> {
        chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
    }

    /// Claim the sweep slot if it has come round.
    fn sweep_due(&self, now: Timestamp) -> bool {
        let now_ms = now.timestamp_millis();
        if now_ms < self.next_sweep.load(Ordering::Relaxed) {
            return false;
        }
        let interval_ms = i64::try_from(SWEEP_INTERVAL.as_millis()).unwrap_or(i64::MAX);
        self.next_sweep
            .store(now_ms.saturating_add(interval_ms), Ordering::Relaxed);
        true
    }

    fn sweep(entries: &mut BTreeMap<String, CacheEntry>, now: Timestamp) -> u64 {
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        (before - entries.len()) as u64
    }
}

#[async_trait]
impl CacheTier for InMemoryCacheTier {
    async fn get(&self, key: &str) -> AssocResult<Option<String>> {
        self.check_available()?;
        let now = self.clock.now();
        let entries = self.entries.read().map_err(|_| StorageError::LockPoisoned)?;
        match entries.get(key).filter(|entry| entry.is_live(now)) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(entry.value.clone()))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> AssocResult<()> {
        self.check_available()?;
        let now = self.clock.now();
        let expires_at = Self::expiry(now, ttl);
        let mut entries = self.entries.write().map_err(|_| StorageError::LockPoisoned)?;
        if self.sweep_due(now) {
            Self::sweep(&mut entries, now);
        }
        entries.insert(key.to_string(), CacheEntry { value, expires_at });
        Ok(())
    }

    async fn scan(
        &self,
        after: Option<&str>,
        pattern: &KeyPattern,
        count: usize,
    ) -> AssocResult<ScanBatch> {
        self.check_available()?;
        let count = count.max(1);
        let prefix = pattern.literal_prefix();
        let entries = self.entries.read().map_err(|_| StorageError::LockPoisoned)?;

        let start = match after {
            Some(after) if after >= prefix => Bound::Excluded(after.to_string()),
            _ => Bound::Included(prefix.to_string()),
        };

        let mut batch = ScanBatch::default();
        let mut examined = 0;
        let mut last = None;
        let mut range = entries
            .range((start, Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(prefix))
            .peekable();

        while examined < count {
            let Some((key, _)) = range.next() else {
                break;
            };
            examined += 1;
            if pattern.matches(key) {
                batch.keys.push(key.clone());
            }
            last = Some(key.clone());
        }

        if range.peek().is_some() {
            batch.next = last;
        }
        Ok(batch)
    }

    async fn delete(&self, keys: &[String]) -> AssocResult<u64> {
        self.check_available()?;
        let now = self.clock.now();
        let mut entries = self.entries.write().map_err(|_| StorageError::LockPoisoned)?;
        let mut removed = 0;
        for key in keys {
            if let Some(entry) = entries.remove(key) {
                if entry.is_live(now) {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    async fn purge_expired(&self) -> AssocResult<u64> {
        self.check_available()?;
        let now = self.clock.now();
        let mut entries = self.entries.write().map_err(|_| StorageError::LockPoisoned)?;
        Ok(Self::sweep(&mut entries, now))
    }

    async fn stats(&self) -> AssocResult<CacheStats> {
        let entries = self.entries.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: entries.len() as u64,
        })
    }

    async fn ping(&self) -> AssocResult<()> {
        self.check_available()
    }
}
