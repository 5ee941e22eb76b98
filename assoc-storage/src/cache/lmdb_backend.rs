//! LMDB-backed cache tier.
//!
//! Uses the heed crate (Rust bindings for LMDB) for a memory-mapped,
//! persistent page cache that survives process restarts.
//!
//! # Value Format
//!
//! `[expires_at: 8 bytes, i64 little-endian unix millis][value: UTF-8]`
//!
//! An `expires_at` of `i64::MAX` never expires. Expired entries read as
//! absent. A `set` reclaims them inside its own write transaction once every
//! [`SWEEP_INTERVAL`], which keeps a write-only cache from filling the map.
//!
//! # Thread Safety
//!
//! LMDB provides ACID transactions. Reads and scans use read transactions,
//! `set` and `delete` use write transactions, and statistics are atomic
//! counters.

use std::ops::Bound;
use std::path::Path;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use assoc_core::{AssocError, AssocResult, Clock, StorageError, SystemClock};
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions, RwTxn};

use super::pattern::KeyPattern;
use super::traits::{CacheStats, CacheTier, ScanBatch, SWEEP_INTERVAL};

const STAMP_LEN: usize = 8;

/// Error type for LMDB cache operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbCacheError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Stored bytes are not a valid entry.
    #[error("Corrupt entry: {0}")]
    Corrupt(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbCacheError> for StorageError {
    fn from(e: LmdbCacheError) -> Self {
        StorageError::cache(e.to_string())
    }
}

impl From<LmdbCacheError> for AssocError {
    fn from(e: LmdbCacheError) -> Self {
        AssocError::Storage(e.into())
    }
}

fn txn_err(e: heed::Error) -> LmdbCacheError {
    LmdbCacheError::Transaction(e.to_string())
}

/// LMDB-backed cache tier.
///
/// # Example
///
/// ```ignore
/// use assoc_storage::cache::{CacheTier, LmdbCacheTier};
///
/// let tier = LmdbCacheTier::new("/var/cache/assoc", 256)?;
/// tier.set("assoc:1:follow:start:20", page_json, Duration::from_secs(3600)).await?;
/// ```
pub struct LmdbCacheTier {
    /// The LMDB environment.
    env: Env,
    /// The main database (single unnamed database).
    db: Database<Bytes, Bytes>,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
    /// Unix millis at or after which the next `set` sweeps.
    next_sweep: AtomicI64,
}

impl std::fmt::Debug for LmdbCacheTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LmdbCacheTier")
            .field("path", &self.env.path())
            .finish_non_exhaustive()
    }
}

impl LmdbCacheTier {
    /// Open (or create) an LMDB cache tier.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the database in megabytes
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the LMDB
    /// environment or database cannot be opened.
    pub fn new<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbCacheError> {
        Self::with_clock(path, max_size_mb, Arc::new(SystemClock))
    }

    /// Like [`LmdbCacheTier::new`], measuring TTLs against `clock`.
    pub fn with_clock<P: AsRef<Path>>(
        path: P,
        max_size_mb: usize,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, LmdbCacheError> {
        std::fs::create_dir_all(&path)?;

        // SAFETY: the environment is opened once per directory by this
        // process and never mapped with conflicting flags.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbCacheError::EnvOpen(e.to_string()))?;

        let mut wtxn = env.write_txn().map_err(txn_err)?;
        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbCacheError::DbOpen(e.to_string()))?;
        wtxn.commit().map_err(txn_err)?;

        Ok(Self {
            env,
            db,
            clock,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            next_sweep: AtomicI64::new(i64::MIN),
        })
    }

    fn now_millis(&self) -> i64 {
        self.clock.now().timestamp_millis()
    }

    fn encode_entry(&self, value: &str, ttl: Duration) -> Vec<u8> {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at = self.now_millis().saturating_add(ttl_ms);

        let mut bytes = Vec::with_capacity(STAMP_LEN + value.len());
        bytes.extend_from_slice(&expires_at.to_le_bytes());
        bytes.extend_from_slice(value.as_bytes());
        bytes
    }

    fn sweep_due(&self, now_ms: i64) -> bool {
        if now_ms < self.next_sweep.load(Ordering::Relaxed) {
            return false;
        }
        let interval_ms = i64::try_from(SWEEP_INTERVAL.as_millis()).unwrap_or(i64::MAX);
        self.next_sweep
            .store(now_ms.saturating_add(interval_ms), Ordering::Relaxed);
        true
    }

    /// Delete every entry dead at `now_ms` within `wtxn`. Entries that no
    /// longer decode can never be read, so they go too.
    fn sweep(&self, wtxn: &mut RwTxn<'_>, now_ms: i64) -> Result<u64, LmdbCacheError> {
        let mut dead: Vec<Vec<u8>> = Vec::new();
        for item in self.db.iter(&*wtxn).map_err(txn_err)? {
            let (key, bytes) = item.map_err(txn_err)?;
            match Self::decode_entry(bytes) {
                Ok((expires_at, _)) if now_ms < expires_at => {}
                _ => dead.push(key.to_vec()),
            }
        }
        for key in &dead {
            self.db.delete(wtxn, key).map_err(txn_err)?;
        }
        Ok(dead.len() as u64)
    }

    /// Split a stored entry into its expiry and value.
    fn decode_entry(bytes: &[u8]) -> Result<(i64, &str), LmdbCacheError> {
        if bytes.len() < STAMP_LEN {
            return Err(LmdbCacheError::Corrupt(format!(
                "entry is {} bytes, shorter than its expiry stamp",
                bytes.len()
            )));
        }
        let (stamp, value) = bytes.split_at(STAMP_LEN);
        let stamp: [u8; STAMP_LEN] = stamp
            .try_into()
            .map_err(|_| LmdbCacheError::Corrupt("invalid expiry stamp".into()))?;
        let value = std::str::from_utf8(value)
            .map_err(|e| LmdbCacheError::Corrupt(format!("value is not UTF-8: {e}")))?;
        Ok((i64::from_le_bytes(stamp), value))
    }
}

#[async_trait]
impl CacheTier for LmdbCacheTier {
    async fn get(&self, key: &str) -> AssocResult<Option<String>> {
        let rtxn = self.env.read_txn().map_err(txn_err)?;
        let found = self.db.get(&rtxn, key.as_bytes()).map_err(txn_err)?;

        let live = match found {
            Some(bytes) => {
                let (expires_at, value) = Self::decode_entry(bytes)?;
                (self.now_millis() < expires_at).then(|| value.to_string())
            }
            None => None,
        };

        match &live {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        Ok(live)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> AssocResult<()> {
        let entry = self.encode_entry(&value, ttl);
        let now_ms = self.now_millis();
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        if self.sweep_due(now_ms) {
            self.sweep(&mut wtxn, now_ms)?;
        }
        self.db
            .put(&mut wtxn, key.as_bytes(), &entry)
            .map_err(txn_err)?;
        wtxn.commit().map_err(txn_err)?;
        Ok(())
    }

    async fn scan(
        &self,
        after: Option<&str>,
        pattern: &KeyPattern,
        count: usize,
    ) -> AssocResult<ScanBatch> {
        let count = count.max(1);
        let prefix = pattern.literal_prefix();
        let start: Bound<&[u8]> = match after {
            Some(after) if after >= prefix => Bound::Excluded(after.as_bytes()),
            _ => Bound::Included(prefix.as_bytes()),
        };
        let bounds: (Bound<&[u8]>, Bound<&[u8]>) = (start, Bound::Unbounded);

        let rtxn = self.env.read_txn().map_err(txn_err)?;
        let iter = self.db.range(&rtxn, &bounds).map_err(txn_err)?;

        let mut batch = ScanBatch::default();
        let mut last: Option<String> = None;
        let mut examined = 0;
        let mut exhausted = true;

        for item in iter {
            let (key, _) = item.map_err(txn_err)?;
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            if examined == count {
                exhausted = false;
                break;
            }
            examined += 1;
            // Page keys are always UTF-8; anything else cannot match.
            if let Ok(key) = std::str::from_utf8(key) {
                if pattern.matches(key) {
                    batch.keys.push(key.to_string());
                }
                last = Some(key.to_string());
            }
        }

        if !exhausted {
            batch.next = last;
        }
        Ok(batch)
    }

    async fn delete(&self, keys: &[String]) -> AssocResult<u64> {
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        let mut removed = 0;
        for key in keys {
            if self.db.delete(&mut wtxn, key.as_bytes()).map_err(txn_err)? {
                removed += 1;
            }
        }
        wtxn.commit().map_err(txn_err)?;
        Ok(removed)
    }

    async fn purge_expired(&self) -> AssocResult<u64> {
        let now_ms = self.now_millis();
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        let removed = self.sweep(&mut wtxn, now_ms)?;
        wtxn.commit().map_err(txn_err)?;
        Ok(removed)
    }

    async fn stats(&self) -> AssocResult<CacheStats> {
        let rtxn = self.env.read_txn().map_err(txn_err)?;
        let entry_count = self.db.len(&rtxn).map_err(txn_err)?;
        Ok(CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count,
        })
    }

    async fn ping(&self) -> AssocResult<()> {
        self.env.read_txn().map_err(txn_err)?;
        Ok(())
    }
}
