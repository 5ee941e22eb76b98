//! Runtime-selected cache tier.

use async_trait::async_trait;
use assoc_core::AssocResult;
use std::time::Duration;

use super::lmdb_backend::LmdbCacheTier;
use super::memory::InMemoryCacheTier;
use super::pattern::KeyPattern;
use super::traits::{CacheStats, CacheTier, ScanBatch};

/// Either built-in tier, chosen from configuration at startup.
#[derive(Debug)]
pub enum AnyCacheTier {
    Memory(InMemoryCacheTier),
    Lmdb(LmdbCacheTier),
}

impl AnyCacheTier {
    /// Short name for logs and health output.
    pub fn kind(&self) -> &'static str {
        match self {
            AnyCacheTier::Memory(_) => "memory",
            AnyCacheTier::Lmdb(_) => "lmdb",
        }
    }
}

impl From<InMemoryCacheTier> for AnyCacheTier {
    fn from(tier: InMemoryCacheTier) -> Self {
        AnyCacheTier::Memory(tier)
    }
}

impl From<LmdbCacheTier> for AnyCacheTier {
    fn from(tier: LmdbCacheTier) -> Self {
        AnyCacheTier::Lmdb(tier)
    }
}

#[async_trait]
impl CacheTier for AnyCacheTier {
    async fn get(&self, key: &str) -> AssocResult<Option<String>> {
        match self {
            AnyCacheTier::Memory(tier) => tier.get(key).await,
            AnyCacheTier::Lmdb(tier) => tier.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> AssocResult<()> {
        match self {
            AnyCacheTier::Memory(tier) => tier.set(key, value, ttl).await,
            AnyCacheTier::Lmdb(tier) => tier.set(key, value, ttl).await,
        }
    }

    async fn scan(
        &self,
        after: Option<&str>,
        pattern: &KeyPattern,
        count: usize,
    ) -> AssocResult<ScanBatch> {
        match self {
            AnyCacheTier::Memory(tier) => tier.scan(after, pattern, count).await,
            AnyCacheTier::Lmdb(tier) => tier.scan(after, pattern, count).await,
        }
    }

    async fn delete(&self, keys: &[String]) -> AssocResult<u64> {
        match self {
            AnyCacheTier::Memory(tier) => tier.delete(keys).await,
            AnyCacheTier::Lmdb(tier) => tier.delete(keys).await,
        }
    }

    async fn purge_expired(&self) -> AssocResult<u64> {
        match self {
            AnyCacheTier::Memory(tier) => tier.purge_expired().await,
            AnyCacheTier::Lmdb(tier) => tier.purge_expired().await,
        }
    }

    async fn stats(&self) -> AssocResult<CacheStats> {
        match self {
            AnyCacheTier::Memory(tier) => tier.stats().await,
            AnyCacheTier::Lmdb(tier) => tier.stats().await,
        }
    }

    async fn ping(&self) -> AssocResult<()> {
        match self {
            AnyCacheTier::Memory(tier) => tier.ping().await,
            AnyCacheTier::Lmdb(tier) => tier.ping().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dispatches_to_memory_tier() {
        let tier = AnyCacheTier::from(InMemoryCacheTier::new());
        assert_eq!(tier.kind(), "memory");
        tier.set("k", "v".into(), Duration::from_secs(5)).await.unwrap();
        assert_eq!(tier.get("k").await.unwrap().as_deref(), Some("v"));
        assert!(tier.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_dispatches_to_lmdb_tier() {
        let dir = tempfile::TempDir::new().unwrap();
        let tier = AnyCacheTier::from(LmdbCacheTier::new(dir.path(), 10).unwrap());
        assert_eq!(tier.kind(), "lmdb");
        tier.set("k", "v".into(), Duration::from_secs(5)).await.unwrap();
        let pattern = KeyPattern::new("k*").unwrap();
        assert_eq!(tier.scan_and_delete(&pattern, 10).await.unwrap(), 1);
        assert_eq!(tier.get("k").await.unwrap(), None);
    }
}
