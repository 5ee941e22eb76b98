//! Environment-driven configuration.
//!
//! | Variable | Default |
//! |---|---|
//! | `ASSOC_DB_HOST` | `localhost` |
//! | `ASSOC_DB_PORT` | `5432` |
//! | `ASSOC_DB_NAME` | `assoc` |
//! | `ASSOC_DB_USER` | `postgres` |
//! | `ASSOC_DB_PASSWORD` | empty |
//! | `ASSOC_DB_POOL_SIZE` | `16` |
//! | `ASSOC_DB_TIMEOUT` | `30` (seconds) |
//! | `ASSOC_CACHE_BACKEND` | `memory` (`memory` or `lmdb`) |
//! | `ASSOC_LMDB_PATH` | `./assoc-cache` |
//! | `ASSOC_LMDB_MAX_MB` | `256` |
//! | `ASSOC_PAGE_TTL_SECS` | `3600` |
//! | `ASSOC_SCAN_BATCH` | `100` |
//!
//! Unparseable numbers fall back to their defaults.

use assoc_core::StoreConfig;
use assoc_storage::{AnyCacheTier, InMemoryCacheTier, LmdbCacheTier};
use deadpool_postgres::{Config, ManagerConfig, Pool, RecyclingMethod, Runtime, Timeouts};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tokio_postgres::NoTls;

use crate::error::{ServiceError, ServiceResult};
use crate::telemetry::TelemetryConfig;

fn env_parse<T: FromStr>(var: &str) -> Option<T> {
    std::env::var(var).ok().and_then(|s| s.trim().parse().ok())
}

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// Connection checkout timeout
    pub timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "assoc".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
            max_size: 16,
            timeout: Duration::from_secs(30),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("ASSOC_DB_HOST").unwrap_or(defaults.host),
            port: env_parse("ASSOC_DB_PORT").unwrap_or(defaults.port),
            dbname: std::env::var("ASSOC_DB_NAME").unwrap_or(defaults.dbname),
            user: std::env::var("ASSOC_DB_USER").unwrap_or(defaults.user),
            password: std::env::var("ASSOC_DB_PASSWORD").unwrap_or_default(),
            max_size: env_parse("ASSOC_DB_POOL_SIZE").unwrap_or(defaults.max_size),
            timeout: env_parse("ASSOC_DB_TIMEOUT")
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }

    /// Create a connection pool from this configuration.
    ///
    /// No connection is opened until the first checkout.
    pub fn create_pool(&self) -> ServiceResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_cfg = deadpool_postgres::PoolConfig::new(self.max_size);
        pool_cfg.timeouts = Timeouts {
            wait: Some(self.timeout),
            create: Some(self.timeout),
            recycle: Some(self.timeout),
        };
        cfg.pool = Some(pool_cfg);

        cfg.create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ServiceError::Pool(e.to_string()))
    }
}

// ============================================================================
// CACHE TIER CONFIGURATION
// ============================================================================

/// Which cache tier to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheBackendKind {
    #[default]
    Memory,
    Lmdb,
}

impl FromStr for CacheBackendKind {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "lmdb" => Ok(Self::Lmdb),
            other => Err(ServiceError::config(
                "ASSOC_CACHE_BACKEND",
                format!("expected memory or lmdb, got {other:?}"),
            )),
        }
    }
}

/// Cache tier settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    pub backend: CacheBackendKind,
    /// LMDB environment directory.
    pub lmdb_path: PathBuf,
    /// LMDB map size in megabytes.
    pub lmdb_max_mb: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::Memory,
            lmdb_path: PathBuf::from("./assoc-cache"),
            lmdb_max_mb: 256,
        }
    }
}

impl CacheSettings {
    pub fn from_env() -> ServiceResult<Self> {
        let defaults = Self::default();
        let backend = match std::env::var("ASSOC_CACHE_BACKEND") {
            Ok(raw) => raw.parse()?,
            Err(_) => defaults.backend,
        };
        Ok(Self {
            backend,
            lmdb_path: std::env::var("ASSOC_LMDB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.lmdb_path),
            lmdb_max_mb: env_parse("ASSOC_LMDB_MAX_MB").unwrap_or(defaults.lmdb_max_mb),
        })
    }

    /// Open the configured tier. LMDB creates its directory if needed.
    pub fn open(&self) -> ServiceResult<AnyCacheTier> {
        let tier: AnyCacheTier = match self.backend {
            CacheBackendKind::Memory => InMemoryCacheTier::new().into(),
            CacheBackendKind::Lmdb => LmdbCacheTier::new(&self.lmdb_path, self.lmdb_max_mb)?.into(),
        };
        Ok(tier)
    }
}

// ============================================================================
// SERVICE CONFIGURATION
// ============================================================================

/// Everything the service needs at startup.
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    pub db: DbConfig,
    pub cache: CacheSettings,
    pub store: StoreConfig,
    pub telemetry: TelemetryConfig,
}

impl ServiceConfig {
    pub fn from_env() -> ServiceResult<Self> {
        let mut store = StoreConfig::default();
        if let Some(secs) = env_parse::<u64>("ASSOC_PAGE_TTL_SECS") {
            store = store.with_page_ttl(Duration::from_secs(secs));
        }
        if let Some(batch) = env_parse::<usize>("ASSOC_SCAN_BATCH") {
            store = store.with_scan_batch(batch);
        }

        Ok(Self {
            db: DbConfig::from_env(),
            cache: CacheSettings::from_env()?,
            store,
            telemetry: TelemetryConfig::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_config_defaults() {
        let config = DbConfig::default();
        assert_eq!(config.port, 5432);
        assert_eq!(config.dbname, "assoc");
        assert_eq!(config.max_size, 16);
    }

    #[test]
    fn test_cache_backend_parse() {
        assert_eq!("memory".parse::<CacheBackendKind>().unwrap(), CacheBackendKind::Memory);
        assert_eq!(" LMDB ".parse::<CacheBackendKind>().unwrap(), CacheBackendKind::Lmdb);
        assert!("redis".parse::<CacheBackendKind>().is_err());
    }

    #[test]
    fn test_open_lmdb_tier() {
        let dir = tempfile::tempdir().unwrap();
        let settings = CacheSettings {
            backend: CacheBackendKind::Lmdb,
            lmdb_path: dir.path().join("pages"),
            lmdb_max_mb: 8,
        };
        assert_eq!(settings.open().unwrap().kind(), "lmdb");
        assert_eq!(CacheSettings::default().open().unwrap().kind(), "memory");
    }

    #[test]
    fn test_create_pool_is_lazy() {
        let config = DbConfig {
            host: "db.invalid".to_string(),
            ..Default::default()
        };
        assert!(config.create_pool().is_ok());
    }
}
