//! Service-level errors and backing store error mapping.
//!
//! Request-path failures are always [`AssocError`]. [`ServiceError`] only
//! covers startup: reading configuration, building the pool, opening the
//! cache tier and installing the tracing subscriber.

use assoc_core::{AssocError, AssociationKey, ConflictError, StorageError};
use assoc_storage::LmdbCacheError;
use thiserror::Error;
use tokio_postgres::error::SqlState;

/// Startup and lifecycle failures.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Invalid configuration {var}: {reason}")]
    Config { var: String, reason: String },

    #[error("Failed to create connection pool: {0}")]
    Pool(String),

    #[error("Failed to open cache tier: {0}")]
    Cache(#[from] LmdbCacheError),

    #[error("Failed to initialise tracing: {0}")]
    Telemetry(String),

    #[error(transparent)]
    Assoc(#[from] AssocError),
}

impl ServiceError {
    pub fn config(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config {
            var: var.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for service startup.
pub type ServiceResult<T> = Result<T, ServiceError>;

// ============================================================================
// DATABASE ERROR MAPPING
// ============================================================================

/// Map a PostgreSQL error to a storage failure.
pub fn pg_error(err: tokio_postgres::Error) -> AssocError {
    tracing::error!("Database error: {:?}", err);
    AssocError::Storage(StorageError::backend(format!("database operation failed: {err}")))
}

/// Map an insert error, turning a primary-key violation into a conflict.
pub fn pg_insert_error(err: tokio_postgres::Error, key: &AssociationKey) -> AssocError {
    if err.code() == Some(&SqlState::UNIQUE_VIOLATION) {
        return ConflictError::AssociationExists {
            source_id: key.source_id,
            association_type: key.association_type,
            destination_id: key.destination_id,
        }
        .into();
    }
    pg_error(err)
}

/// Map a pool checkout error.
pub fn pool_error(err: deadpool_postgres::PoolError) -> AssocError {
    tracing::error!("Connection pool error: {:?}", err);

    let reason = match err {
        deadpool_postgres::PoolError::Timeout(_) => "connection pool exhausted".to_string(),
        deadpool_postgres::PoolError::Closed => "connection pool is closed".to_string(),
        other => format!("failed to acquire database connection: {other}"),
    };
    AssocError::Storage(StorageError::Pool { reason })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_closed_is_storage_error() {
        let err = pool_error(deadpool_postgres::PoolError::Closed);
        assert!(!err.is_client_error());
        assert!(err.to_string().contains("closed"));
    }

    #[test]
    fn test_config_error_names_variable() {
        let err = ServiceError::config("ASSOC_CACHE_BACKEND", "expected memory or lmdb");
        assert!(err.to_string().contains("ASSOC_CACHE_BACKEND"));
    }
}
