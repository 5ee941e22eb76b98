//! Assoc Service - Runtime Wiring
//!
//! The PostgreSQL backing store, environment configuration, tracing setup
//! and the [`Service`] facade that validates payloads before they reach the
//! stores.

pub mod config;
pub mod db;
pub mod error;
pub mod service;
pub mod telemetry;

pub use config::{CacheBackendKind, CacheSettings, DbConfig, ServiceConfig};
pub use db::{DbClient, SCHEMA};
pub use error::{pg_error, pg_insert_error, pool_error, ServiceError, ServiceResult};
pub use service::{ComponentStatus, HealthReport, Service};
pub use telemetry::{init_tracing, LogFormat, TelemetryConfig};
