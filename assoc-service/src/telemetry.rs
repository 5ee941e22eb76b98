//! Tracing subscriber initialization.

use std::str::FromStr;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{ServiceError, ServiceResult};

const DEFAULT_FILTER: &str = "assoc_storage=debug,assoc_service=debug,info";

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ServiceError::config(
                "ASSOC_LOG_FORMAT",
                format!("expected pretty or json, got {other:?}"),
            )),
        }
    }
}

/// Telemetry configuration from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Filter directives (`ASSOC_LOG`, falling back to `RUST_LOG`)
    pub filter: Option<String>,
    /// Output format (`ASSOC_LOG_FORMAT`)
    pub format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            filter: std::env::var("ASSOC_LOG").ok().filter(|s| !s.trim().is_empty()),
            format: std::env::var("ASSOC_LOG_FORMAT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
        }
    }
}

impl TelemetryConfig {
    fn env_filter(&self) -> ServiceResult<EnvFilter> {
        match &self.filter {
            Some(directives) => EnvFilter::try_new(directives)
                .map_err(|e| ServiceError::config("ASSOC_LOG", e.to_string())),
            None => Ok(EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))),
        }
    }
}

/// Install the global tracing subscriber.
///
/// Call once at startup. A second call fails with
/// [`ServiceError::Telemetry`] because a global subscriber already exists.
pub fn init_tracing(config: &TelemetryConfig) -> ServiceResult<()> {
    let env_filter = config.env_filter()?;

    let json_layer = (config.format == LogFormat::Json)
        .then(|| tracing_subscriber::fmt::layer().json());
    let pretty_layer = (config.format == LogFormat::Pretty).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(pretty_layer)
        .try_init()
        .map_err(|e| ServiceError::Telemetry(format!("Failed to init subscriber: {}", e)))?;

    tracing::info!(format = ?config.format, filter = ?config.filter, "Telemetry initialized");

    Ok(())
}
