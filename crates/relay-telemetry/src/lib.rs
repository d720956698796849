//! # Relay Telemetry
//!
//! Observability for the signature gate.
//!
//! ## Components
//!
//! - **Logs**: `tracing` events rendered by a `tracing-subscriber` fmt layer,
//!   pretty for development or JSON for log shippers
//! - **Metrics**: Prometheus counters for batches, outcomes and accelerator
//!   fallbacks, exposed in text format for whatever scrape endpoint the host
//!   relay runs
//!
//! ## Usage
//!
//! ```rust,ignore
//! use relay_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     let _guard = init_telemetry(TelemetryConfig::from_env()).expect("telemetry");
//!     // Logs and metrics are now being collected
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `relay-sigverify` | Service name attached to logs |
//! | `RELAY_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `RELAY_JSON_LOGS` | `false` | JSON log lines |
//! | `RELAY_CONSOLE_OUTPUT` | `true` | Write logs to stdout |

mod config;
pub mod metrics;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use metrics::{
    encode_metrics, register_metrics, MetricsHandle, ACCELERATOR_FALLBACKS, BACKEND_DISABLED,
    BATCH_SIZE, SIGNATURE_BATCHES, SIGNATURE_OUTCOMES,
};
pub use tracing_setup::init_tracing;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracerInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and metrics.
///
/// Returns a guard that should be held for the lifetime of the application.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let metrics = register_metrics()?;
    init_tracing(&config)?;

    Ok(TelemetryGuard {
        _metrics: metrics,
        service_name: config.service_name,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    _metrics: MetricsHandle,
    service_name: String,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.service_name, "Shutting down telemetry");
    }
}
