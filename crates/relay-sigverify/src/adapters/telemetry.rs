//! # Telemetry Adapter
//!
//! Reports dispatch outcomes as `tracing` events and Prometheus metrics from
//! `relay-telemetry`.

use crate::domain::entities::DispatchReport;
use crate::ports::outbound::DispatchObserver;
use relay_compute::BackendError;
use relay_telemetry::{
    ACCELERATOR_FALLBACKS, BACKEND_DISABLED, BATCH_SIZE, SIGNATURE_BATCHES, SIGNATURE_OUTCOMES,
};
use tracing::{debug, warn};

/// Observer backed by the global metrics registry.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryObserver;

impl TelemetryObserver {
    /// Create the observer, registering the metrics if nobody has yet.
    pub fn new() -> Self {
        if let Err(e) = relay_telemetry::register_metrics() {
            warn!(error = %e, "Failed to register signature gate metrics");
        }
        Self
    }
}

impl DispatchObserver for TelemetryObserver {
    fn batch_dispatched(&self, report: &DispatchReport) {
        let route = report.route.as_str();

        SIGNATURE_BATCHES.with_label_values(&[route]).inc();
        SIGNATURE_OUTCOMES
            .with_label_values(&["valid"])
            .inc_by(report.valid_count as f64);
        SIGNATURE_OUTCOMES
            .with_label_values(&["invalid"])
            .inc_by(report.invalid_count as f64);
        BATCH_SIZE.observe(report.results.len() as f64);

        debug!(
            route,
            batch_size = report.results.len(),
            valid = report.valid_count,
            invalid = report.invalid_count,
            fell_back = report.fell_back,
            "Batch verified"
        );
    }

    fn accelerator_fallback(&self, backend: &str, error: &BackendError, batch_size: usize) {
        ACCELERATOR_FALLBACKS
            .with_label_values(&[error.reason()])
            .inc();

        match error {
            BackendError::CallFailed(status) => warn!(
                backend,
                status,
                batch_size,
                "Accelerator call failed, recomputing on reference path"
            ),
            other => warn!(
                backend,
                reason = %other,
                batch_size,
                "Accelerator result discarded, recomputing on reference path"
            ),
        }
    }

    fn backend_disabled(&self, backend: &str, reason: &str) {
        BACKEND_DISABLED.inc();
        warn!(backend, reason, "Accelerator disabled for this process");
    }
}
