//! Prometheus metrics for the signature gate.
//!
//! All metrics follow the naming convention: `relay_sigverify_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., batches_total)
//! - **Histogram**: Distribution of values (e.g., batch_size)

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Histogram, HistogramOpts, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Batches dispatched, by the path that produced the final result
    pub static ref SIGNATURE_BATCHES: CounterVec = CounterVec::new(
        Opts::new("relay_sigverify_batches_total", "Batches verified"),
        &["route"]  // route: reference/accelerator
    ).expect("metric creation failed");

    /// Per-request outcomes
    pub static ref SIGNATURE_OUTCOMES: CounterVec = CounterVec::new(
        Opts::new("relay_sigverify_signatures_total", "Signatures verified by outcome"),
        &["outcome"]  // outcome: valid/invalid
    ).expect("metric creation failed");

    /// Accelerator calls that were recomputed on the reference path
    pub static ref ACCELERATOR_FALLBACKS: CounterVec = CounterVec::new(
        Opts::new(
            "relay_sigverify_accelerator_fallbacks_total",
            "Accelerator batches recomputed by the reference verifier"
        ),
        &["reason"]
    ).expect("metric creation failed");

    /// Accelerator transitions to permanently unavailable
    pub static ref BACKEND_DISABLED: Counter = Counter::new(
        "relay_sigverify_backend_disabled_total",
        "Times the accelerator was permanently disabled"
    ).expect("metric creation failed");

    /// Dispatched batch sizes
    pub static ref BATCH_SIZE: Histogram = Histogram::with_opts(
        HistogramOpts::new("relay_sigverify_batch_size", "Requests per dispatched batch")
            .buckets(exponential_buckets(1.0, 4.0, 10).expect("valid bucket layout"))
    ).expect("metric creation failed");
}

/// Handle to the registry the metrics were registered with
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register all metrics with the global registry.
///
/// Safe to call more than once; metrics that are already registered are left
/// as they are.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(SIGNATURE_BATCHES.clone()),
        Box::new(SIGNATURE_OUTCOMES.clone()),
        Box::new(ACCELERATOR_FALLBACKS.clone()),
        Box::new(BACKEND_DISABLED.clone()),
        Box::new(BATCH_SIZE.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle {
        _registry: Arc::new(REGISTRY.clone()),
    })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
