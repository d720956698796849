//! # Outbound Ports (Driven Ports / SPI)
//!
//! Reporting hooks the dispatcher calls. None of them can influence results.

use crate::domain::entities::DispatchReport;
use relay_compute::BackendError;

/// Receives dispatch outcomes for logging and metrics.
pub trait DispatchObserver: Send + Sync {
    /// A batch finished; `report` carries the final results.
    fn batch_dispatched(&self, report: &DispatchReport);

    /// An accelerator attempt was discarded and the batch recomputed on the
    /// reference path.
    fn accelerator_fallback(&self, backend: &str, error: &BackendError, batch_size: usize);

    /// The accelerator was taken out of service for the rest of the process.
    fn backend_disabled(&self, backend: &str, reason: &str);
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl DispatchObserver for NoopObserver {
    fn batch_dispatched(&self, _report: &DispatchReport) {}

    fn accelerator_fallback(&self, _backend: &str, _error: &BackendError, _batch_size: usize) {}

    fn backend_disabled(&self, _backend: &str, _reason: &str) {}
}
