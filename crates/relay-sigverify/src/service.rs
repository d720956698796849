//! # Validation Service
//!
//! The async façade the host relay calls. Decodes raw requests, hands the
//! well-formed ones to the dispatcher, and scatters results back so that
//! result `i` always answers request `i`.

use crate::adapters::TelemetryObserver;
use crate::config::{ConfigError, VerifierConfig};
use crate::dispatcher::BatchDispatcher;
use crate::domain::codec::decode_request;
use crate::domain::entities::{DispatchReport, RawRequest, SignedRecord, VerificationRequest};
use crate::ports::inbound::SignatureValidator;
use std::sync::Arc;
use tracing::debug;

/// Signature validation service.
///
/// Cheap to clone; clones share one dispatcher and so one accelerator.
#[derive(Clone)]
pub struct ValidationService {
    dispatcher: Arc<BatchDispatcher>,
}

impl ValidationService {
    pub fn new(dispatcher: BatchDispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }

    /// Wire backend, dispatcher and telemetry from configuration.
    ///
    /// The accelerator library, if configured, is not loaded until the first
    /// batch large enough to use it.
    pub fn from_config(config: VerifierConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let accelerator = relay_compute::load_backend(&config.accelerator_library_path);
        let dispatcher = BatchDispatcher::new(accelerator, &config)
            .with_observer(Arc::new(TelemetryObserver::new()));

        Ok(Self::new(dispatcher))
    }

    /// A service that never uses an accelerator.
    pub fn reference_only() -> Self {
        Self::new(BatchDispatcher::new(None, &VerifierConfig::default()))
    }

    pub fn dispatcher(&self) -> &BatchDispatcher {
        &self.dispatcher
    }

    /// Verify already-decoded requests.
    pub async fn validate_decoded(&self, requests: Vec<VerificationRequest>) -> DispatchReport {
        self.dispatcher.dispatch(requests).await
    }

    /// Validate records by their `id`, `sig` and `pubkey` fields.
    pub async fn validate_records(&self, records: &[SignedRecord]) -> Vec<bool> {
        let requests = records.iter().map(RawRequest::from).collect();
        self.validate(requests).await
    }
}

#[async_trait::async_trait]
impl SignatureValidator for ValidationService {
    async fn validate(&self, requests: Vec<RawRequest>) -> Vec<bool> {
        let mut results = vec![false; requests.len()];
        let mut positions = Vec::with_capacity(requests.len());
        let mut decoded = Vec::with_capacity(requests.len());

        for (index, raw) in requests.iter().enumerate() {
            match decode_request(raw) {
                Ok(request) => {
                    positions.push(index);
                    decoded.push(request);
                }
                Err(e) => {
                    debug!(index, field = %e.field(), error = %e, "Malformed request field");
                }
            }
        }

        let report = self.dispatcher.dispatch(decoded).await;

        for (index, valid) in positions.into_iter().zip(report.results) {
            results[index] = valid;
        }

        results
    }
}
