//! # Batch Dispatcher
//!
//! Decides, per batch, whether results come from the accelerator or the
//! reference verifier, and guarantees that a failed accelerator attempt is
//! invisible to the caller.
//!
//! ## Routing
//!
//! ```text
//! batch ──→ empty? ──yes──→ []
//!             │no
//!             ↓
//!   accelerator configured and len >= threshold? ──no──→ [Reference]
//!             │yes
//!             ↓
//!   init() == Ready and self-test passed? ──no──→ [Reference]
//!             │yes
//!             ↓
//!   [Accelerator, chunked] ──any chunk fails──→ [Reference, whole batch]
//! ```
//!
//! Results are never merged across paths: a batch's results come entirely
//! from one path.

use crate::config::VerifierConfig;
use crate::domain::entities::{DispatchReport, Route, VerificationRequest};
use crate::domain::reference::ReferenceVerifier;
use crate::domain::selftest::known_answer_vectors;
use crate::ports::outbound::{DispatchObserver, NoopObserver};
use relay_compute::{BackendError, BatchColumns, BatchVerifyBackend, Readiness};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Routes batches between the accelerator and the reference verifier.
pub struct BatchDispatcher {
    reference: ReferenceVerifier,
    accelerator: Option<Arc<dyn BatchVerifyBackend>>,
    batch_size_threshold: usize,
    max_accelerator_chunk: usize,
    self_test_enabled: bool,
    /// Settled self-test verdict. Stays `None` while attempts end in
    /// recoverable call failures.
    self_test: Mutex<Option<bool>>,
    disable_reported: AtomicBool,
    observer: Arc<dyn DispatchObserver>,
}

impl BatchDispatcher {
    /// Create a dispatcher. `accelerator` is `None` when acceleration is
    /// disabled.
    pub fn new(accelerator: Option<Arc<dyn BatchVerifyBackend>>, config: &VerifierConfig) -> Self {
        Self {
            reference: ReferenceVerifier::new(),
            accelerator,
            batch_size_threshold: config.batch_size_threshold.max(1),
            max_accelerator_chunk: config.max_accelerator_chunk.max(1),
            self_test_enabled: config.accelerator_self_test,
            self_test: Mutex::new(None),
            disable_reported: AtomicBool::new(false),
            observer: Arc::new(NoopObserver),
        }
    }

    /// Report dispatch outcomes to `observer`.
    pub fn with_observer(mut self, observer: Arc<dyn DispatchObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn batch_size_threshold(&self) -> usize {
        self.batch_size_threshold
    }

    pub fn max_accelerator_chunk(&self) -> usize {
        self.max_accelerator_chunk
    }

    /// Accelerator readiness, or `None` if acceleration is disabled.
    pub fn accelerator_readiness(&self) -> Option<Readiness> {
        self.accelerator.as_ref().map(|backend| backend.readiness())
    }

    /// Choose the path for a batch of `len` requests.
    ///
    /// The first eligible batch triggers the accelerator's lazy
    /// initialization on the blocking pool and, if enabled, its self-test.
    pub async fn route_for(&self, len: usize) -> Route {
        if len == 0 || len < self.batch_size_threshold {
            return Route::Reference;
        }
        let Some(backend) = &self.accelerator else {
            return Route::Reference;
        };

        if self.initialize(backend).await != Readiness::Ready {
            return Route::Reference;
        }

        if self.self_test_enabled && !self.self_test_passed(backend.as_ref()).await {
            return Route::Reference;
        }

        // Disabled by another caller since init
        if backend.readiness() != Readiness::Ready {
            return Route::Reference;
        }

        Route::Accelerator
    }

    /// Verify a batch. Result `i` belongs to request `i`.
    pub async fn dispatch(&self, requests: Vec<VerificationRequest>) -> DispatchReport {
        if requests.is_empty() {
            return DispatchReport::empty();
        }

        let batch_size = requests.len();
        let route = self.route_for(batch_size).await;

        let report = match (route, &self.accelerator) {
            (Route::Accelerator, Some(backend)) => {
                match self.run_accelerator(backend.as_ref(), &requests).await {
                    Ok(results) => DispatchReport::new(results, Route::Accelerator, false),
                    Err(e) => {
                        self.observer
                            .accelerator_fallback(backend.name(), &e, batch_size);
                        if e.is_unrecoverable() {
                            self.disable(backend.as_ref(), &e.to_string());
                        }

                        let results = self.run_reference(requests).await;
                        DispatchReport::new(results, Route::Reference, true)
                    }
                }
            }
            _ => {
                let results = self.run_reference(requests).await;
                DispatchReport::new(results, Route::Reference, false)
            }
        };

        self.observer.batch_dispatched(&report);
        report
    }

    /// Run the backend's first initialization off the async workers, since
    /// loading a library blocks.
    async fn initialize(&self, backend: &Arc<dyn BatchVerifyBackend>) -> Readiness {
        if backend.readiness() != Readiness::Unloaded {
            return backend.readiness();
        }

        let loading = Arc::clone(backend);
        match tokio::task::spawn_blocking(move || loading.init()).await {
            Ok(readiness) => readiness,
            Err(e) => {
                warn!(backend = backend.name(), error = %e, "Accelerator initialization aborted");
                backend.readiness()
            }
        }
    }

    /// Reference path on the blocking pool.
    async fn run_reference(&self, requests: Vec<VerificationRequest>) -> Vec<bool> {
        let reference = self.reference;
        let requests = Arc::new(requests);
        let shared = Arc::clone(&requests);

        match tokio::task::spawn_blocking(move || reference.verify_batch(&shared)).await {
            Ok(results) => results,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => {
                // Runtime shutting down; finish on this thread
                debug!(error = %e, "Blocking pool unavailable, verifying inline");
                reference.verify_batch(&requests)
            }
        }
    }

    /// Accelerator path: one call per chunk, results concatenated in order.
    async fn run_accelerator(
        &self,
        backend: &dyn BatchVerifyBackend,
        requests: &[VerificationRequest],
    ) -> Result<Vec<bool>, BackendError> {
        let mut results = Vec::with_capacity(requests.len());

        for chunk in requests.chunks(self.max_accelerator_chunk) {
            let columns: BatchColumns = chunk.iter().map(VerificationRequest::to_row).collect();
            let chunk_results = backend.verify_batch(columns).await?;

            if chunk_results.len() != chunk.len() {
                return Err(BackendError::LayoutMismatch(format!(
                    "expected {} results, got {}",
                    chunk.len(),
                    chunk_results.len()
                )));
            }

            results.extend(chunk_results);
        }

        Ok(results)
    }

    /// The settled self-test verdict, running the self-test if none exists.
    ///
    /// Concurrent callers wait for the attempt in progress.
    async fn self_test_passed(&self, backend: &dyn BatchVerifyBackend) -> bool {
        let mut verdict = self.self_test.lock().await;
        if let Some(passed) = *verdict {
            return passed;
        }

        match self.run_self_test(backend).await {
            Some(passed) => {
                *verdict = Some(passed);
                passed
            }
            None => false,
        }
    }

    /// Compare the accelerator against the known answers.
    ///
    /// A disagreement, a malformed answer or an unrecoverable error disables
    /// the accelerator for the rest of the process. A recoverable call
    /// failure settles nothing: `None`, and the next eligible batch retries.
    async fn run_self_test(&self, backend: &dyn BatchVerifyBackend) -> Option<bool> {
        let vectors = match known_answer_vectors() {
            Ok(vectors) => vectors,
            Err(e) => {
                self.disable(backend, &format!("self-test vectors unavailable: {}", e));
                return Some(false);
            }
        };

        let columns: BatchColumns = vectors.iter().map(|v| v.request.to_row()).collect();

        match backend.verify_batch(columns).await {
            Ok(results) if results.len() == vectors.len() => {
                let mismatch = vectors
                    .iter()
                    .zip(&results)
                    .position(|(vector, &result)| vector.expected != result);

                match mismatch {
                    None => {
                        info!(
                            backend = backend.name(),
                            vectors = vectors.len(),
                            "Accelerator passed self-test"
                        );
                        Some(true)
                    }
                    Some(index) => {
                        self.disable(
                            backend,
                            &format!("self-test mismatch at vector {}", index),
                        );
                        Some(false)
                    }
                }
            }
            Ok(results) => {
                self.disable(
                    backend,
                    &format!(
                        "self-test returned {} results for {} vectors",
                        results.len(),
                        vectors.len()
                    ),
                );
                Some(false)
            }
            Err(e) if e.is_unrecoverable() => {
                self.disable(backend, &format!("self-test failed: {}", e));
                Some(false)
            }
            Err(e) => {
                warn!(
                    backend = backend.name(),
                    error = %e,
                    "Accelerator self-test call failed, will retry on next eligible batch"
                );
                None
            }
        }
    }

    /// Disable the accelerator. The observer hears about it once per
    /// dispatcher however many paths reach here.
    fn disable(&self, backend: &dyn BatchVerifyBackend, reason: &str) {
        let transitioned = backend.disable(reason);
        if self.disable_reported.swap(true, Ordering::SeqCst) {
            return;
        }

        warn!(backend = backend.name(), reason, transitioned, "Disabling accelerator");
        self.observer.backend_disabled(backend.name(), reason);
    }
}
