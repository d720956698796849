//! # Relay-Compute: Optional Accelerator Binding
//!
//! This crate owns the lifecycle and call contract of the optional native
//! batch-verification capability. The reference CPU verifier lives in
//! `relay-sigverify`; this crate only knows how to hand a batch to an
//! accelerator and report exactly what happened.
//!
//! ## Philosophy: Advisory Acceleration, Never a Build Failure
//!
//! - **Runtime loading**: the accelerator is a shared library located at a
//!   configured path and loaded on first use. The crate compiles and runs
//!   without it.
//! - **One entry point**: a single fixed symbol with a fixed buffer layout,
//!   validated once at load time. A missing library or symbol marks the
//!   backend permanently unavailable.
//! - **Serialised calls**: the native state is not assumed reentrant, so only
//!   one batch call is in flight per process.
//!
//! ## Call Layout
//!
//! | Buffer | Size | Contents |
//! |--------|------|----------|
//! | `ids` | `count * 32` | record ids, concatenated |
//! | `signatures` | `count * 64` | compact `r || s` signatures |
//! | `pubkeys` | `count * 32` | x-only public keys |
//! | `results` | `count` x `int` | `1` valid, `0` invalid |
//!
//! The call returns `0` on success; any other status invalidates the whole
//! output buffer.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use relay_compute::{load_backend, Readiness};
//!
//! if let Some(backend) = load_backend("/usr/local/lib/libcuda_ecdsa.so") {
//!     if backend.init() == Readiness::Ready {
//!         let results = backend.verify_batch(columns).await?;
//!     }
//! }
//! ```

pub mod backends;
pub mod batch;
pub mod readiness;

pub use batch::{BatchColumns, ID_LEN, PUBKEY_LEN, SIGNATURE_LEN};
pub use readiness::{Readiness, ReadinessCell};

#[cfg(feature = "native")]
pub use backends::native::NativeBackend;

use std::sync::Arc;
use thiserror::Error;

/// Status reported when a native call was aborted before returning a status
/// of its own (the blocking task panicked or was torn down).
pub const ABORTED_CALL_STATUS: i32 = i32::MIN;

/// Accelerator errors.
///
/// None of these ever reach a validation caller; the dispatcher turns every
/// one of them into a reference-path recomputation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Accelerator failed to load: {0}")]
    LoadFailed(String),

    #[error("Accelerator call failed with status {0}")]
    CallFailed(i32),

    #[error("Accelerator call layout mismatch: {0}")]
    LayoutMismatch(String),

    #[error("Accelerator is not ready")]
    Unavailable,
}

impl BackendError {
    /// Whether the backend can no longer be trusted for this process.
    ///
    /// A plain nonzero status is a failed call; a broken output contract or an
    /// aborted call means the native resource itself is suspect.
    pub fn is_unrecoverable(&self) -> bool {
        match self {
            BackendError::LayoutMismatch(_) => true,
            BackendError::CallFailed(status) => *status == ABORTED_CALL_STATUS,
            BackendError::LoadFailed(_) | BackendError::Unavailable => false,
        }
    }

    /// Short, stable label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            BackendError::LoadFailed(_) => "load_failed",
            BackendError::CallFailed(_) => "call_failed",
            BackendError::LayoutMismatch(_) => "layout_mismatch",
            BackendError::Unavailable => "unavailable",
        }
    }
}

/// Batch verification backend - implemented by the native accelerator and by
/// test doubles.
#[async_trait::async_trait]
pub trait BatchVerifyBackend: Send + Sync {
    /// Backend name for logs and metrics
    fn name(&self) -> &str;

    /// Current readiness, without triggering initialization
    fn readiness(&self) -> Readiness;

    /// Initialize the backend if it has not been attempted yet.
    ///
    /// Idempotent: only the first call does any work, later calls report the
    /// state that attempt settled on.
    fn init(&self) -> Readiness;

    /// Verify a whole batch in one atomic call.
    ///
    /// On success the result has exactly `batch.len()` entries, index-aligned
    /// with the input.
    async fn verify_batch(&self, batch: BatchColumns) -> Result<Vec<bool>, BackendError>;

    /// Permanently take the backend out of service for this process.
    ///
    /// Returns `true` only for the call that performed the transition.
    fn disable(&self, reason: &str) -> bool;
}

/// Build the accelerator backend for a configured library path.
///
/// An empty path disables acceleration. The returned backend is not yet
/// initialized; the library is loaded on first use.
pub fn load_backend(library_path: &str) -> Option<Arc<dyn BatchVerifyBackend>> {
    let library_path = library_path.trim();
    if library_path.is_empty() {
        tracing::debug!("No accelerator library configured, using reference verifier only");
        return None;
    }

    #[cfg(feature = "native")]
    {
        tracing::debug!(library = %library_path, "Accelerator library configured");
        Some(Arc::new(backends::native::NativeBackend::new(library_path)))
    }

    #[cfg(not(feature = "native"))]
    {
        tracing::warn!(
            library = %library_path,
            "Accelerator library configured but the `native` feature is disabled"
        );
        None
    }
}
