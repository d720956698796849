//! Native accelerator backend
//!
//! Loads a shared library exporting one batch-verification entry point:
//!
//! ```c
//! int cuda_ecdsa_verify_batch(const uint8_t *ids,        /* count * 32 */
//!                             const uint8_t *signatures, /* count * 64 */
//!                             const uint8_t *pubkeys,    /* count * 32 */
//!                             int *results,              /* count      */
//!                             int count);
//! ```
//!
//! NOTE: The library's internal state is not assumed reentrant. Every call
//! holds the backend's call lock for its full duration, including when the
//! awaiting caller is cancelled mid-call.

use crate::batch::BatchColumns;
use crate::readiness::{Readiness, ReadinessCell};
use crate::{BackendError, BatchVerifyBackend, ABORTED_CALL_STATUS};
use libloading::Library;
use std::os::raw::c_int;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tokio::sync::Mutex;

/// The single exported symbol the accelerator must provide.
pub const ENTRY_POINT: &str = "cuda_ecdsa_verify_batch";

type VerifyBatchFn = unsafe extern "C" fn(
    ids: *const u8,
    signatures: *const u8,
    pubkeys: *const u8,
    results: *mut c_int,
    count: c_int,
) -> c_int;

/// A loaded library together with its resolved entry point.
///
/// The library handle must outlive the function pointer, so both live here.
/// The handle is `None` only for entry points linked into the running binary.
struct NativeLibrary {
    _library: Option<Library>,
    verify: VerifyBatchFn,
}

/// Convert a row count to the native `int` count parameter.
fn native_count(rows: usize) -> Result<c_int, BackendError> {
    c_int::try_from(rows).map_err(|_| {
        BackendError::LayoutMismatch(format!(
            "batch of {} exceeds the native count range",
            rows
        ))
    })
}

impl NativeLibrary {
    fn open(path: &Path) -> Result<Self, BackendError> {
        // SAFETY: Loading runs the library's initializers. The path comes from
        // operator configuration and is expected to name an accelerator build.
        let library = unsafe { Library::new(path) }
            .map_err(|e| BackendError::LoadFailed(format!("{}: {}", path.display(), e)))?;

        // SAFETY: The symbol type is the fixed call contract of this binding.
        let verify = unsafe { library.get::<VerifyBatchFn>(ENTRY_POINT.as_bytes()) }
            .map(|symbol| *symbol)
            .map_err(|e| {
                BackendError::LoadFailed(format!("missing entry point `{}`: {}", ENTRY_POINT, e))
            })?;

        Ok(Self {
            _library: Some(library),
            verify,
        })
    }

    #[cfg(test)]
    fn from_entry_point(verify: VerifyBatchFn) -> Self {
        Self {
            _library: None,
            verify,
        }
    }

    /// Run one batch call. The caller must hold the call lock.
    fn call(&self, batch: &BatchColumns) -> Result<Vec<bool>, BackendError> {
        let count = native_count(batch.len())?;

        let mut codes: Vec<c_int> = vec![0; batch.len()];

        // SAFETY: The three input buffers are exactly count*32, count*64 and
        // count*32 bytes, and `codes` holds `count` ints. The pointers stay
        // valid for the whole call, which is synchronous.
        let status = unsafe {
            (self.verify)(
                batch.id_bytes().as_ptr(),
                batch.signature_bytes().as_ptr(),
                batch.pubkey_bytes().as_ptr(),
                codes.as_mut_ptr(),
                count,
            )
        };

        if status != 0 {
            return Err(BackendError::CallFailed(status));
        }

        codes
            .into_iter()
            .enumerate()
            .map(|(index, code)| match code {
                0 => Ok(false),
                1 => Ok(true),
                other => Err(BackendError::LayoutMismatch(format!(
                    "result code {} at index {}",
                    other, index
                ))),
            })
            .collect()
    }
}

/// Accelerator backed by a dynamically loaded native library.
pub struct NativeBackend {
    library_path: PathBuf,
    readiness: ReadinessCell,
    library: OnceLock<Option<Arc<NativeLibrary>>>,
    call_lock: Arc<Mutex<()>>,
}

impl NativeBackend {
    /// Create an unloaded backend for the given library path.
    pub fn new(library_path: impl Into<PathBuf>) -> Self {
        Self {
            library_path: library_path.into(),
            readiness: ReadinessCell::new(),
            library: OnceLock::new(),
            call_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn library_path(&self) -> &Path {
        &self.library_path
    }

    /// A ready backend whose entry point is a function in this binary.
    #[cfg(test)]
    fn with_entry_point(verify: VerifyBatchFn) -> Self {
        let backend = Self::new("<linked>");
        let _ = backend
            .library
            .set(Some(Arc::new(NativeLibrary::from_entry_point(verify))));
        backend.readiness.mark_ready();
        backend
    }

    fn load(&self) -> Option<Arc<NativeLibrary>> {
        match NativeLibrary::open(&self.library_path) {
            Ok(library) => {
                if self.readiness.mark_ready() {
                    tracing::info!(
                        library = %self.library_path.display(),
                        entry_point = ENTRY_POINT,
                        "Accelerator loaded"
                    );
                }
                Some(Arc::new(library))
            }
            Err(e) => {
                tracing::warn!(
                    library = %self.library_path.display(),
                    error = %e,
                    "Accelerator unavailable, using reference verifier for this process"
                );
                self.readiness.mark_unavailable();
                None
            }
        }
    }
}

#[async_trait::async_trait]
impl BatchVerifyBackend for NativeBackend {
    fn name(&self) -> &str {
        "native"
    }

    fn readiness(&self) -> Readiness {
        self.readiness.get()
    }

    fn init(&self) -> Readiness {
        if self.readiness.get() == Readiness::PermanentlyUnavailable {
            return Readiness::PermanentlyUnavailable;
        }
        self.library.get_or_init(|| self.load());
        self.readiness.get()
    }

    async fn verify_batch(&self, batch: BatchColumns) -> Result<Vec<bool>, BackendError> {
        if self.readiness.get() != Readiness::Ready {
            return Err(BackendError::Unavailable);
        }
        let library = self
            .library
            .get()
            .cloned()
            .flatten()
            .ok_or(BackendError::Unavailable)?;

        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let guard = Arc::clone(&self.call_lock).lock_owned().await;

        // The backend may have been disabled while this call was queued
        if self.readiness.get() != Readiness::Ready {
            return Err(BackendError::Unavailable);
        }

        let batch_size = batch.len();
        let outcome = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            library.call(&batch)
        })
        .await;

        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, batch_size, "Accelerator call aborted");
                Err(BackendError::CallFailed(ABORTED_CALL_STATUS))
            }
        };

        if let Err(e) = &result {
            if e.is_unrecoverable() {
                self.disable(&e.to_string());
            }
        }

        result
    }

    fn disable(&self, reason: &str) -> bool {
        let transitioned = self.readiness.mark_unavailable();
        if transitioned {
            tracing::warn!(
                library = %self.library_path.display(),
                reason,
                "Accelerator permanently disabled"
            );
        }
        transitioned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_row() -> BatchColumns {
        std::iter::once(([1u8; 32], [2u8; 64], [3u8; 32])).collect()
    }

    #[test]
    fn test_missing_library_is_permanently_unavailable() {
        let backend = NativeBackend::new("/nonexistent/path/libcuda_ecdsa.so");
        assert_eq!(backend.readiness(), Readiness::Unloaded);

        assert_eq!(backend.init(), Readiness::PermanentlyUnavailable);
        // Idempotent: never retried
        assert_eq!(backend.init(), Readiness::PermanentlyUnavailable);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_library_without_entry_point_is_rejected() {
        // libc is always present and certainly lacks the accelerator symbol
        let backend = NativeBackend::new("libc.so.6");
        assert_eq!(backend.init(), Readiness::PermanentlyUnavailable);
    }

    #[tokio::test]
    async fn test_verify_before_ready_is_unavailable() {
        let backend = NativeBackend::new("/nonexistent/path/libcuda_ecdsa.so");

        let result = backend.verify_batch(one_row()).await;
        assert_eq!(result, Err(BackendError::Unavailable));

        backend.init();
        let result = backend.verify_batch(one_row()).await;
        assert_eq!(result, Err(BackendError::Unavailable));
    }

    // =========================================================================
    // Call contract, driven through entry points linked into the test binary
    // =========================================================================

    use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
    use std::time::Duration;

    /// Row `i` carries id byte `b`, signature halves `b + 0x10` / `b + 0x20`
    /// and pubkey byte `b + 0x30`.
    fn patterned_row(b: u8) -> ([u8; 32], [u8; 64], [u8; 32]) {
        let mut signature = [b + 0x10; 64];
        signature[32..].fill(b + 0x20);
        (
            [b; 32],
            signature,
            [b + 0x30; 32],
        )
    }

    static LAYOUT_COUNT: AtomicI32 = AtomicI32::new(-1);

    /// Reports 1 for every row whose bytes sit where the call layout puts
    /// them.
    unsafe extern "C" fn check_layout(
        ids: *const u8,
        signatures: *const u8,
        pubkeys: *const u8,
        results: *mut c_int,
        count: c_int,
    ) -> c_int {
        LAYOUT_COUNT.store(count, Ordering::SeqCst);
        let rows = count as usize;
        let ids = std::slice::from_raw_parts(ids, rows * 32);
        let signatures = std::slice::from_raw_parts(signatures, rows * 64);
        let pubkeys = std::slice::from_raw_parts(pubkeys, rows * 32);
        let results = std::slice::from_raw_parts_mut(results, rows);

        for row in 0..rows {
            let id = &ids[row * 32..(row + 1) * 32];
            let signature = &signatures[row * 64..(row + 1) * 64];
            let pubkey = &pubkeys[row * 32..(row + 1) * 32];
            let b = id[0];

            let placed = id.iter().all(|&x| x == b)
                && signature[..32].iter().all(|&x| x == b + 0x10)
                && signature[32..].iter().all(|&x| x == b + 0x20)
                && pubkey.iter().all(|&x| x == b + 0x30);
            results[row] = c_int::from(placed);
        }
        0
    }

    unsafe extern "C" fn fail_with_status_7(
        _ids: *const u8,
        _signatures: *const u8,
        _pubkeys: *const u8,
        results: *mut c_int,
        count: c_int,
    ) -> c_int {
        std::slice::from_raw_parts_mut(results, count as usize).fill(1);
        7
    }

    unsafe extern "C" fn emit_code_2(
        _ids: *const u8,
        _signatures: *const u8,
        _pubkeys: *const u8,
        results: *mut c_int,
        count: c_int,
    ) -> c_int {
        let results = std::slice::from_raw_parts_mut(results, count as usize);
        results.fill(1);
        results[0] = 2;
        0
    }

    static IN_FLIGHT: AtomicUsize = AtomicUsize::new(0);
    static PEAK_IN_FLIGHT: AtomicUsize = AtomicUsize::new(0);

    unsafe extern "C" fn count_in_flight(
        _ids: *const u8,
        _signatures: *const u8,
        _pubkeys: *const u8,
        results: *mut c_int,
        count: c_int,
    ) -> c_int {
        let now = IN_FLIGHT.fetch_add(1, Ordering::SeqCst) + 1;
        PEAK_IN_FLIGHT.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(10));
        std::slice::from_raw_parts_mut(results, count as usize).fill(1);
        IN_FLIGHT.fetch_sub(1, Ordering::SeqCst);
        0
    }

    #[tokio::test]
    async fn test_rows_land_in_their_buffers() {
        let backend = NativeBackend::with_entry_point(check_layout);

        let mut batch: BatchColumns = (0..4u8).map(|i| patterned_row(i + 1)).collect();
        // A row whose pubkey does not follow the pattern
        let (id, signature, _) = patterned_row(9);
        batch.push(id, signature, [0xEE; 32]);

        let results = backend.verify_batch(batch).await;

        assert_eq!(results, Ok(vec![true, true, true, true, false]));
        assert_eq!(LAYOUT_COUNT.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_nonzero_status_is_call_failure_and_stays_ready() {
        let backend = NativeBackend::with_entry_point(fail_with_status_7);

        let result = backend.verify_batch(one_row()).await;

        assert_eq!(result, Err(BackendError::CallFailed(7)));
        assert_eq!(backend.readiness(), Readiness::Ready);
    }

    #[tokio::test]
    async fn test_unknown_result_code_disables_backend() {
        let backend = NativeBackend::with_entry_point(emit_code_2);

        let result = backend.verify_batch(one_row()).await;

        assert!(matches!(result, Err(BackendError::LayoutMismatch(_))));
        assert_eq!(backend.readiness(), Readiness::PermanentlyUnavailable);
        assert_eq!(
            backend.verify_batch(one_row()).await,
            Err(BackendError::Unavailable)
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_native_calls_never_overlap() {
        let backend = Arc::new(NativeBackend::with_entry_point(count_in_flight));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let backend = Arc::clone(&backend);
                tokio::spawn(async move { backend.verify_batch(one_row()).await })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Ok(vec![true]));
        }
        assert_eq!(PEAK_IN_FLIGHT.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_count_guard() {
        assert_eq!(native_count(0), Ok(0));
        assert_eq!(native_count(i32::MAX as usize), Ok(i32::MAX));
        assert!(matches!(
            native_count(i32::MAX as usize + 1),
            Err(BackendError::LayoutMismatch(_))
        ));
    }

    #[test]
    fn test_disable_reports_transition_once() {
        let backend = NativeBackend::with_entry_point(check_layout);
        assert!(backend.disable("first"));
        assert!(!backend.disable("second"));
    }

    #[test]
    fn test_disable_before_init_skips_loading() {
        let backend = NativeBackend::new("libc.so.6");
        backend.disable("operator request");

        assert_eq!(backend.init(), Readiness::PermanentlyUnavailable);
        assert!(backend.library.get().is_none());
    }
}
