//! Shared helpers for the integration tests.

#![allow(dead_code)]

use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::ecdsa::{Signature, SigningKey};
use rand::seq::SliceRandom;
use rand::Rng;
use relay_compute::{BackendError, BatchColumns, BatchVerifyBackend, Readiness, ReadinessCell};
use relay_sigverify::{
    verify_signature, BatchDispatcher, RawRequest, ValidationService, VerificationRequest,
    VerifierConfig,
};
use sha2::{Digest, Sha256};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// =============================================================================
// KEYS AND REQUESTS
// =============================================================================

/// A signing key whose public point has even y.
pub fn even_signing_key() -> (SigningKey, [u8; 32]) {
    loop {
        let key = SigningKey::random(&mut rand::thread_rng());
        let encoded = key.verifying_key().to_encoded_point(true);
        if encoded.as_bytes()[0] == 0x02 {
            let mut x = [0u8; 32];
            x.copy_from_slice(&encoded.as_bytes()[1..]);
            return (key, x);
        }
    }
}

pub fn sign(key: &SigningKey, id: &[u8; 32]) -> [u8; 64] {
    let signature: Signature = key.sign_prehash(id).unwrap();
    let mut bytes = [0u8; 64];
    bytes.copy_from_slice(&signature.to_bytes());
    bytes
}

/// A correctly signed request over the SHA-256 of `content`.
pub fn valid_request(content: &[u8]) -> VerificationRequest {
    let (key, pubkey) = even_signing_key();
    let id: [u8; 32] = Sha256::digest(content).into();
    VerificationRequest::new(id, sign(&key, &id), pubkey)
}

/// `count` valid requests, each with its own key.
pub fn valid_batch(count: usize) -> Vec<VerificationRequest> {
    (0..count)
        .map(|i| valid_request(format!("record {}", i).as_bytes()))
        .collect()
}

/// Randomly corrupt about half of `requests` in place.
pub fn corrupt_some(requests: &mut [VerificationRequest]) {
    let mut rng = rand::thread_rng();
    for request in requests.iter_mut() {
        if rng.gen_bool(0.5) {
            let mut signature = *request.signature();
            let byte = rng.gen_range(0..64);
            signature[byte] ^= 1 << rng.gen_range(0..8);
            *request = VerificationRequest::new(*request.id(), signature, *request.pubkey());
        }
    }
}

/// A batch of `count` requests, roughly half valid, in random order.
pub fn random_batch(count: usize) -> Vec<VerificationRequest> {
    let mut batch = valid_batch(count);
    corrupt_some(&mut batch);
    batch.shuffle(&mut rand::thread_rng());
    batch
}

pub fn to_raw(requests: &[VerificationRequest]) -> Vec<RawRequest> {
    requests.iter().map(RawRequest::from).collect()
}

// =============================================================================
// SCRIPTED BACKEND
// =============================================================================

#[derive(Debug, Clone, Copy)]
pub enum Script {
    /// Same answers as the reference verifier
    Equivalent,
    /// Every call fails with a nonzero status
    AlwaysFail,
    /// The n-th call (1-based) fails, all others answer correctly
    FailOnCall(usize),
}

/// Backend double that records the size of every call.
pub struct ScriptedBackend {
    script: Script,
    readiness: ReadinessCell,
    call_delay: Duration,
    call_sizes: Mutex<Vec<usize>>,
}

impl ScriptedBackend {
    pub fn new(script: Script) -> Arc<Self> {
        Self::with_delay(script, Duration::ZERO)
    }

    pub fn with_delay(script: Script, call_delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            script,
            readiness: ReadinessCell::new(),
            call_delay,
            call_sizes: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<usize> {
        self.call_sizes.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl BatchVerifyBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    fn readiness(&self) -> Readiness {
        self.readiness.get()
    }

    fn init(&self) -> Readiness {
        self.readiness.mark_ready();
        self.readiness.get()
    }

    async fn verify_batch(&self, batch: BatchColumns) -> Result<Vec<bool>, BackendError> {
        if self.readiness.get() != Readiness::Ready {
            return Err(BackendError::Unavailable);
        }

        let call_number = {
            let mut calls = self.call_sizes.lock().unwrap();
            calls.push(batch.len());
            calls.len()
        };

        if !self.call_delay.is_zero() {
            tokio::time::sleep(self.call_delay).await;
        }

        match self.script {
            Script::AlwaysFail => Err(BackendError::CallFailed(1)),
            Script::FailOnCall(n) if n == call_number => Err(BackendError::CallFailed(1)),
            Script::Equivalent | Script::FailOnCall(_) => Ok(batch
                .rows()
                .map(|(id, sig, pk)| verify_signature(id, sig, pk))
                .collect()),
        }
    }

    fn disable(&self, _reason: &str) -> bool {
        self.readiness.mark_unavailable()
    }
}

// =============================================================================
// SERVICES
// =============================================================================

/// Configuration with the self-test off, so call logs hold production
/// batches only.
pub fn config(threshold: usize) -> VerifierConfig {
    VerifierConfig {
        batch_size_threshold: threshold,
        accelerator_self_test: false,
        ..Default::default()
    }
}

pub fn service_with(backend: Arc<dyn BatchVerifyBackend>, config: &VerifierConfig) -> ValidationService {
    ValidationService::new(BatchDispatcher::new(Some(backend), config))
}
