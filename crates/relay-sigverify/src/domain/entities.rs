//! # Domain Entities
//!
//! Core data structures for batch signature verification.

use relay_compute::{ID_LEN, PUBKEY_LEN, SIGNATURE_LEN};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};

/// Record content hash, used directly as the signed digest
pub type EventId = [u8; ID_LEN];

/// Compact `r || s` ECDSA signature
pub type CompactSignature = [u8; SIGNATURE_LEN];

/// secp256k1 x-coordinate; the y parity is not transmitted
pub type XOnlyPublicKey = [u8; PUBKEY_LEN];

// =============================================================================
// Decoded Request
// =============================================================================

/// A decoded, fixed-width verification request.
///
/// Immutable once constructed; fields are only readable.
#[serde_as]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VerificationRequest {
    id: EventId,
    #[serde_as(as = "Bytes")]
    signature: CompactSignature,
    pubkey: XOnlyPublicKey,
}

impl VerificationRequest {
    pub fn new(id: EventId, signature: CompactSignature, pubkey: XOnlyPublicKey) -> Self {
        Self {
            id,
            signature,
            pubkey,
        }
    }

    pub fn id(&self) -> &EventId {
        &self.id
    }

    pub fn signature(&self) -> &CompactSignature {
        &self.signature
    }

    pub fn pubkey(&self) -> &XOnlyPublicKey {
        &self.pubkey
    }

    /// Row form for the accelerator's column buffers.
    pub fn to_row(&self) -> (EventId, CompactSignature, XOnlyPublicKey) {
        (self.id, self.signature, self.pubkey)
    }
}

// =============================================================================
// Raw (Boundary) Types
// =============================================================================

/// A field as supplied by the host: hex text or raw bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RawField {
    Hex(String),
    Bytes(Vec<u8>),
}

impl From<&str> for RawField {
    fn from(value: &str) -> Self {
        RawField::Hex(value.to_string())
    }
}

impl From<String> for RawField {
    fn from(value: String) -> Self {
        RawField::Hex(value)
    }
}

impl From<Vec<u8>> for RawField {
    fn from(value: Vec<u8>) -> Self {
        RawField::Bytes(value)
    }
}

impl From<&[u8]> for RawField {
    fn from(value: &[u8]) -> Self {
        RawField::Bytes(value.to_vec())
    }
}

impl<const N: usize> From<[u8; N]> for RawField {
    fn from(value: [u8; N]) -> Self {
        RawField::Bytes(value.to_vec())
    }
}

/// An undecoded `(id, signature, pubkey)` triple.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawRequest {
    pub id: RawField,
    pub signature: RawField,
    pub pubkey: RawField,
}

impl RawRequest {
    pub fn new(
        id: impl Into<RawField>,
        signature: impl Into<RawField>,
        pubkey: impl Into<RawField>,
    ) -> Self {
        Self {
            id: id.into(),
            signature: signature.into(),
            pubkey: pubkey.into(),
        }
    }

    /// Hex-encoded triple, the relay's wire representation.
    pub fn hex(
        id: impl Into<String>,
        signature: impl Into<String>,
        pubkey: impl Into<String>,
    ) -> Self {
        Self {
            id: RawField::Hex(id.into()),
            signature: RawField::Hex(signature.into()),
            pubkey: RawField::Hex(pubkey.into()),
        }
    }

    /// Binary triple.
    pub fn bytes(
        id: impl Into<Vec<u8>>,
        signature: impl Into<Vec<u8>>,
        pubkey: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            id: RawField::Bytes(id.into()),
            signature: RawField::Bytes(signature.into()),
            pubkey: RawField::Bytes(pubkey.into()),
        }
    }
}

impl From<&VerificationRequest> for RawRequest {
    fn from(request: &VerificationRequest) -> Self {
        Self::hex(
            hex::encode(request.id),
            hex::encode(request.signature),
            hex::encode(request.pubkey),
        )
    }
}

/// The signature-relevant view of an upstream record.
///
/// Field names follow the record format (`id`, `sig`, `pubkey`); every other
/// field of the record is ignored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedRecord {
    pub id: String,
    pub sig: String,
    pub pubkey: String,
}

impl SignedRecord {
    /// Extract the signed fields from a JSON record.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl From<&SignedRecord> for RawRequest {
    fn from(record: &SignedRecord) -> Self {
        RawRequest::hex(
            record.id.clone(),
            record.sig.clone(),
            record.pubkey.clone(),
        )
    }
}

// =============================================================================
// Dispatch Result
// =============================================================================

/// The path that produced a batch's final results.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Route {
    /// Software verifier, per request
    Reference,
    /// Native accelerator, one call per chunk
    Accelerator,
}

impl Route {
    pub fn as_str(self) -> &'static str {
        match self {
            Route::Reference => "reference",
            Route::Accelerator => "accelerator",
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered results of one dispatched batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchReport {
    /// One result per request, index-aligned with the input
    pub results: Vec<bool>,
    /// Path that produced `results`
    pub route: Route,
    /// Whether the accelerator was attempted and its output discarded
    pub fell_back: bool,
    /// Count of valid signatures
    pub valid_count: usize,
    /// Count of invalid signatures
    pub invalid_count: usize,
}

impl DispatchReport {
    pub fn new(results: Vec<bool>, route: Route, fell_back: bool) -> Self {
        let valid_count = results.iter().filter(|&&valid| valid).count();
        let invalid_count = results.len() - valid_count;

        Self {
            results,
            route,
            fell_back,
            valid_count,
            invalid_count,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Route::Reference, false)
    }

    pub fn all_valid(&self) -> bool {
        self.invalid_count == 0
    }
}
