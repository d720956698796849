//! # Verification Errors
//!
//! Only [`ValidationError`] is ever returned to a caller. [`EncodingError`] is
//! resolved to a `false` result by the service, and backend errors live in
//! `relay-compute` and are absorbed by the dispatcher.

use thiserror::Error;

/// The three fixed-width fields of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Id,
    Signature,
    Pubkey,
}

impl FieldKind {
    /// Exact decoded width in bytes
    pub fn expected_len(self) -> usize {
        match self {
            FieldKind::Id => relay_compute::ID_LEN,
            FieldKind::Signature => relay_compute::SIGNATURE_LEN,
            FieldKind::Pubkey => relay_compute::PUBKEY_LEN,
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldKind::Id => write!(f, "id"),
            FieldKind::Signature => write!(f, "signature"),
            FieldKind::Pubkey => write!(f, "pubkey"),
        }
    }
}

/// A field that could not be decoded into its fixed-width form.
///
/// Local to one request; never aborts a batch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EncodingError {
    /// Not valid hexadecimal (bad character or odd length)
    #[error("{field}: invalid hex encoding: {reason}")]
    InvalidHex { field: FieldKind, reason: String },

    /// Decoded to the wrong number of bytes
    #[error("{field}: expected {expected} bytes, got {actual}")]
    WrongLength {
        field: FieldKind,
        expected: usize,
        actual: usize,
    },
}

impl EncodingError {
    pub fn field(&self) -> FieldKind {
        match self {
            EncodingError::InvalidHex { field, .. } | EncodingError::WrongLength { field, .. } => {
                *field
            }
        }
    }
}

/// Errors returned by the raise-on-invalid validation form.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The record's signature does not verify (or its fields are malformed)
    #[error("Invalid signature")]
    SignatureInvalid,
}
