//! # Fixed-Width Field Codec
//!
//! Converts boundary representations of the three request fields into their
//! canonical fixed-width binary form. Total: every input yields either a
//! value or an [`EncodingError`], never a panic.
//!
//! | Field | Bytes | Hex chars |
//! |-------|-------|-----------|
//! | id | 32 | 64 |
//! | signature | 64 | 128 |
//! | pubkey | 32 | 64 |

use super::entities::{RawField, RawRequest, VerificationRequest};
use super::errors::{EncodingError, FieldKind};

/// Decode one field into exactly `N` bytes.
///
/// Hex input may use either letter case. No prefix, whitespace or
/// separators are accepted.
pub fn decode_field<const N: usize>(
    field: FieldKind,
    raw: &RawField,
) -> Result<[u8; N], EncodingError> {
    debug_assert_eq!(field.expected_len(), N);

    match raw {
        RawField::Hex(text) => {
            let bytes = hex::decode(text).map_err(|e| EncodingError::InvalidHex {
                field,
                reason: e.to_string(),
            })?;
            to_fixed(field, &bytes)
        }
        RawField::Bytes(bytes) => to_fixed(field, bytes),
    }
}

fn to_fixed<const N: usize>(field: FieldKind, bytes: &[u8]) -> Result<[u8; N], EncodingError> {
    <[u8; N]>::try_from(bytes).map_err(|_| EncodingError::WrongLength {
        field,
        expected: N,
        actual: bytes.len(),
    })
}

/// Decode a full request. The first failing field is reported.
pub fn decode_request(raw: &RawRequest) -> Result<VerificationRequest, EncodingError> {
    let id = decode_field(FieldKind::Id, &raw.id)?;
    let signature = decode_field(FieldKind::Signature, &raw.signature)?;
    let pubkey = decode_field(FieldKind::Pubkey, &raw.pubkey)?;

    Ok(VerificationRequest::new(id, signature, pubkey))
}

/// Lowercase hex encoding.
pub fn encode_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}
