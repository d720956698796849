//! # Reference Verifier (secp256k1 ECDSA)
//!
//! Pure-software verification oracle. Every other path is measured against
//! this one.
//!
//! ## Convention
//!
//! - **Public key**: the 32-byte x-coordinate, lifted to the curve point with
//!   even y (SEC1 compressed prefix `0x02`)
//! - **Signature**: compact 64-byte `r || s`; `r` and `s` must be in `[1, n-1]`
//!   and `s` must be in the lower half of the order (BIP-62 / EIP-2)
//! - **Message**: the 32-byte `id` is the digest; no further hashing
//!
//! ## Totality
//!
//! Every parse or curve-arithmetic failure resolves to `false`. Nothing here
//! panics or returns an error.

use super::entities::{CompactSignature, EventId, VerificationRequest, XOnlyPublicKey};
use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{Signature, VerifyingKey};

/// SEC1 compressed-point tag for even y
const EVEN_Y_TAG: u8 = 0x02;

/// Stateless reference verifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceVerifier;

impl ReferenceVerifier {
    pub fn new() -> Self {
        Self
    }

    /// Verify a single request.
    pub fn verify(&self, request: &VerificationRequest) -> bool {
        verify_signature(request.id(), request.signature(), request.pubkey())
    }

    /// Verify a batch in parallel. Output order matches input order.
    pub fn verify_batch(&self, requests: &[VerificationRequest]) -> Vec<bool> {
        use rayon::prelude::*;

        requests.par_iter().map(|request| self.verify(request)).collect()
    }
}

/// Verify `signature` over `id` against the even-y lift of `pubkey`.
pub fn verify_signature(
    id: &EventId,
    signature: &CompactSignature,
    pubkey: &XOnlyPublicKey,
) -> bool {
    let Some(verifying_key) = lift_x_even(pubkey) else {
        return false;
    };

    // Rejects r or s equal to zero or not below the curve order
    let Ok(signature) = Signature::from_slice(signature) else {
        return false;
    };

    // High-S signatures are malleable twins of a low-S one; reject them
    if signature.normalize_s().is_some() {
        return false;
    }

    verifying_key.verify_prehash(id, &signature).is_ok()
}

/// Lift an x-coordinate to the curve point with even y.
///
/// Returns `None` if `x` is not the x-coordinate of a curve point (roughly
/// half of all 32-byte values) or is not below the field modulus.
pub fn lift_x_even(x: &XOnlyPublicKey) -> Option<VerifyingKey> {
    let mut compressed = [0u8; 33];
    compressed[0] = EVEN_Y_TAG;
    compressed[1..].copy_from_slice(x);

    VerifyingKey::from_sec1_bytes(&compressed).ok()
}

// =============================================================================
// TEST HELPERS
// =============================================================================


// =============================================================================
// UNIT TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::test_helpers::*;
    use super::*;

    #[test]
    fn test_valid_signature_verifies() {
        let request = create_valid_request(b"hello relay");
        assert!(ReferenceVerifier::new().verify(&request));
    }

    #[test]
    fn test_deterministic() {
        let request = create_valid_request(b"deterministic");
        let verifier = ReferenceVerifier::new();
        assert_eq!(verifier.verify(&request), verifier.verify(&request));
    }

    /// All-zero triple: zero x is not on the curve and zero r/s are invalid
    #[test]
    fn test_all_zero_request_is_invalid() {
        assert!(!verify_signature(&[0u8; 32], &[0u8; 64], &[0u8; 32]));
    }

    #[test]
    fn test_corrupted_last_signature_byte_is_invalid() {
        let request = create_valid_request(b"corrupt me");
        let mut signature = *request.signature();
        signature[63] ^= 0x01;

        assert!(!verify_signature(request.id(), &signature, request.pubkey()));
    }

    #[test]
    fn test_every_single_bit_flip_in_signature_is_invalid() {
        let request = create_valid_request(b"bit flips");

        for byte in 0..64 {
            for bit in 0..8 {
                let mut signature = *request.signature();
                signature[byte] ^= 1 << bit;
                assert!(
                    !verify_signature(request.id(), &signature, request.pubkey()),
                    "flip of signature bit {}:{} still verified",
                    byte,
                    bit
                );
            }
        }
    }

    #[test]
    fn test_every_single_bit_flip_in_pubkey_is_invalid() {
        let request = create_valid_request(b"pubkey flips");

        for byte in 0..32 {
            for bit in 0..8 {
                let mut pubkey = *request.pubkey();
                pubkey[byte] ^= 1 << bit;
                assert!(
                    !verify_signature(request.id(), request.signature(), &pubkey),
                    "flip of pubkey bit {}:{} still verified",
                    byte,
                    bit
                );
            }
        }
    }

    #[test]
    fn test_wrong_id_is_invalid() {
        let request = create_valid_request(b"original");
        let other_id = record_id(b"tampered");
        assert!(!verify_signature(&other_id, request.signature(), request.pubkey()));
    }

    #[test]
    fn test_wrong_key_is_invalid() {
        let request = create_valid_request(b"signed by a");
        let (_, other_pubkey) = generate_even_keypair();
        assert!(!verify_signature(request.id(), request.signature(), &other_pubkey));
    }

    /// The odd-y twin of a key shares its x-coordinate; signatures made with it
    /// do not verify under the even-y convention.
    #[test]
    fn test_odd_y_key_signature_is_invalid() {
        use k256::ecdsa::SigningKey;

        let signing_key = loop {
            let key = SigningKey::random(&mut rand::thread_rng());
            if key.verifying_key().to_encoded_point(true).as_bytes()[0] == 0x03 {
                break key;
            }
        };
        let encoded = signing_key.verifying_key().to_encoded_point(true);
        let mut x = [0u8; 32];
        x.copy_from_slice(&encoded.as_bytes()[1..]);

        let id = record_id(b"odd key");
        let signature = sign(&id, &signing_key);

        assert!(!verify_signature(&id, &signature, &x));
    }

    #[test]
    fn test_high_s_twin_is_invalid() {
        let request = create_valid_request(b"malleable");
        let signature = Signature::from_slice(request.signature()).unwrap();
        let (r, s) = signature.split_scalars();
        let high = Signature::from_scalars(r.to_bytes(), (-*s).to_bytes()).unwrap();

        let mut high_bytes = [0u8; 64];
        high_bytes.copy_from_slice(&high.to_bytes());

        assert!(!verify_signature(request.id(), &high_bytes, request.pubkey()));
    }

    #[test]
    fn test_x_not_on_curve_fails_lift() {
        // x = 5: 5^3 + 7 = 132 is a quadratic non-residue mod p
        let mut x = [0u8; 32];
        x[31] = 5;
        assert!(lift_x_even(&x).is_none());
    }

    #[test]
    fn test_x_above_field_modulus_fails_lift() {
        assert!(lift_x_even(&[0xFF; 32]).is_none());
    }

    #[test]
    fn test_batch_preserves_order() {
        let valid = create_valid_request(b"valid");
        let invalid = VerificationRequest::new([0u8; 32], [0u8; 64], [0u8; 32]);
        let batch = vec![valid, invalid, valid, invalid, invalid];

        let results = ReferenceVerifier::new().verify_batch(&batch);
        assert_eq!(results, vec![true, false, true, false, false]);
    }

    #[test]
    fn test_empty_batch() {
        assert!(ReferenceVerifier::new().verify_batch(&[]).is_empty());
    }
}
