//! Known-answer vectors for accelerator self-test.
//!
//! Built deterministically (fixed secrets, RFC6979 nonces), so every process
//! checks its accelerator against the same batch.

use super::entities::{CompactSignature, EventId, VerificationRequest, XOnlyPublicKey};
use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::ecdsa::{Signature, SigningKey};

/// secp256k1 curve order n
const SECP256K1_ORDER: [u8; 32] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE,
    0xBA, 0xAE, 0xDC, 0xE6, 0xAF, 0x48, 0xA0, 0x3B, 0xBF, 0xD2, 0x5E, 0x8C, 0xD0, 0x36, 0x41, 0x41,
];

/// Number of validly signed vectors.
const VALID_VECTORS: usize = 4;

/// Upper bound on the secrets tried while collecting even-y keys.
const MAX_SECRET: u8 = 64;

/// A request and the result every correct verifier must produce for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownAnswer {
    pub request: VerificationRequest,
    pub expected: bool,
}

impl KnownAnswer {
    fn valid(request: VerificationRequest) -> Self {
        Self {
            request,
            expected: true,
        }
    }

    fn invalid(request: VerificationRequest) -> Self {
        Self {
            request,
            expected: false,
        }
    }
}

/// Build the known-answer batch.
///
/// Contains validly signed requests and, derived from them, a corrupted
/// signature, a mismatched id, a high-S twin, an off-curve key and the
/// all-zero triple.
pub fn known_answer_vectors() -> Result<Vec<KnownAnswer>, k256::ecdsa::Error> {
    let mut valid = Vec::with_capacity(VALID_VECTORS);

    for secret in 1..=MAX_SECRET {
        if valid.len() == VALID_VECTORS {
            break;
        }

        let mut secret_bytes = [0u8; 32];
        secret_bytes[31] = secret;
        let signing_key = SigningKey::from_slice(&secret_bytes)?;

        let Some(pubkey) = even_x_only(&signing_key) else {
            continue;
        };

        let mut id: EventId = [0u8; 32];
        id[0] = secret;
        id[31] = 0xA5;
        let signature = sign_prehash(&signing_key, &id)?;

        valid.push(VerificationRequest::new(id, signature, pubkey));
    }

    let mut vectors: Vec<KnownAnswer> = valid.iter().copied().map(KnownAnswer::valid).collect();

    if let [first, second, third, fourth, ..] = valid.as_slice() {
        let mut corrupted = *first.signature();
        corrupted[63] ^= 0x01;
        vectors.push(KnownAnswer::invalid(VerificationRequest::new(
            *first.id(),
            corrupted,
            *first.pubkey(),
        )));

        vectors.push(KnownAnswer::invalid(VerificationRequest::new(
            *third.id(),
            *second.signature(),
            *second.pubkey(),
        )));

        vectors.push(KnownAnswer::invalid(VerificationRequest::new(
            *third.id(),
            high_s_twin(third.signature()),
            *third.pubkey(),
        )));

        // x = 5 has no curve point
        let mut off_curve: XOnlyPublicKey = [0u8; 32];
        off_curve[31] = 5;
        vectors.push(KnownAnswer::invalid(VerificationRequest::new(
            *fourth.id(),
            *fourth.signature(),
            off_curve,
        )));
    }

    vectors.push(KnownAnswer::invalid(VerificationRequest::new(
        [0u8; 32], [0u8; 64], [0u8; 32],
    )));

    Ok(vectors)
}

fn even_x_only(signing_key: &SigningKey) -> Option<XOnlyPublicKey> {
    let encoded = signing_key.verifying_key().to_encoded_point(true);
    let bytes = encoded.as_bytes();
    if bytes.first() != Some(&0x02) {
        return None;
    }

    let mut x = [0u8; 32];
    x.copy_from_slice(bytes.get(1..33)?);
    Some(x)
}

fn sign_prehash(
    signing_key: &SigningKey,
    id: &EventId,
) -> Result<CompactSignature, k256::ecdsa::Error> {
    let signature: Signature = signing_key.sign_prehash(id)?;
    let mut bytes = [0u8; 64];
    bytes.copy_from_slice(&signature.to_bytes());
    Ok(bytes)
}

/// Replace `s` with `n - s`, the malleable twin of a signature.
fn high_s_twin(signature: &CompactSignature) -> CompactSignature {
    let mut s = [0u8; 32];
    s.copy_from_slice(&signature[32..]);

    let mut twin = *signature;
    twin[32..].copy_from_slice(&invert_s(&s));
    twin
}

/// s' = n - s
fn invert_s(s: &[u8; 32]) -> [u8; 32] {
    let mut result = [0u8; 32];
    let mut borrow: i32 = 0;

    for i in (0..32).rev() {
        let diff = (SECP256K1_ORDER[i] as i32) - (s[i] as i32) - borrow;
        if diff < 0 {
            result[i] = (diff + 256) as u8;
            borrow = 1;
        } else {
            result[i] = diff as u8;
            borrow = 0;
        }
    }

    result
}
