//! Fuzz target for the reference verifier.
//!
//! ## Running
//!
//! ```bash
//! cd crates/relay-sigverify
//! cargo +nightly fuzz run fuzz_reference_verify
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;
use relay_sigverify::{verify_signature, ReferenceVerifier, VerificationRequest};

#[derive(Debug, arbitrary::Arbitrary)]
struct FuzzInput {
    id: [u8; 32],
    r: [u8; 32],
    s: [u8; 32],
    pubkey: [u8; 32],
}

fuzz_target!(|input: FuzzInput| {
    let mut signature = [0u8; 64];
    signature[..32].copy_from_slice(&input.r);
    signature[32..].copy_from_slice(&input.s);

    // Total and deterministic over any triple
    let result = verify_signature(&input.id, &signature, &input.pubkey);
    assert_eq!(result, verify_signature(&input.id, &signature, &input.pubkey));

    let request = VerificationRequest::new(input.id, signature, input.pubkey);
    assert_eq!(ReferenceVerifier::new().verify(&request), result);
});
