//! Fuzz target for the fixed-width field codec.
//!
//! Arbitrary text and bytes must decode to a value or an error, never panic.
//!
//! ## Running
//!
//! ```bash
//! cd crates/relay-sigverify
//! cargo +nightly fuzz run fuzz_decode_fields
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;
use relay_sigverify::{decode_request, encode_hex, RawField, RawRequest};

#[derive(Debug, arbitrary::Arbitrary)]
enum FuzzField {
    Hex(String),
    Bytes(Vec<u8>),
}

impl From<FuzzField> for RawField {
    fn from(field: FuzzField) -> Self {
        match field {
            FuzzField::Hex(text) => RawField::Hex(text),
            FuzzField::Bytes(bytes) => RawField::Bytes(bytes),
        }
    }
}

#[derive(Debug, arbitrary::Arbitrary)]
struct FuzzInput {
    id: FuzzField,
    signature: FuzzField,
    pubkey: FuzzField,
}

fuzz_target!(|input: FuzzInput| {
    let raw = RawRequest::new(input.id, input.signature, input.pubkey);

    if let Ok(request) = decode_request(&raw) {
        // Anything that decodes re-decodes identically from its hex form
        let rehexed = RawRequest::hex(
            encode_hex(request.id()),
            encode_hex(request.signature()),
            encode_hex(request.pubkey()),
        );
        assert_eq!(decode_request(&rehexed), Ok(request));
    }
});
