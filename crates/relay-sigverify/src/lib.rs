//! # Relay Signature Gate
//!
//! Verifies `(id, signature, pubkey)` triples of externally submitted records
//! before the host relay persists them.
//!
//! ## Architecture
//!
//! This crate follows hexagonal architecture:
//! - **Domain Layer** (`domain/`): Field codec, reference verifier, entities. Pure, no I/O
//! - **Ports Layer** (`ports/`): The validator capability the relay consumes, and the
//!   observer port the dispatcher reports through
//! - **Dispatcher** (`dispatcher.rs`): Routes batches to the accelerator or the
//!   reference verifier and owns the fallback rules
//! - **Service Layer** (`service.rs`): Async façade wiring codec, dispatcher and ports
//! - **Adapters** (`adapters/`): Telemetry-backed observer
//!
//! ## Correctness Contract
//!
//! - The reference verifier is the only source of truth. Accelerator output is a
//!   performance optimisation and must match it for every input
//! - Result `i` always belongs to request `i`; no result is dropped or duplicated
//! - Malformed fields and backend failures never surface as errors; they resolve
//!   to `false` or to a reference-path recomputation
//!
//! ## Signature Convention
//!
//! `id` is treated as the signed 32-byte digest (no further hashing). The
//! public key is an x-coordinate and is lifted with even y. See `DESIGN.md`
//! for the open protocol question this convention carries.

pub mod adapters;
pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod ports;
pub mod service;

// Re-export public API
pub use adapters::TelemetryObserver;
pub use config::{ConfigError, VerifierConfig};
pub use dispatcher::BatchDispatcher;
pub use domain::codec::{decode_field, decode_request, encode_hex};
pub use domain::entities::{
    CompactSignature, DispatchReport, EventId, RawField, RawRequest, Route, SignedRecord,
    VerificationRequest, XOnlyPublicKey,
};
pub use domain::errors::{EncodingError, FieldKind, ValidationError};
pub use domain::reference::{lift_x_even, verify_signature, ReferenceVerifier};
pub use domain::selftest::{known_answer_vectors, KnownAnswer};
pub use ports::inbound::SignatureValidator;
pub use ports::outbound::{DispatchObserver, NoopObserver};
pub use service::ValidationService;

pub use relay_compute::{BackendError, BatchColumns, BatchVerifyBackend, Readiness};
