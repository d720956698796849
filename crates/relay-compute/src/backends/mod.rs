//! Accelerator backends
//!
//! Backends compile without their native dependencies present. Hardware and
//! libraries are detected at runtime, and any failure leaves the reference
//! verifier in charge.

#[cfg(feature = "native")]
pub mod native;
