//! # Domain Layer
//!
//! Pure verification logic. No I/O, no async, no shared state.

pub mod codec;
pub mod entities;
pub mod errors;
pub mod reference;
pub mod selftest;
