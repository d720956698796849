//! # Adapters Module
//!
//! Infrastructure adapters implementing the ports.

pub mod telemetry;

pub use telemetry::TelemetryObserver;
