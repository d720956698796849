//! # Ports Layer
//!
//! Trait definitions for the hexagonal architecture.
//! - **Inbound (Driving)**: The validation capability the host relay calls
//! - **Outbound (Driven)**: Where dispatch outcomes are reported

pub mod inbound;
pub mod outbound;
