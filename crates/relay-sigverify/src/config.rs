//! # Verifier Configuration
//!
//! Supplied by the host relay at startup, either deserialized from its own
//! config file section or read from the environment.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RELAY_ACCELERATOR_LIBRARY` | *(empty)* | Accelerator library path; empty disables |
//! | `RELAY_BATCH_SIZE_THRESHOLD` | `64` | Smallest batch sent to the accelerator |
//! | `RELAY_MAX_ACCELERATOR_CHUNK` | `65536` | Largest single accelerator call |
//! | `RELAY_ACCELERATOR_SELF_TEST` | `true` | Known-answer check before first use |

use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },

    #[error("batch_size_threshold cannot be 0")]
    ZeroBatchThreshold,

    #[error("max_accelerator_chunk cannot be 0")]
    ZeroChunkSize,
}

/// Signature verification configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Filesystem path of the accelerator library. Empty disables
    /// acceleration.
    pub accelerator_library_path: String,

    /// Batches smaller than this always take the reference path (default: 64)
    pub batch_size_threshold: usize,

    /// Largest batch handed to the accelerator in one call (default: 65536)
    pub max_accelerator_chunk: usize,

    /// Run the known-answer self-test before the accelerator's first
    /// production batch
    pub accelerator_self_test: bool,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            accelerator_library_path: String::new(),
            batch_size_threshold: 64,
            max_accelerator_chunk: 65_536,
            accelerator_self_test: true,
        }
    }
}

impl VerifierConfig {
    const LIBRARY_VAR: &'static str = "RELAY_ACCELERATOR_LIBRARY";
    const THRESHOLD_VAR: &'static str = "RELAY_BATCH_SIZE_THRESHOLD";
    const CHUNK_VAR: &'static str = "RELAY_MAX_ACCELERATOR_CHUNK";
    const SELF_TEST_VAR: &'static str = "RELAY_ACCELERATOR_SELF_TEST";

    /// Read configuration from environment variables, falling back to the
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = lookup(Self::LIBRARY_VAR) {
            config.accelerator_library_path = path.trim().to_string();
        }
        if let Some(value) = lookup(Self::THRESHOLD_VAR) {
            config.batch_size_threshold = parse_usize(Self::THRESHOLD_VAR, &value)?;
        }
        if let Some(value) = lookup(Self::CHUNK_VAR) {
            config.max_accelerator_chunk = parse_usize(Self::CHUNK_VAR, &value)?;
        }
        if let Some(value) = lookup(Self::SELF_TEST_VAR) {
            config.accelerator_self_test = parse_bool(Self::SELF_TEST_VAR, &value)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size_threshold == 0 {
            return Err(ConfigError::ZeroBatchThreshold);
        }

        if self.max_accelerator_chunk == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }

        Ok(())
    }

    /// Whether an accelerator library is configured at all.
    pub fn acceleration_enabled(&self) -> bool {
        !self.accelerator_library_path.trim().is_empty()
    }
}

fn parse_usize(var: &'static str, value: &str) -> Result<usize, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            var,
            value: value.to_string(),
        })
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var,
            value: value.to_string(),
        }),
    }
}
