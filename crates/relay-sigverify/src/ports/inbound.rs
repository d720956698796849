//! # Inbound Ports (Driving Ports / API)
//!
//! The capability the host relay registers at startup and calls for every
//! incoming record batch.

use crate::domain::entities::RawRequest;
use crate::domain::errors::ValidationError;

/// Signature validation API.
///
/// Implementations must be thread-safe (`Send + Sync`) and may be shared by
/// any number of concurrent callers.
#[async_trait::async_trait]
pub trait SignatureValidator: Send + Sync {
    /// Validate a batch, one result per request, in input order.
    ///
    /// Never fails: malformed fields and accelerator problems resolve to
    /// `false` entries or a reference-path recomputation.
    async fn validate(&self, requests: Vec<RawRequest>) -> Vec<bool>;

    /// Validate a single record, raising on an invalid signature.
    ///
    /// # Errors
    /// * `ValidationError::SignatureInvalid` - the signature does not verify
    ///   or a field is malformed
    async fn validate_one(&self, request: RawRequest) -> Result<(), ValidationError> {
        let results = self.validate(vec![request]).await;
        match results.first() {
            Some(true) => Ok(()),
            _ => Err(ValidationError::SignatureInvalid),
        }
    }
}
