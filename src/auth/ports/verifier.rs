//! Signature verification port.

use crate::auth::domain::SignedMessage;
use crate::marketplace::domain::AgentAddress;
use thiserror::Error;

/// Reason a verifier refused a signature.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct SignatureRejection(pub String);

/// Checks that a signature over a [`SignedMessage`] belongs to an address.
///
/// Freshness and length checks happen before the verifier runs, so
/// implementations only decide the cryptographic question.
#[cfg_attr(test, mockall::automock)]
pub trait SignatureVerifier: Send + Sync {
    /// Verifies `signature` over `message` for `address`.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureRejection`] when the signature does not verify.
    fn verify(
        &self,
        address: &AgentAddress,
        message: &SignedMessage,
        signature: &str,
    ) -> Result<(), SignatureRejection>;
}
