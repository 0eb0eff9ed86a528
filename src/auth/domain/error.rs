//! Authentication failures.

use super::MarketplaceAction;
use crate::marketplace::domain::MarketplaceDomainError;
use thiserror::Error;

/// Reasons an authentication envelope is refused.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// The claimed address is not a valid agent address.
    #[error("invalid actor address: {0}")]
    InvalidAddress(#[source] MarketplaceDomainError),

    /// The timestamp is not RFC 3339.
    #[error("malformed timestamp '{0}'")]
    MalformedTimestamp(String),

    /// The timestamp lies outside the freshness window.
    #[error("timestamp is {skew_secs}s away from server time, window is {window_secs}s")]
    StaleTimestamp {
        /// Absolute distance from server time in seconds.
        skew_secs: i64,
        /// Configured freshness window in seconds.
        window_secs: u64,
    },

    /// The signature length is outside the configured bounds.
    #[error("signature length {length} outside {min}..={max}")]
    MalformedSignature {
        /// Observed length.
        length: usize,
        /// Minimum accepted length.
        min: usize,
        /// Maximum accepted length.
        max: usize,
    },

    /// The signature verifier refused the signature.
    #[error("signature rejected: {0}")]
    SignatureRejected(String),

    /// The envelope was signed for a different operation.
    #[error("envelope signed for {signed} cannot authorize {requested}")]
    ActionMismatch {
        /// Action named in the signed message.
        signed: MarketplaceAction,
        /// Action being performed.
        requested: MarketplaceAction,
    },
}

impl AuthError {
    /// Returns whether the failure concerns request shape rather than
    /// identity.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidAddress(_))
    }
}
