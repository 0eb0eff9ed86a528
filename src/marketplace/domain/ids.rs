//! Identifier and validated scalar types for the marketplace domain.

use super::MarketplaceDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest integer representable in the `BIGINT` columns backing ids and
/// sats amounts.
const MAX_PERSISTED_VALUE: u64 = i64::MAX as u64;

/// Store-assigned numeric identifier of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(i64);

impl TaskId {
    /// Creates a validated task identifier.
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceDomainError::InvalidTaskId`] when the value is
    /// not positive.
    pub const fn new(value: i64) -> Result<Self, MarketplaceDomainError> {
        if value <= 0 {
            return Err(MarketplaceDomainError::InvalidTaskId(value));
        }
        Ok(Self(value))
    }

    /// Returns the underlying numeric value.
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Store-assigned numeric identifier of a bid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BidId(i64);

impl BidId {
    /// Creates a validated bid identifier.
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceDomainError::InvalidBidId`] when the value is not
    /// positive.
    pub const fn new(value: i64) -> Result<Self, MarketplaceDomainError> {
        if value <= 0 {
            return Err(MarketplaceDomainError::InvalidBidId(value));
        }
        Ok(Self(value))
    }

    /// Returns the underlying numeric value.
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for BidId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Blockchain address identifying an agent.
///
/// Addresses are trimmed, ASCII alphanumeric and at most
/// [`AgentAddress::MAX_LENGTH`] characters long. Case is preserved because
/// several address encodings are case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentAddress(String);

impl AgentAddress {
    /// Maximum accepted address length.
    pub const MAX_LENGTH: usize = 128;

    /// Creates a validated agent address.
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceDomainError::EmptyAddress`] when the value is
    /// blank or [`MarketplaceDomainError::InvalidAddress`] when it is too long
    /// or contains characters outside `[A-Za-z0-9]`.
    pub fn new(value: impl Into<String>) -> Result<Self, MarketplaceDomainError> {
        let raw = value.into();
        let normalized = raw.trim();
        if normalized.is_empty() {
            return Err(MarketplaceDomainError::EmptyAddress);
        }

        let is_valid = normalized.len() <= Self::MAX_LENGTH
            && normalized.chars().all(|ch| ch.is_ascii_alphanumeric());
        if !is_valid {
            return Err(MarketplaceDomainError::InvalidAddress(raw));
        }

        Ok(Self(normalized.to_owned()))
    }

    /// Returns the address as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for AgentAddress {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for AgentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Positive satoshi amount used for bounties and bids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sats(u64);

impl Sats {
    /// Creates a validated amount of at least one sat.
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceDomainError::ZeroAmount`] for zero or
    /// [`MarketplaceDomainError::AmountTooLarge`] above `i64::MAX`.
    pub const fn new(value: u64) -> Result<Self, MarketplaceDomainError> {
        if value == 0 {
            return Err(MarketplaceDomainError::ZeroAmount);
        }
        if value > MAX_PERSISTED_VALUE {
            return Err(MarketplaceDomainError::AmountTooLarge(value));
        }
        Ok(Self(value))
    }

    /// Returns the amount in sats.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Returns the amount as a signed ledger quantity.
    ///
    /// Construction bounds the value by `i64::MAX`, so the conversion is
    /// lossless.
    #[must_use]
    pub fn signed(self) -> i64 {
        i64::try_from(self.0).unwrap_or(i64::MAX)
    }
}

impl fmt::Display for Sats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} sats", self.0)
    }
}

/// Caller-supplied settlement transaction reference.
///
/// The marketplace never settles payments itself; this value is advisory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentReference(String);

impl PaymentReference {
    /// Maximum accepted reference length.
    pub const MAX_LENGTH: usize = 255;

    /// Creates a validated payment reference.
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceDomainError::InvalidPaymentReference`] when the
    /// value is blank, too long, or contains whitespace.
    pub fn new(value: impl Into<String>) -> Result<Self, MarketplaceDomainError> {
        let raw = value.into();
        let normalized = raw.trim();
        let is_valid = !normalized.is_empty()
            && normalized.len() <= Self::MAX_LENGTH
            && !normalized.chars().any(char::is_whitespace);
        if !is_valid {
            return Err(MarketplaceDomainError::InvalidPaymentReference(raw));
        }
        Ok(Self(normalized.to_owned()))
    }

    /// Returns the reference as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PaymentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
