//! Authentication envelope, signed message and authenticated actor.

use super::AuthError;
use crate::marketplace::domain::AgentAddress;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// State-changing marketplace operation an envelope is signed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketplaceAction {
    /// Post a new task.
    CreateTask,
    /// Bid on an open task.
    PlaceBid,
    /// Withdraw a pending bid.
    WithdrawBid,
    /// Accept a bid on one's own task.
    AcceptBid,
    /// Submit proof of work.
    SubmitWork,
    /// Approve or reject submitted work.
    VerifyWork,
    /// Cancel one's own open task.
    CancelTask,
}

impl MarketplaceAction {
    /// Returns the label embedded in the signed message.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreateTask => "create_task",
            Self::PlaceBid => "place_bid",
            Self::WithdrawBid => "withdraw_bid",
            Self::AcceptBid => "accept_bid",
            Self::SubmitWork => "submit_work",
            Self::VerifyWork => "verify_work",
            Self::CancelTask => "cancel_task",
        }
    }
}

impl fmt::Display for MarketplaceAction {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Credentials accompanying a state-changing request, as received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthEnvelope {
    address: String,
    signature: String,
    timestamp: String,
}

impl AuthEnvelope {
    /// Creates an envelope from raw request values.
    #[must_use]
    pub fn new(
        address: impl Into<String>,
        signature: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            signature: signature.into(),
            timestamp: timestamp.into(),
        }
    }

    /// Returns the claimed actor address.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns the claimed signature.
    #[must_use]
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Returns the ISO-8601 timestamp string as signed.
    #[must_use]
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }
}

/// Canonical message a signature must cover.
///
/// The text is `"<namespace> | <action> | <address> | <timestamp>"` with the
/// timestamp exactly as the client sent it.
///
/// # Examples
///
/// ```
/// use bounty_board::auth::domain::{MarketplaceAction, SignedMessage};
/// use bounty_board::marketplace::domain::AgentAddress;
///
/// let address = AgentAddress::new("bc1qposter").expect("valid address");
/// let message = SignedMessage::new(
///     "bounty-board",
///     MarketplaceAction::PlaceBid,
///     &address,
///     "2026-10-01T12:00:00Z",
/// );
/// assert_eq!(
///     message.text(),
///     "bounty-board | place_bid | bc1qposter | 2026-10-01T12:00:00Z"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedMessage {
    text: String,
}

impl SignedMessage {
    /// Builds the canonical message for `action` by `address`.
    #[must_use]
    pub fn new(
        namespace: &str,
        action: MarketplaceAction,
        address: &AgentAddress,
        timestamp: &str,
    ) -> Self {
        Self {
            text: format!("{namespace} | {action} | {address} | {timestamp}"),
        }
    }

    /// Returns the canonical text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the SHA-256 digest of the canonical text.
    #[must_use]
    pub fn digest(&self) -> [u8; 32] {
        Sha256::digest(self.text.as_bytes()).into()
    }
}

/// Actor whose envelope passed authentication for one action.
///
/// Only [`crate::auth::services::EnvelopeGuard`] creates values of this type,
/// so holding one proves the checks ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedActor {
    address: AgentAddress,
    action: MarketplaceAction,
    signed_at: DateTime<Utc>,
}

impl AuthenticatedActor {
    pub(in crate::auth) const fn new(
        address: AgentAddress,
        action: MarketplaceAction,
        signed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            address,
            action,
            signed_at,
        }
    }

    /// Returns the authenticated address.
    #[must_use]
    pub const fn address(&self) -> &AgentAddress {
        &self.address
    }

    /// Returns the action the envelope was signed for.
    #[must_use]
    pub const fn action(&self) -> MarketplaceAction {
        self.action
    }

    /// Returns the address if the envelope was signed for `requested`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ActionMismatch`] when the envelope names another
    /// action, so a signature for one operation cannot authorize another.
    pub fn require(&self, requested: MarketplaceAction) -> Result<&AgentAddress, AuthError> {
        if self.action != requested {
            return Err(AuthError::ActionMismatch {
                signed: self.action,
                requested,
            });
        }
        Ok(&self.address)
    }

    /// Returns the timestamp the client signed.
    #[must_use]
    pub const fn signed_at(&self) -> DateTime<Utc> {
        self.signed_at
    }
}
