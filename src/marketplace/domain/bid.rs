//! Bid entity and bid status types.

use super::{AgentAddress, BidId, ParseBidStatusError, Sats, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Disposition of a bid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BidStatus {
    /// Awaiting the poster's decision.
    Pending,
    /// Chosen by the poster; its bidder became the worker.
    Accepted,
    /// Passed over when a sibling bid was accepted.
    Rejected,
    /// Retracted by the bidder before acceptance.
    Withdrawn,
}

impl BidStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Withdrawn => "withdrawn",
        }
    }
}

impl fmt::Display for BidStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for BidStatus {
    type Error = ParseBidStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            "withdrawn" => Ok(Self::Withdrawn),
            _ => Err(ParseBidStatusError(value.to_owned())),
        }
    }
}

/// A bid that has not been assigned an identifier yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBid {
    task_id: TaskId,
    bidder: AgentAddress,
    amount: Sats,
    message: Option<String>,
    created_at: DateTime<Utc>,
}

impl NewBid {
    pub(super) fn new(
        task_id: TaskId,
        bidder: AgentAddress,
        amount: Sats,
        message: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            task_id,
            bidder,
            amount,
            message: message
                .map(|text| text.trim().to_owned())
                .filter(|text| !text.is_empty()),
            created_at,
        }
    }

    /// Returns the task the bid targets.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the bidder address.
    #[must_use]
    pub const fn bidder(&self) -> &AgentAddress {
        &self.bidder
    }

    /// Returns the offered amount.
    #[must_use]
    pub const fn amount(&self) -> Sats {
        self.amount
    }

    /// Returns the optional bid message.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// A bid placed on a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bid {
    id: BidId,
    task_id: TaskId,
    bidder: AgentAddress,
    amount: Sats,
    message: Option<String>,
    status: BidStatus,
    created_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted bid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedBidData {
    /// Persisted bid identifier.
    pub id: BidId,
    /// Persisted owning task.
    pub task_id: TaskId,
    /// Persisted bidder address.
    pub bidder: AgentAddress,
    /// Persisted offered amount.
    pub amount: Sats,
    /// Persisted message, if any.
    pub message: Option<String>,
    /// Persisted status.
    pub status: BidStatus,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Bid {
    /// Materializes a stored bid under its assigned identifier.
    #[must_use]
    pub fn from_new(id: BidId, draft: NewBid) -> Self {
        Self {
            id,
            task_id: draft.task_id,
            bidder: draft.bidder,
            amount: draft.amount,
            message: draft.message,
            status: BidStatus::Pending,
            created_at: draft.created_at,
        }
    }

    /// Reconstructs a bid from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedBidData) -> Self {
        Self {
            id: data.id,
            task_id: data.task_id,
            bidder: data.bidder,
            amount: data.amount,
            message: data.message,
            status: data.status,
            created_at: data.created_at,
        }
    }

    /// Returns the bid identifier.
    #[must_use]
    pub const fn id(&self) -> BidId {
        self.id
    }

    /// Returns the owning task.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the bidder address.
    #[must_use]
    pub const fn bidder(&self) -> &AgentAddress {
        &self.bidder
    }

    /// Returns the offered amount.
    #[must_use]
    pub const fn amount(&self) -> Sats {
        self.amount
    }

    /// Returns the optional bid message.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns the bid status.
    #[must_use]
    pub const fn status(&self) -> BidStatus {
        self.status
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Records a new disposition decided by a committed transition.
    pub(crate) const fn set_status(&mut self, status: BidStatus) {
        self.status = status;
    }
}
