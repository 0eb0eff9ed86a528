//! Append-only task activity log.

use super::{AgentAddress, ParseActivityActionError, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Action label recorded in the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    /// The task was posted.
    Created,
    /// A bid was placed.
    Bid,
    /// A bidder withdrew a pending bid.
    WithdrewBid,
    /// The poster accepted a bid.
    AcceptedBid,
    /// The worker submitted proof.
    Submitted,
    /// The poster approved the work.
    Verified,
    /// The poster rejected the work.
    Disputed,
    /// The poster cancelled the task.
    Cancelled,
}

impl ActivityAction {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Bid => "bid",
            Self::WithdrewBid => "withdrew_bid",
            Self::AcceptedBid => "accepted_bid",
            Self::Submitted => "submitted",
            Self::Verified => "verified",
            Self::Disputed => "disputed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ActivityAction {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ActivityAction {
    type Error = ParseActivityActionError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "created" => Ok(Self::Created),
            "bid" => Ok(Self::Bid),
            "withdrew_bid" => Ok(Self::WithdrewBid),
            "accepted_bid" => Ok(Self::AcceptedBid),
            "submitted" => Ok(Self::Submitted),
            "verified" => Ok(Self::Verified),
            "disputed" => Ok(Self::Disputed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(ParseActivityActionError(value.to_owned())),
        }
    }
}

/// Activity entry awaiting attachment to a stored task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityEntry {
    actor: AgentAddress,
    action: ActivityAction,
    details: String,
    created_at: DateTime<Utc>,
}

impl ActivityEntry {
    /// Creates an activity entry.
    #[must_use]
    pub fn new(
        actor: AgentAddress,
        action: ActivityAction,
        details: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            actor,
            action,
            details: details.into(),
            created_at,
        }
    }

    /// Returns the acting agent.
    #[must_use]
    pub const fn actor(&self) -> &AgentAddress {
        &self.actor
    }

    /// Returns the action label.
    #[must_use]
    pub const fn action(&self) -> ActivityAction {
        self.action
    }

    /// Returns the free-text details.
    #[must_use]
    pub fn details(&self) -> &str {
        &self.details
    }

    /// Returns the entry timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Attaches the entry to a task, producing an immutable record.
    #[must_use]
    pub fn attach(self, task_id: TaskId) -> ActivityRecord {
        ActivityRecord {
            task_id,
            entry: self,
        }
    }
}

/// Immutable audit-log record of a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityRecord {
    task_id: TaskId,
    entry: ActivityEntry,
}

impl ActivityRecord {
    /// Returns the owning task.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the acting agent.
    #[must_use]
    pub const fn actor(&self) -> &AgentAddress {
        self.entry.actor()
    }

    /// Returns the action label.
    #[must_use]
    pub const fn action(&self) -> ActivityAction {
        self.entry.action()
    }

    /// Returns the free-text details.
    #[must_use]
    pub fn details(&self) -> &str {
        self.entry.details()
    }

    /// Returns the record timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.entry.created_at()
    }
}
