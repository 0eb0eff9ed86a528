//! Task aggregate root and related task lifecycle types.

use super::{AgentAddress, MarketplaceDomainError, ParseTaskStatusError, PaymentReference, Sats, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task accepts bids and has no worker.
    Open,
    /// A bid was accepted and its bidder is working on the task.
    Assigned,
    /// The worker submitted proof and awaits verification.
    Submitted,
    /// The poster approved the work without a payment reference.
    Verified,
    /// The poster approved the work and supplied a payment reference.
    Paid,
    /// The poster rejected the submitted work.
    Disputed,
    /// The poster withdrew the task before assignment.
    Cancelled,
}

impl TaskStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 7] = [
        Self::Open,
        Self::Assigned,
        Self::Submitted,
        Self::Verified,
        Self::Paid,
        Self::Disputed,
        Self::Cancelled,
    ];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Assigned => "assigned",
            Self::Submitted => "submitted",
            Self::Verified => "verified",
            Self::Paid => "paid",
            Self::Disputed => "disputed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns whether transition to `target` is allowed.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Open, Self::Assigned | Self::Cancelled)
                | (Self::Assigned, Self::Submitted)
                | (Self::Submitted, Self::Verified | Self::Paid | Self::Disputed)
        )
    }

    /// Returns whether no outgoing transition exists.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Verified | Self::Paid | Self::Disputed | Self::Cancelled
        )
    }

    /// Returns whether the work was approved.
    #[must_use]
    pub const fn is_completed(self) -> bool {
        matches!(self, Self::Verified | Self::Paid)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseTaskStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "open" => Ok(Self::Open),
            "assigned" => Ok(Self::Assigned),
            "submitted" => Ok(Self::Submitted),
            "verified" => Ok(Self::Verified),
            "paid" => Ok(Self::Paid),
            "disputed" => Ok(Self::Disputed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(ParseTaskStatusError(value.to_owned())),
        }
    }
}

/// Role an agent plays relative to a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskRole {
    /// The agent that posted the task.
    Poster,
    /// The agent whose bid was accepted.
    Worker,
}

impl TaskRole {
    /// Returns the canonical representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Poster => "poster",
            Self::Worker => "worker",
        }
    }
}

impl fmt::Display for TaskRole {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Proof of work submitted by the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkProof {
    url: String,
    description: Option<String>,
}

impl WorkProof {
    /// Creates validated proof metadata.
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceDomainError::EmptyProofUrl`] when the URL is
    /// blank.
    pub fn new(
        url: impl Into<String>,
        description: Option<String>,
    ) -> Result<Self, MarketplaceDomainError> {
        let raw_url = url.into();
        let trimmed = raw_url.trim();
        if trimmed.is_empty() {
            return Err(MarketplaceDomainError::EmptyProofUrl);
        }
        Ok(Self {
            url: trimmed.to_owned(),
            description: description
                .map(|text| text.trim().to_owned())
                .filter(|text| !text.is_empty()),
        })
    }

    /// Returns the proof URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the optional proof description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// A validated task that has not been assigned an identifier yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    poster: AgentAddress,
    title: String,
    description: String,
    bounty: Sats,
    tags: Vec<String>,
    deadline: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl NewTask {
    /// Creates a validated task draft.
    ///
    /// Tags are trimmed, lowercased and deduplicated preserving first
    /// occurrence order.
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceDomainError`] when the title, description or a
    /// tag is invalid.
    pub fn new(
        poster: AgentAddress,
        raw_title: impl Into<String>,
        raw_description: impl Into<String>,
        bounty: Sats,
        created_at: DateTime<Utc>,
    ) -> Result<Self, MarketplaceDomainError> {
        Ok(Self {
            poster,
            title: non_blank(raw_title.into(), MarketplaceDomainError::EmptyTitle)?,
            description: non_blank(
                raw_description.into(),
                MarketplaceDomainError::EmptyDescription,
            )?,
            bounty,
            tags: Vec::new(),
            deadline: None,
            created_at,
        })
    }

    /// Sets task tags.
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceDomainError::InvalidTag`] for blank tags or tags
    /// containing whitespace.
    pub fn with_tags(
        mut self,
        tags: impl IntoIterator<Item = String>,
    ) -> Result<Self, MarketplaceDomainError> {
        let mut normalized: Vec<String> = Vec::new();
        for tag in tags {
            let candidate = tag.trim().to_ascii_lowercase();
            if candidate.is_empty() || candidate.chars().any(char::is_whitespace) {
                return Err(MarketplaceDomainError::InvalidTag(tag));
            }
            if !normalized.contains(&candidate) {
                normalized.push(candidate);
            }
        }
        self.tags = normalized;
        Ok(self)
    }

    /// Sets the task deadline.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Returns the poster address.
    #[must_use]
    pub const fn poster(&self) -> &AgentAddress {
        &self.poster
    }

    /// Returns the task title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the task description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the posted bounty.
    #[must_use]
    pub const fn bounty(&self) -> Sats {
        self.bounty
    }

    /// Returns the normalized tags.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Returns the deadline, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

fn non_blank(value: String, error: MarketplaceDomainError) -> Result<String, MarketplaceDomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(error);
    }
    Ok(trimmed.to_owned())
}

/// Task aggregate root.
///
/// The worker is `None` exactly while the task was never assigned: status
/// [`TaskStatus::Open`], or [`TaskStatus::Cancelled`] which is only reachable
/// from open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    poster: AgentAddress,
    title: String,
    description: String,
    bounty: Sats,
    status: TaskStatus,
    tags: Vec<String>,
    deadline: Option<DateTime<Utc>>,
    worker: Option<AgentAddress>,
    proof: Option<WorkProof>,
    payment_tx: Option<PaymentReference>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted task aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Persisted poster address.
    pub poster: AgentAddress,
    /// Persisted title.
    pub title: String,
    /// Persisted description.
    pub description: String,
    /// Persisted bounty.
    pub bounty: Sats,
    /// Persisted lifecycle status.
    pub status: TaskStatus,
    /// Persisted tags.
    pub tags: Vec<String>,
    /// Persisted deadline, if any.
    pub deadline: Option<DateTime<Utc>>,
    /// Persisted worker address, if any.
    pub worker: Option<AgentAddress>,
    /// Persisted proof of work, if any.
    pub proof: Option<WorkProof>,
    /// Persisted payment reference, if any.
    pub payment_tx: Option<PaymentReference>,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest lifecycle timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Materializes a stored draft under its assigned identifier.
    #[must_use]
    pub fn from_new(id: TaskId, draft: NewTask) -> Self {
        Self {
            id,
            poster: draft.poster,
            title: draft.title,
            description: draft.description,
            bounty: draft.bounty,
            status: TaskStatus::Open,
            tags: draft.tags,
            deadline: draft.deadline,
            worker: None,
            proof: None,
            payment_tx: None,
            created_at: draft.created_at,
            updated_at: draft.created_at,
        }
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            poster: data.poster,
            title: data.title,
            description: data.description,
            bounty: data.bounty,
            status: data.status,
            tags: data.tags,
            deadline: data.deadline,
            worker: data.worker,
            proof: data.proof,
            payment_tx: data.payment_tx,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the poster address.
    #[must_use]
    pub const fn poster(&self) -> &AgentAddress {
        &self.poster
    }

    /// Returns the task title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the task description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the bounty: the posted amount until a bid is accepted, the
    /// accepted bid amount afterwards.
    #[must_use]
    pub const fn bounty(&self) -> Sats {
        self.bounty
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the task tags.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Returns the deadline, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    /// Returns the assigned worker, if any.
    #[must_use]
    pub const fn worker(&self) -> Option<&AgentAddress> {
        self.worker.as_ref()
    }

    /// Returns the submitted proof, if any.
    #[must_use]
    pub const fn proof(&self) -> Option<&WorkProof> {
        self.proof.as_ref()
    }

    /// Returns the payment reference, if any.
    #[must_use]
    pub const fn payment_tx(&self) -> Option<&PaymentReference> {
        self.payment_tx.as_ref()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest lifecycle timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the address holding `role`, if any.
    #[must_use]
    pub const fn holder_of(&self, role: TaskRole) -> Option<&AgentAddress> {
        match role {
            TaskRole::Poster => Some(&self.poster),
            TaskRole::Worker => self.worker.as_ref(),
        }
    }

    pub(super) fn assign(&mut self, worker: AgentAddress, bounty: Sats, now: DateTime<Utc>) {
        self.status = TaskStatus::Assigned;
        self.worker = Some(worker);
        self.bounty = bounty;
        self.updated_at = now;
    }

    pub(super) fn submit(&mut self, proof: WorkProof, now: DateTime<Utc>) {
        self.status = TaskStatus::Submitted;
        self.proof = Some(proof);
        self.updated_at = now;
    }

    pub(super) fn approve(&mut self, payment_tx: Option<PaymentReference>, now: DateTime<Utc>) {
        self.status = if payment_tx.is_some() {
            TaskStatus::Paid
        } else {
            TaskStatus::Verified
        };
        self.payment_tx = payment_tx;
        self.updated_at = now;
    }

    pub(super) fn dispute(&mut self, now: DateTime<Utc>) {
        self.status = TaskStatus::Disputed;
        self.updated_at = now;
    }

    pub(super) fn cancel(&mut self, now: DateTime<Utc>) {
        self.status = TaskStatus::Cancelled;
        self.updated_at = now;
    }
}
