//! Agent ledger records and the deltas transitions apply to them.

use super::{AgentAddress, Sats};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity details supplied when an agent is referenced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentProfile {
    address: AgentAddress,
    display_name: Option<String>,
    secondary_address: Option<AgentAddress>,
}

impl AgentProfile {
    /// Creates a profile carrying only the primary address.
    #[must_use]
    pub const fn new(address: AgentAddress) -> Self {
        Self {
            address,
            display_name: None,
            secondary_address: None,
        }
    }

    /// Sets the display name. Blank names are treated as absent.
    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        let name = display_name.into();
        let trimmed = name.trim();
        self.display_name = (!trimmed.is_empty()).then(|| trimmed.to_owned());
        self
    }

    /// Sets the secondary address.
    #[must_use]
    pub fn with_secondary_address(mut self, secondary_address: AgentAddress) -> Self {
        self.secondary_address = Some(secondary_address);
        self
    }

    /// Returns the primary address.
    #[must_use]
    pub const fn address(&self) -> &AgentAddress {
        &self.address
    }

    /// Returns the display name, if supplied.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Returns the secondary address, if supplied.
    #[must_use]
    pub const fn secondary_address(&self) -> Option<&AgentAddress> {
        self.secondary_address.as_ref()
    }
}

/// Counter changes a single transition applies to one agent.
///
/// Reputation and task counters only ever grow; the sats counters are
/// signed because cancellation corrects `total_spent_sats` downwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerDelta {
    address: AgentAddress,
    reputation: u64,
    tasks_posted: u64,
    tasks_completed: u64,
    earned_sats: i64,
    spent_sats: i64,
}

impl LedgerDelta {
    const fn empty(address: AgentAddress) -> Self {
        Self {
            address,
            reputation: 0,
            tasks_posted: 0,
            tasks_completed: 0,
            earned_sats: 0,
            spent_sats: 0,
        }
    }

    /// Poster committed a bounty by posting a task.
    #[must_use]
    pub fn task_posted(poster: AgentAddress, bounty: Sats) -> Self {
        Self {
            tasks_posted: 1,
            spent_sats: bounty.signed(),
            ..Self::empty(poster)
        }
    }

    /// Poster withdrew an open task, releasing its bounty.
    #[must_use]
    pub fn task_cancelled(poster: AgentAddress, bounty: Sats) -> Self {
        Self {
            spent_sats: -bounty.signed(),
            ..Self::empty(poster)
        }
    }

    /// Worker had work approved for `bounty`.
    #[must_use]
    pub fn work_approved(worker: AgentAddress, bounty: Sats) -> Self {
        Self {
            reputation: 1,
            tasks_completed: 1,
            earned_sats: bounty.signed(),
            ..Self::empty(worker)
        }
    }

    /// Poster saw a task through to approval.
    #[must_use]
    pub fn approval_granted(poster: AgentAddress) -> Self {
        Self {
            reputation: 1,
            ..Self::empty(poster)
        }
    }

    /// Returns the affected agent.
    #[must_use]
    pub const fn address(&self) -> &AgentAddress {
        &self.address
    }

    /// Returns the reputation increase.
    #[must_use]
    pub const fn reputation(&self) -> u64 {
        self.reputation
    }

    /// Returns the posted-task increase.
    #[must_use]
    pub const fn tasks_posted(&self) -> u64 {
        self.tasks_posted
    }

    /// Returns the completed-task increase.
    #[must_use]
    pub const fn tasks_completed(&self) -> u64 {
        self.tasks_completed
    }

    /// Returns the signed change to earned sats.
    #[must_use]
    pub const fn earned_sats(&self) -> i64 {
        self.earned_sats
    }

    /// Returns the signed change to spent sats.
    #[must_use]
    pub const fn spent_sats(&self) -> i64 {
        self.spent_sats
    }
}

/// Cumulative reputation and financial counters of an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    address: AgentAddress,
    display_name: Option<String>,
    secondary_address: Option<AgentAddress>,
    reputation: u64,
    tasks_posted: u64,
    tasks_completed: u64,
    total_earned_sats: u64,
    total_spent_sats: u64,
    first_seen: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedAgentData {
    /// Persisted primary address.
    pub address: AgentAddress,
    /// Persisted display name, if any.
    pub display_name: Option<String>,
    /// Persisted secondary address, if any.
    pub secondary_address: Option<AgentAddress>,
    /// Persisted reputation.
    pub reputation: u64,
    /// Persisted posted-task count.
    pub tasks_posted: u64,
    /// Persisted completed-task count.
    pub tasks_completed: u64,
    /// Persisted earned sats.
    pub total_earned_sats: u64,
    /// Persisted spent sats.
    pub total_spent_sats: u64,
    /// Persisted first-seen timestamp.
    pub first_seen: DateTime<Utc>,
}

impl Agent {
    /// Creates a zeroed ledger entry for a newly referenced agent.
    #[must_use]
    pub fn register(profile: AgentProfile, now: DateTime<Utc>) -> Self {
        Self {
            address: profile.address,
            display_name: profile.display_name,
            secondary_address: profile.secondary_address,
            reputation: 0,
            tasks_posted: 0,
            tasks_completed: 0,
            total_earned_sats: 0,
            total_spent_sats: 0,
            first_seen: now,
        }
    }

    /// Reconstructs an agent from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedAgentData) -> Self {
        Self {
            address: data.address,
            display_name: data.display_name,
            secondary_address: data.secondary_address,
            reputation: data.reputation,
            tasks_posted: data.tasks_posted,
            tasks_completed: data.tasks_completed,
            total_earned_sats: data.total_earned_sats,
            total_spent_sats: data.total_spent_sats,
            first_seen: data.first_seen,
        }
    }

    /// Returns the primary address.
    #[must_use]
    pub const fn address(&self) -> &AgentAddress {
        &self.address
    }

    /// Returns the display name, if known.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Returns the secondary address, if known.
    #[must_use]
    pub const fn secondary_address(&self) -> Option<&AgentAddress> {
        self.secondary_address.as_ref()
    }

    /// Returns the reputation score.
    #[must_use]
    pub const fn reputation(&self) -> u64 {
        self.reputation
    }

    /// Returns the number of tasks posted.
    #[must_use]
    pub const fn tasks_posted(&self) -> u64 {
        self.tasks_posted
    }

    /// Returns the number of tasks completed as worker.
    #[must_use]
    pub const fn tasks_completed(&self) -> u64 {
        self.tasks_completed
    }

    /// Returns the sats earned from approved work.
    #[must_use]
    pub const fn total_earned_sats(&self) -> u64 {
        self.total_earned_sats
    }

    /// Returns the sats committed to posted tasks.
    #[must_use]
    pub const fn total_spent_sats(&self) -> u64 {
        self.total_spent_sats
    }

    /// Returns when the agent was first referenced.
    #[must_use]
    pub const fn first_seen(&self) -> DateTime<Utc> {
        self.first_seen
    }

    /// Merges identity details, keeping known values the profile omits.
    pub fn merge_profile(&mut self, profile: &AgentProfile) {
        if let Some(name) = profile.display_name() {
            self.display_name = Some(name.to_owned());
        }
        if let Some(secondary) = profile.secondary_address() {
            self.secondary_address = Some(secondary.clone());
        }
    }

    /// Applies a transition's counter changes.
    pub fn apply(&mut self, delta: &LedgerDelta) {
        self.reputation = self.reputation.saturating_add(delta.reputation);
        self.tasks_posted = self.tasks_posted.saturating_add(delta.tasks_posted);
        self.tasks_completed = self.tasks_completed.saturating_add(delta.tasks_completed);
        self.total_earned_sats = self.total_earned_sats.saturating_add_signed(delta.earned_sats);
        self.total_spent_sats = self.total_spent_sats.saturating_add_signed(delta.spent_sats);
    }
}
