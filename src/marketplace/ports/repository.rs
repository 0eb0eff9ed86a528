//! Repository ports for task, bid, activity and agent ledger persistence.

use crate::marketplace::domain::{
    ActivityRecord, Agent, AgentAddress, AgentProfile, Bid, BidId, BidPlan, BoardStats,
    CreationPlan, Page, PageRequest, Task, TaskFilter, TaskId, TaskStatus, TaskSummary,
    TransitionOutcome, WithdrawalPlan,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for marketplace repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Task lifecycle persistence contract.
///
/// Every write method applies its plan atomically: either all of its effects
/// (task row, bid dispositions, ledger deltas, activity entry) become
/// observable, or none do.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Inserts a new open task, applies the poster's ledger deltas and
    /// appends the creation activity. Returns the task under its assigned id.
    async fn create_task(&self, plan: &CreationPlan) -> RepositoryResult<Task>;

    /// Finds a task by identifier.
    ///
    /// Returns `None` when the task does not exist.
    async fn find_task(&self, id: TaskId) -> RepositoryResult<Option<Task>>;

    /// Returns one page of tasks matching `filter`, newest first.
    async fn list_tasks(
        &self,
        filter: &TaskFilter,
        page: PageRequest,
    ) -> RepositoryResult<Page<TaskSummary>>;

    /// Returns tasks posted by `address`, newest first.
    async fn tasks_posted_by(&self, address: &AgentAddress) -> RepositoryResult<Vec<Task>>;

    /// Returns tasks where `address` is the worker, newest first.
    async fn tasks_worked_by(&self, address: &AgentAddress) -> RepositoryResult<Vec<Task>>;

    /// Inserts a pending bid and appends the bid activity.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::TransitionConflict`] when the task is no
    /// longer open at write time and [`RepositoryError::TaskNotFound`] when
    /// it does not exist.
    async fn place_bid(&self, plan: &BidPlan) -> RepositoryResult<Bid>;

    /// Finds a bid by identifier.
    ///
    /// Returns `None` when the bid does not exist.
    async fn find_bid(&self, id: BidId) -> RepositoryResult<Option<Bid>>;

    /// Returns every bid on a task, oldest first.
    async fn list_bids(&self, task_id: TaskId) -> RepositoryResult<Vec<Bid>>;

    /// Returns the live number of pending bids on a task.
    async fn pending_bid_count(&self, task_id: TaskId) -> RepositoryResult<u64>;

    /// Returns the activity log of a task, oldest first.
    async fn list_activity(&self, task_id: TaskId) -> RepositoryResult<Vec<ActivityRecord>>;

    /// Writes a planned lifecycle transition.
    ///
    /// The task row is updated only if it still matches the outcome's guard
    /// (status and role holder). The dependent batch runs only after that
    /// conditional update took effect.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::TransitionConflict`] when the guard matched
    /// no row, or [`RepositoryError::BidConflict`] when the accepted bid is no
    /// longer pending; nothing is written in either case.
    async fn commit_transition(&self, outcome: &TransitionOutcome) -> RepositoryResult<()>;

    /// Marks a pending bid withdrawn and appends the withdrawal activity.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::BidConflict`] when the bid is no longer
    /// pending or its task is no longer open.
    async fn commit_withdrawal(&self, plan: &WithdrawalPlan) -> RepositoryResult<Bid>;

    /// Returns aggregate board counters.
    async fn stats(&self) -> RepositoryResult<BoardStats>;
}

/// Agent ledger persistence contract.
///
/// Counter mutations have no method here: they are applied only as part of
/// [`TaskRepository`] writes.
#[async_trait]
pub trait AgentRepository: Send + Sync {
    /// Creates the agent if unknown, otherwise merges identity details
    /// without overwriting known values with absent ones.
    async fn upsert(&self, profile: &AgentProfile, now: DateTime<Utc>) -> RepositoryResult<Agent>;

    /// Finds an agent by primary address.
    ///
    /// Returns `None` when the agent has never been referenced.
    async fn find_agent(&self, address: &AgentAddress) -> RepositoryResult<Option<Agent>>;

    /// Returns every agent by reputation, then completed tasks, descending.
    async fn list_ranked(&self) -> RepositoryResult<Vec<Agent>>;
}

/// Errors returned by marketplace repository implementations.
#[derive(Debug, Clone, Error)]
pub enum RepositoryError {
    /// The task was not found.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    /// The bid was not found.
    #[error("bid not found: {0}")]
    BidNotFound(BidId),

    /// The task no longer satisfied the write guard.
    #[error("task {task_id} changed concurrently; expected status {expected}")]
    TransitionConflict {
        /// Task whose guarded write matched no row.
        task_id: TaskId,
        /// Status the write expected.
        expected: TaskStatus,
    },

    /// The bid was settled concurrently.
    #[error("bid {0} changed concurrently")]
    BidConflict(BidId),

    /// Persisted data could not be reconstructed into domain types.
    #[error("invalid persisted data: {0}")]
    InvalidPersistedData(Arc<dyn std::error::Error + Send + Sync>),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl RepositoryError {
    /// Wraps a data-quality or deserialization error from persisted rows.
    pub fn invalid_persisted_data(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::InvalidPersistedData(Arc::new(err))
    }

    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }

    /// Returns whether the error reports a lost race.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::TransitionConflict { .. } | Self::BidConflict(_)
        )
    }
}
