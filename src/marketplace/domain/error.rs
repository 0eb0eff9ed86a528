//! Error types for marketplace domain validation, parsing, and transitions.

use super::{ActivityAction, AgentAddress, BidId, BidStatus, TaskId, TaskRole, TaskStatus};
use thiserror::Error;

/// Errors returned while constructing marketplace domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MarketplaceDomainError {
    /// The agent address is empty after trimming.
    #[error("agent address must not be empty")]
    EmptyAddress,

    /// The agent address is too long or contains invalid characters.
    #[error("invalid agent address '{0}'")]
    InvalidAddress(String),

    /// The task title is empty after trimming.
    #[error("task title must not be empty")]
    EmptyTitle,

    /// The task description is empty after trimming.
    #[error("task description must not be empty")]
    EmptyDescription,

    /// A bounty or bid amount of zero was supplied.
    #[error("amount must be at least 1 sat")]
    ZeroAmount,

    /// The amount exceeds the persisted `BIGINT` range.
    #[error("amount {0} exceeds the maximum storable sats value")]
    AmountTooLarge(u64),

    /// A tag is blank or contains whitespace.
    #[error("invalid tag '{0}', expected a non-empty token without whitespace")]
    InvalidTag(String),

    /// The proof URL is empty after trimming.
    #[error("proof url must not be empty")]
    EmptyProofUrl,

    /// The payment reference is blank, too long, or contains whitespace.
    #[error("invalid payment reference '{0}'")]
    InvalidPaymentReference(String),

    /// The task identifier is not positive.
    #[error("invalid task identifier {0}, expected a positive integer")]
    InvalidTaskId(i64),

    /// The bid identifier is not positive.
    #[error("invalid bid identifier {0}, expected a positive integer")]
    InvalidBidId(i64),
}

/// Errors returned by the task lifecycle state machine.
///
/// Every variant is detected before any mutation takes place.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionError {
    /// The actor does not hold the role the transition requires.
    #[error("agent {actor} is not the {role} of task {task_id}")]
    Forbidden {
        /// Task the transition targeted.
        task_id: TaskId,
        /// Address that attempted the transition.
        actor: AgentAddress,
        /// Role the transition requires.
        role: TaskRole,
    },

    /// The task is not in the source state the transition requires.
    #[error("cannot {action} task {task_id}: status is {current}, expected {required}")]
    InvalidState {
        /// Task the transition targeted.
        task_id: TaskId,
        /// Action that was attempted.
        action: ActivityAction,
        /// Status the task currently holds.
        current: TaskStatus,
        /// Status the transition requires.
        required: TaskStatus,
    },

    /// The poster attempted to bid on their own task.
    #[error("agent {bidder} cannot bid on task {task_id} they posted")]
    SelfBid {
        /// Task the bid targeted.
        task_id: TaskId,
        /// Address of the would-be bidder.
        bidder: AgentAddress,
    },

    /// The referenced bid belongs to a different task.
    #[error("bid {bid_id} does not belong to task {task_id}")]
    BidNotOnTask {
        /// Task named by the caller.
        task_id: TaskId,
        /// Bid named by the caller.
        bid_id: BidId,
    },

    /// The referenced bid has already left the pending state.
    #[error("bid {bid_id} is {status}, expected pending")]
    BidNotPending {
        /// Bid named by the caller.
        bid_id: BidId,
        /// Status the bid currently holds.
        status: BidStatus,
    },

    /// The actor did not place the referenced bid.
    #[error("agent {actor} did not place bid {bid_id}")]
    NotBidOwner {
        /// Bid named by the caller.
        bid_id: BidId,
        /// Address that attempted the withdrawal.
        actor: AgentAddress,
    },
}

/// Error returned while parsing task statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task status: {0}")]
pub struct ParseTaskStatusError(pub String);

/// Error returned while parsing bid statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown bid status: {0}")]
pub struct ParseBidStatusError(pub String);

/// Error returned while parsing activity actions from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown activity action: {0}")]
pub struct ParseActivityActionError(pub String);
