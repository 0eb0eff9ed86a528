//! Domain model for the task marketplace.
//!
//! Tasks, bids, the activity log and the agent ledger are plain values here;
//! the lifecycle state machine in [`transition`] plans every change as a pure
//! function so persistence stays outside the domain boundary.

mod activity;
mod agent;
mod bid;
mod error;
mod ids;
mod listing;
mod task;
pub mod transition;

pub use activity::{ActivityAction, ActivityEntry, ActivityRecord};
pub use agent::{Agent, AgentProfile, LedgerDelta, PersistedAgentData};
pub use bid::{Bid, BidStatus, NewBid, PersistedBidData};
pub use error::{
    MarketplaceDomainError, ParseActivityActionError, ParseBidStatusError, ParseTaskStatusError,
    TransitionError,
};
pub use ids::{AgentAddress, BidId, PaymentReference, Sats, TaskId};
pub use listing::{BoardStats, Page, PageRequest, TaskFilter, TaskSummary};
pub use task::{NewTask, PersistedTaskData, Task, TaskRole, TaskStatus, WorkProof};
pub use transition::{
    BidCascade, BidPlan, CreationPlan, TaskEvent, TransitionGuard, TransitionOutcome,
    WithdrawalPlan,
};
