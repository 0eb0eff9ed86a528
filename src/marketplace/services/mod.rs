//! Application services for the task marketplace.

mod board;
mod error;
mod ledger;
mod lifecycle;

pub use board::{AgentDetail, BoardQueryService, TaskDetail};
pub use error::{ErrorKind, MarketplaceError, MarketplaceResult};
pub use ledger::AgentLedgerService;
pub use lifecycle::{
    CreateTaskRequest, PlaceBidRequest, SubmitWorkRequest, TaskLifecycleService,
    VerifyWorkRequest,
};
