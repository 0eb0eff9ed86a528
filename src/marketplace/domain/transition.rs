//! Pure task lifecycle state machine.
//!
//! Every state-changing operation is planned here without touching storage.
//! A plan names the guard that must still hold when it is written (the
//! compare-and-swap precondition) together with every dependent effect: the
//! new task state, bid dispositions, ledger deltas, and the activity entry.
//! Repositories apply a plan as one atomic unit and reject it when the guard
//! no longer matches.

use super::{
    ActivityAction, ActivityEntry, AgentAddress, Bid, BidId, BidStatus, LedgerDelta, NewBid,
    NewTask, PaymentReference, Sats, Task, TaskId, TaskRole, TaskStatus, TransitionError,
    WorkProof,
};
use chrono::{DateTime, Utc};

/// Lifecycle event requested against an existing task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    /// The poster accepts a bid, assigning its bidder.
    AcceptBid(Bid),
    /// The worker submits proof of work.
    SubmitWork(WorkProof),
    /// The poster approves the submitted work.
    ApproveWork {
        /// Settlement reference; its presence marks the task paid.
        payment_tx: Option<PaymentReference>,
    },
    /// The poster rejects the submitted work.
    RejectWork {
        /// Optional explanation recorded in the activity log.
        reason: Option<String>,
    },
    /// The poster withdraws an open task.
    Cancel,
}

impl TaskEvent {
    /// Returns the activity label recorded for the event.
    #[must_use]
    pub const fn action(&self) -> ActivityAction {
        match self {
            Self::AcceptBid(_) => ActivityAction::AcceptedBid,
            Self::SubmitWork(_) => ActivityAction::Submitted,
            Self::ApproveWork { .. } => ActivityAction::Verified,
            Self::RejectWork { .. } => ActivityAction::Disputed,
            Self::Cancel => ActivityAction::Cancelled,
        }
    }

    /// Returns the status the task must hold for the event to apply.
    #[must_use]
    pub const fn required_status(&self) -> TaskStatus {
        match self {
            Self::AcceptBid(_) | Self::Cancel => TaskStatus::Open,
            Self::SubmitWork(_) => TaskStatus::Assigned,
            Self::ApproveWork { .. } | Self::RejectWork { .. } => TaskStatus::Submitted,
        }
    }

    /// Returns the role the actor must hold on the task.
    #[must_use]
    pub const fn required_role(&self) -> TaskRole {
        match self {
            Self::SubmitWork(_) => TaskRole::Worker,
            Self::AcceptBid(_)
            | Self::ApproveWork { .. }
            | Self::RejectWork { .. }
            | Self::Cancel => TaskRole::Poster,
        }
    }
}

/// Compare-and-swap precondition for a planned write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionGuard {
    task_id: TaskId,
    expected_status: TaskStatus,
    role: TaskRole,
    actor: AgentAddress,
}

impl TransitionGuard {
    /// Returns the guarded task.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the status the stored task must still hold.
    #[must_use]
    pub const fn expected_status(&self) -> TaskStatus {
        self.expected_status
    }

    /// Returns the role the actor must still hold.
    #[must_use]
    pub const fn role(&self) -> TaskRole {
        self.role
    }

    /// Returns the acting agent.
    #[must_use]
    pub const fn actor(&self) -> &AgentAddress {
        &self.actor
    }

    /// Returns whether the stored task still satisfies the guard.
    #[must_use]
    pub fn admits(&self, stored: &Task) -> bool {
        stored.id() == self.task_id
            && stored.status() == self.expected_status
            && stored.holder_of(self.role) == Some(&self.actor)
    }
}

/// Bid dispositions that accompany an acceptance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BidCascade {
    task_id: TaskId,
    accepted: BidId,
}

impl BidCascade {
    /// Returns the task whose bids are settled.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the accepted bid.
    #[must_use]
    pub const fn accepted(&self) -> BidId {
        self.accepted
    }

    /// Returns the new status for `bid`, or `None` when it is unaffected.
    ///
    /// The accepted bid becomes accepted, sibling pending bids become
    /// rejected, and bids already withdrawn or settled keep their status.
    #[must_use]
    pub fn disposition_for(&self, bid: &Bid) -> Option<BidStatus> {
        if bid.task_id() != self.task_id || bid.status() != BidStatus::Pending {
            return None;
        }
        if bid.id() == self.accepted {
            Some(BidStatus::Accepted)
        } else {
            Some(BidStatus::Rejected)
        }
    }
}

/// Complete effect of one lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    guard: TransitionGuard,
    task: Task,
    cascade: Option<BidCascade>,
    ledger: Vec<LedgerDelta>,
    activity: ActivityEntry,
}

impl TransitionOutcome {
    /// Returns the write precondition.
    #[must_use]
    pub const fn guard(&self) -> &TransitionGuard {
        &self.guard
    }

    /// Returns the task state to write.
    #[must_use]
    pub const fn task(&self) -> &Task {
        &self.task
    }

    /// Returns the bid cascade, present only for acceptance.
    #[must_use]
    pub const fn cascade(&self) -> Option<&BidCascade> {
        self.cascade.as_ref()
    }

    /// Returns the ledger deltas to apply.
    #[must_use]
    pub fn ledger(&self) -> &[LedgerDelta] {
        &self.ledger
    }

    /// Returns the activity entry to append.
    #[must_use]
    pub const fn activity(&self) -> &ActivityEntry {
        &self.activity
    }

    /// Consumes the outcome, returning the new task state.
    #[must_use]
    pub fn into_task(self) -> Task {
        self.task
    }
}

/// Plans a lifecycle transition of `task` requested by `actor`.
///
/// The source status is checked before the actor's role, so a request
/// against a task in the wrong state reports the state conflict.
///
/// # Errors
///
/// Returns [`TransitionError::InvalidState`] when the task is not in the
/// event's source status, [`TransitionError::Forbidden`] when `actor` does not
/// hold the required role, and bid errors when an accepted bid does not belong
/// to the task or is no longer pending.
pub fn apply(
    task: &Task,
    actor: &AgentAddress,
    event: TaskEvent,
    now: DateTime<Utc>,
) -> Result<TransitionOutcome, TransitionError> {
    let guard = authorize(task, actor, &event)?;
    let action = event.action();
    let mut next = task.clone();
    let mut cascade = None;
    let mut ledger = Vec::new();

    let details = match event {
        TaskEvent::AcceptBid(bid) => {
            ensure_acceptable(task.id(), &bid)?;
            next.assign(bid.bidder().clone(), bid.amount(), now);
            cascade = Some(BidCascade {
                task_id: task.id(),
                accepted: bid.id(),
            });
            format!(
                "Accepted bid #{} from {} for {}",
                bid.id(),
                bid.bidder(),
                bid.amount()
            )
        }
        TaskEvent::SubmitWork(proof) => {
            let details = format!("Submitted proof: {}", proof.url());
            next.submit(proof, now);
            details
        }
        TaskEvent::ApproveWork { payment_tx } => {
            let details = payment_tx.as_ref().map_or_else(
                || format!("Approved work for {}", task.bounty()),
                |tx| format!("Approved work for {}, payment {tx}", task.bounty()),
            );
            if let Some(worker) = task.worker() {
                ledger.push(LedgerDelta::work_approved(worker.clone(), task.bounty()));
            }
            ledger.push(LedgerDelta::approval_granted(task.poster().clone()));
            next.approve(payment_tx, now);
            details
        }
        TaskEvent::RejectWork { reason } => {
            next.dispute(now);
            match reason.as_deref().map(str::trim).filter(|text| !text.is_empty()) {
                Some(text) => format!("Rejected work: {text}"),
                None => "Rejected work".to_owned(),
            }
        }
        TaskEvent::Cancel => {
            ledger.push(LedgerDelta::task_cancelled(
                task.poster().clone(),
                task.bounty(),
            ));
            next.cancel(now);
            format!("Cancelled task, released {}", task.bounty())
        }
    };

    let activity = ActivityEntry::new(actor.clone(), action, details, now);
    Ok(TransitionOutcome {
        guard,
        task: next,
        cascade,
        ledger,
        activity,
    })
}

fn authorize(
    task: &Task,
    actor: &AgentAddress,
    event: &TaskEvent,
) -> Result<TransitionGuard, TransitionError> {
    let required = event.required_status();
    if task.status() != required {
        return Err(TransitionError::InvalidState {
            task_id: task.id(),
            action: event.action(),
            current: task.status(),
            required,
        });
    }

    let role = event.required_role();
    if task.holder_of(role) != Some(actor) {
        return Err(TransitionError::Forbidden {
            task_id: task.id(),
            actor: actor.clone(),
            role,
        });
    }

    Ok(TransitionGuard {
        task_id: task.id(),
        expected_status: required,
        role,
        actor: actor.clone(),
    })
}

fn ensure_acceptable(task_id: TaskId, bid: &Bid) -> Result<(), TransitionError> {
    if bid.task_id() != task_id {
        return Err(TransitionError::BidNotOnTask {
            task_id,
            bid_id: bid.id(),
        });
    }
    if bid.status() != BidStatus::Pending {
        return Err(TransitionError::BidNotPending {
            bid_id: bid.id(),
            status: bid.status(),
        });
    }
    Ok(())
}

/// Effects of posting a new task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreationPlan {
    task: NewTask,
    ledger: Vec<LedgerDelta>,
    activity: ActivityEntry,
}

impl CreationPlan {
    /// Returns the task to insert.
    #[must_use]
    pub const fn task(&self) -> &NewTask {
        &self.task
    }

    /// Returns the ledger deltas to apply.
    #[must_use]
    pub fn ledger(&self) -> &[LedgerDelta] {
        &self.ledger
    }

    /// Returns the activity entry to append once the task has an id.
    #[must_use]
    pub const fn activity(&self) -> &ActivityEntry {
        &self.activity
    }
}

/// Plans the creation of `task`.
#[must_use]
pub fn plan_creation(task: NewTask) -> CreationPlan {
    let ledger = vec![LedgerDelta::task_posted(task.poster().clone(), task.bounty())];
    let activity = ActivityEntry::new(
        task.poster().clone(),
        ActivityAction::Created,
        format!("Posted \"{}\" with a bounty of {}", task.title(), task.bounty()),
        task.created_at(),
    );
    CreationPlan {
        task,
        ledger,
        activity,
    }
}

/// Effects of placing a bid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidPlan {
    bid: NewBid,
    activity: ActivityEntry,
}

impl BidPlan {
    /// Returns the bid to insert.
    #[must_use]
    pub const fn bid(&self) -> &NewBid {
        &self.bid
    }

    /// Returns the activity entry to append.
    #[must_use]
    pub const fn activity(&self) -> &ActivityEntry {
        &self.activity
    }
}

/// Plans a bid by `bidder` on `task`.
///
/// # Errors
///
/// Returns [`TransitionError::InvalidState`] unless the task is open and
/// [`TransitionError::SelfBid`] when the bidder posted the task.
pub fn plan_bid(
    task: &Task,
    bidder: &AgentAddress,
    amount: Sats,
    message: Option<String>,
    now: DateTime<Utc>,
) -> Result<BidPlan, TransitionError> {
    if task.status() != TaskStatus::Open {
        return Err(TransitionError::InvalidState {
            task_id: task.id(),
            action: ActivityAction::Bid,
            current: task.status(),
            required: TaskStatus::Open,
        });
    }
    if task.poster() == bidder {
        return Err(TransitionError::SelfBid {
            task_id: task.id(),
            bidder: bidder.clone(),
        });
    }

    let bid = NewBid::new(task.id(), bidder.clone(), amount, message, now);
    let activity = ActivityEntry::new(
        bidder.clone(),
        ActivityAction::Bid,
        format!("Bid {amount}"),
        now,
    );
    Ok(BidPlan { bid, activity })
}

/// Effects of withdrawing a pending bid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawalPlan {
    task_id: TaskId,
    bid_id: BidId,
    bidder: AgentAddress,
    activity: ActivityEntry,
}

impl WithdrawalPlan {
    /// Returns the task that must still be open.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the bid that must still be pending.
    #[must_use]
    pub const fn bid_id(&self) -> BidId {
        self.bid_id
    }

    /// Returns the bidder who must own the bid.
    #[must_use]
    pub const fn bidder(&self) -> &AgentAddress {
        &self.bidder
    }

    /// Returns the activity entry to append.
    #[must_use]
    pub const fn activity(&self) -> &ActivityEntry {
        &self.activity
    }
}

/// Plans the withdrawal of `bid` from `task` by `actor`.
///
/// # Errors
///
/// Returns [`TransitionError::InvalidState`] unless the task is open,
/// [`TransitionError::BidNotOnTask`] for a bid of another task,
/// [`TransitionError::NotBidOwner`] when `actor` did not place the bid, and
/// [`TransitionError::BidNotPending`] when it was already settled.
pub fn plan_withdrawal(
    task: &Task,
    bid: &Bid,
    actor: &AgentAddress,
    now: DateTime<Utc>,
) -> Result<WithdrawalPlan, TransitionError> {
    if task.status() != TaskStatus::Open {
        return Err(TransitionError::InvalidState {
            task_id: task.id(),
            action: ActivityAction::WithdrewBid,
            current: task.status(),
            required: TaskStatus::Open,
        });
    }
    if bid.task_id() != task.id() {
        return Err(TransitionError::BidNotOnTask {
            task_id: task.id(),
            bid_id: bid.id(),
        });
    }
    if bid.bidder() != actor {
        return Err(TransitionError::NotBidOwner {
            bid_id: bid.id(),
            actor: actor.clone(),
        });
    }
    if bid.status() != BidStatus::Pending {
        return Err(TransitionError::BidNotPending {
            bid_id: bid.id(),
            status: bid.status(),
        });
    }

    Ok(WithdrawalPlan {
        task_id: task.id(),
        bid_id: bid.id(),
        bidder: actor.clone(),
        activity: ActivityEntry::new(
            actor.clone(),
            ActivityAction::WithdrewBid,
            format!("Withdrew bid #{}", bid.id()),
            now,
        ),
    })
}
