//! Service layer for every state-changing marketplace operation.
//!
//! Each operation authenticates the actor for one action, plans the change
//! with the pure state machine and hands the plan to the repository, which
//! applies it atomically or reports a conflict.

use super::{
    error::{MarketplaceError, MarketplaceResult},
    ledger::AgentLedgerService,
};
use crate::auth::domain::{AuthenticatedActor, MarketplaceAction};
use crate::marketplace::{
    domain::{
        AgentAddress, AgentProfile, Bid, BidId, NewTask, PaymentReference, Sats, Task, TaskEvent,
        TaskId, WorkProof, transition,
    },
    ports::{AgentRepository, RepositoryError, TaskRepository},
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use std::sync::Arc;
use tracing::{info, warn};

/// Optional identity details an agent may attach to a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ProfileDetails {
    display_name: Option<String>,
    secondary_address: Option<String>,
}

impl ProfileDetails {
    fn profile_for(&self, address: &AgentAddress) -> MarketplaceResult<AgentProfile> {
        let mut profile = AgentProfile::new(address.clone());
        if let Some(name) = &self.display_name {
            profile = profile.with_display_name(name.as_str());
        }
        if let Some(secondary) = &self.secondary_address {
            profile = profile.with_secondary_address(AgentAddress::new(secondary.as_str())?);
        }
        Ok(profile)
    }
}

/// Request payload for posting a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTaskRequest {
    title: String,
    description: String,
    bounty_sats: u64,
    tags: Vec<String>,
    deadline: Option<DateTime<Utc>>,
    profile: ProfileDetails,
}

impl CreateTaskRequest {
    /// Creates a request with required task fields.
    #[must_use]
    pub fn new(title: impl Into<String>, description: impl Into<String>, bounty_sats: u64) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            bounty_sats,
            tags: Vec::new(),
            deadline: None,
            profile: ProfileDetails::default(),
        }
    }

    /// Sets task tags.
    #[must_use]
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = String>) -> Self {
        self.tags = tags.into_iter().collect();
        self
    }

    /// Sets the task deadline.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets the poster's display name.
    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.profile.display_name = Some(display_name.into());
        self
    }

    /// Sets the poster's secondary address.
    #[must_use]
    pub fn with_secondary_address(mut self, secondary_address: impl Into<String>) -> Self {
        self.profile.secondary_address = Some(secondary_address.into());
        self
    }
}

/// Request payload for bidding on a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceBidRequest {
    task_id: TaskId,
    amount_sats: u64,
    message: Option<String>,
    profile: ProfileDetails,
}

impl PlaceBidRequest {
    /// Creates a bid request.
    #[must_use]
    pub fn new(task_id: TaskId, amount_sats: u64) -> Self {
        Self {
            task_id,
            amount_sats,
            message: None,
            profile: ProfileDetails::default(),
        }
    }

    /// Sets the message shown to the poster.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Sets the bidder's display name.
    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.profile.display_name = Some(display_name.into());
        self
    }

    /// Sets the bidder's secondary address.
    #[must_use]
    pub fn with_secondary_address(mut self, secondary_address: impl Into<String>) -> Self {
        self.profile.secondary_address = Some(secondary_address.into());
        self
    }
}

/// Request payload for submitting proof of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitWorkRequest {
    task_id: TaskId,
    proof_url: String,
    description: Option<String>,
}

impl SubmitWorkRequest {
    /// Creates a submission with the proof URL.
    #[must_use]
    pub fn new(task_id: TaskId, proof_url: impl Into<String>) -> Self {
        Self {
            task_id,
            proof_url: proof_url.into(),
            description: None,
        }
    }

    /// Sets the proof description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Request payload for the poster's verdict on submitted work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyWorkRequest {
    task_id: TaskId,
    approved: bool,
    payment_tx: Option<String>,
    reason: Option<String>,
}

impl VerifyWorkRequest {
    /// Approves the submitted work.
    #[must_use]
    pub const fn approve(task_id: TaskId) -> Self {
        Self {
            task_id,
            approved: true,
            payment_tx: None,
            reason: None,
        }
    }

    /// Rejects the submitted work, disputing the task.
    #[must_use]
    pub const fn reject(task_id: TaskId) -> Self {
        Self {
            task_id,
            approved: false,
            payment_tx: None,
            reason: None,
        }
    }

    /// Sets the settlement reference; approval then marks the task paid.
    #[must_use]
    pub fn with_payment_tx(mut self, payment_tx: impl Into<String>) -> Self {
        self.payment_tx = Some(payment_tx.into());
        self
    }

    /// Sets the rejection reason recorded in the activity log.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    fn into_event(self) -> MarketplaceResult<TaskEvent> {
        if !self.approved {
            return Ok(TaskEvent::RejectWork {
                reason: self.reason,
            });
        }
        let payment_tx = self
            .payment_tx
            .filter(|tx| !tx.trim().is_empty())
            .map(PaymentReference::new)
            .transpose()?;
        Ok(TaskEvent::ApproveWork { payment_tx })
    }
}

/// Task lifecycle orchestration service.
#[derive(Clone)]
pub struct TaskLifecycleService<T, A, C>
where
    T: TaskRepository,
    A: AgentRepository,
    C: Clock + Send + Sync,
{
    tasks: Arc<T>,
    ledger: AgentLedgerService<A, C>,
    clock: Arc<C>,
}

impl<T, A, C> TaskLifecycleService<T, A, C>
where
    T: TaskRepository,
    A: AgentRepository,
    C: Clock + Send + Sync,
{
    /// Creates a new task lifecycle service.
    #[must_use]
    pub fn new(tasks: Arc<T>, agents: Arc<A>, clock: Arc<C>) -> Self {
        Self {
            tasks,
            ledger: AgentLedgerService::new(agents, Arc::clone(&clock)),
            clock,
        }
    }

    /// Posts a new open task with the actor as poster.
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceError`] when authentication or validation fails
    /// or the repository rejects persistence.
    pub async fn create_task(
        &self,
        actor: &AuthenticatedActor,
        request: CreateTaskRequest,
    ) -> MarketplaceResult<Task> {
        let poster = actor.require(MarketplaceAction::CreateTask)?;
        let profile = request.profile.profile_for(poster)?;
        let bounty = Sats::new(request.bounty_sats)?;
        let mut draft = NewTask::new(
            poster.clone(),
            request.title,
            request.description,
            bounty,
            self.clock.utc(),
        )?
        .with_tags(request.tags)?;
        if let Some(deadline) = request.deadline {
            draft = draft.with_deadline(deadline);
        }

        self.ledger.get_or_create(&profile).await?;
        let task = self
            .tasks
            .create_task(&transition::plan_creation(draft))
            .await?;
        info!(
            task_id = %task.id(),
            actor = %poster,
            bounty = task.bounty().value(),
            "task created"
        );
        Ok(task)
    }

    /// Places a pending bid on an open task.
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceError`] when the task is missing or not open,
    /// the actor posted the task, or the task closed before the bid landed.
    pub async fn place_bid(
        &self,
        actor: &AuthenticatedActor,
        request: PlaceBidRequest,
    ) -> MarketplaceResult<Bid> {
        let bidder = actor.require(MarketplaceAction::PlaceBid)?;
        let profile = request.profile.profile_for(bidder)?;
        let amount = Sats::new(request.amount_sats)?;
        let task = self.load_task(request.task_id).await?;
        let plan = transition::plan_bid(&task, bidder, amount, request.message, self.clock.utc())?;

        self.ledger.get_or_create(&profile).await?;
        let bid = self
            .tasks
            .place_bid(&plan)
            .await
            .map_err(|err| lost_race(task.id(), bidder, err))?;
        info!(task_id = %task.id(), bid_id = %bid.id(), actor = %bidder, "bid placed");
        Ok(bid)
    }

    /// Withdraws the actor's own pending bid from an open task.
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceError`] when the task or bid is missing, the bid
    /// belongs to someone else or another task, or it was settled first.
    pub async fn withdraw_bid(
        &self,
        actor: &AuthenticatedActor,
        task_id: TaskId,
        bid_id: BidId,
    ) -> MarketplaceResult<Bid> {
        let bidder = actor.require(MarketplaceAction::WithdrawBid)?;
        let task = self.load_task(task_id).await?;
        let bid = self.load_bid(bid_id).await?;
        let plan = transition::plan_withdrawal(&task, &bid, bidder, self.clock.utc())?;

        let withdrawn = self
            .tasks
            .commit_withdrawal(&plan)
            .await
            .map_err(|err| lost_race(task_id, bidder, err))?;
        info!(task_id = %task_id, bid_id = %bid_id, actor = %bidder, "bid withdrawn");
        Ok(withdrawn)
    }

    /// Accepts a pending bid, assigning its bidder as worker.
    ///
    /// The task's bounty becomes the bid amount; sibling pending bids are
    /// rejected in the same atomic write. The returned task names the
    /// worker.
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceError`] when the actor is not the poster, the
    /// task is not open, the bid is missing, foreign or settled, or a
    /// concurrent caller changed the task first.
    pub async fn accept_bid(
        &self,
        actor: &AuthenticatedActor,
        task_id: TaskId,
        bid_id: BidId,
    ) -> MarketplaceResult<Task> {
        let poster = actor.require(MarketplaceAction::AcceptBid)?;
        let task = self.load_task(task_id).await?;
        let bid = self.load_bid(bid_id).await?;
        self.commit(poster, &task, TaskEvent::AcceptBid(bid)).await
    }

    /// Submits proof of work on an assigned task.
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceError`] when the proof URL is blank, the actor
    /// is not the worker, or the task is not assigned.
    pub async fn submit_work(
        &self,
        actor: &AuthenticatedActor,
        request: SubmitWorkRequest,
    ) -> MarketplaceResult<Task> {
        let worker = actor.require(MarketplaceAction::SubmitWork)?;
        let proof = WorkProof::new(request.proof_url, request.description)?;
        let task = self.load_task(request.task_id).await?;
        self.commit(worker, &task, TaskEvent::SubmitWork(proof)).await
    }

    /// Records the poster's verdict on submitted work.
    ///
    /// Approval completes the task (paid when a payment reference is given,
    /// verified otherwise) and credits both parties' ledgers; rejection
    /// disputes it without ledger changes.
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceError`] when the actor is not the poster, the
    /// task is not submitted, or the payment reference is malformed.
    pub async fn verify_work(
        &self,
        actor: &AuthenticatedActor,
        request: VerifyWorkRequest,
    ) -> MarketplaceResult<Task> {
        let poster = actor.require(MarketplaceAction::VerifyWork)?;
        let task_id = request.task_id;
        let event = request.into_event()?;
        let task = self.load_task(task_id).await?;
        self.commit(poster, &task, event).await
    }

    /// Cancels an open task, releasing its bounty from the poster's spend.
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceError`] when the actor is not the poster or the
    /// task is no longer open.
    pub async fn cancel_task(
        &self,
        actor: &AuthenticatedActor,
        task_id: TaskId,
    ) -> MarketplaceResult<Task> {
        let poster = actor.require(MarketplaceAction::CancelTask)?;
        let task = self.load_task(task_id).await?;
        self.commit(poster, &task, TaskEvent::Cancel).await
    }

    async fn commit(
        &self,
        actor: &AgentAddress,
        task: &Task,
        event: TaskEvent,
    ) -> MarketplaceResult<Task> {
        let outcome = transition::apply(task, actor, event, self.clock.utc())?;
        self.tasks
            .commit_transition(&outcome)
            .await
            .map_err(|err| lost_race(task.id(), actor, err))?;

        let updated = outcome.into_task();
        info!(
            task_id = %updated.id(),
            actor = %actor,
            from = %task.status(),
            to = %updated.status(),
            "task transition committed"
        );
        Ok(updated)
    }

    async fn load_task(&self, task_id: TaskId) -> MarketplaceResult<Task> {
        self.tasks
            .find_task(task_id)
            .await?
            .ok_or(MarketplaceError::TaskNotFound(task_id))
    }

    async fn load_bid(&self, bid_id: BidId) -> MarketplaceResult<Bid> {
        self.tasks
            .find_bid(bid_id)
            .await?
            .ok_or(MarketplaceError::BidNotFound(bid_id))
    }
}

fn lost_race(task_id: TaskId, actor: &AgentAddress, err: RepositoryError) -> MarketplaceError {
    if err.is_conflict() {
        warn!(task_id = %task_id, actor = %actor, error = %err, "write guard no longer held");
    }
    MarketplaceError::Repository(err)
}
