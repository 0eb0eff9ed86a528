//! In-memory marketplace store for tests and single-process deployments.
//!
//! One lock guards every table, so each guarded check and its dependent
//! batch run under the same write guard and are atomic with respect to
//! concurrent callers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::marketplace::{
    domain::{
        ActivityRecord, Agent, AgentAddress, AgentProfile, Bid, BidId, BidPlan, BidStatus,
        BoardStats, CreationPlan, LedgerDelta, Page, PageRequest, Task, TaskFilter, TaskId,
        TaskStatus, TaskSummary, TransitionOutcome, WithdrawalPlan,
    },
    ports::{AgentRepository, RepositoryError, RepositoryResult, TaskRepository},
};

/// Thread-safe in-memory marketplace implementing both repository ports.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMarketplace {
    state: Arc<RwLock<MarketplaceState>>,
}

#[derive(Debug, Default)]
struct MarketplaceState {
    tasks: BTreeMap<TaskId, Task>,
    bids: BTreeMap<BidId, Bid>,
    activity: Vec<ActivityRecord>,
    agents: HashMap<AgentAddress, Agent>,
    last_task_id: i64,
    last_bid_id: i64,
}

impl InMemoryMarketplace {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RepositoryResult<RwLockReadGuard<'_, MarketplaceState>> {
        self.state.read().map_err(|err| {
            RepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }

    fn write(&self) -> RepositoryResult<RwLockWriteGuard<'_, MarketplaceState>> {
        self.state.write().map_err(|err| {
            RepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }
}

impl MarketplaceState {
    fn next_task_id(&mut self) -> RepositoryResult<TaskId> {
        let candidate = self.last_task_id.saturating_add(1);
        let id = TaskId::new(candidate).map_err(RepositoryError::invalid_persisted_data)?;
        self.last_task_id = candidate;
        Ok(id)
    }

    fn next_bid_id(&mut self) -> RepositoryResult<BidId> {
        let candidate = self.last_bid_id.saturating_add(1);
        let id = BidId::new(candidate).map_err(RepositoryError::invalid_persisted_data)?;
        self.last_bid_id = candidate;
        Ok(id)
    }

    fn apply_ledger(&mut self, deltas: &[LedgerDelta], now: DateTime<Utc>) {
        for delta in deltas {
            self.agents
                .entry(delta.address().clone())
                .or_insert_with(|| Agent::register(AgentProfile::new(delta.address().clone()), now))
                .apply(delta);
        }
    }

    fn pending_bids(&self, task_id: TaskId) -> u64 {
        let count = self
            .bids
            .values()
            .filter(|bid| bid.task_id() == task_id && bid.status() == BidStatus::Pending)
            .count();
        to_count(count)
    }

    fn newest_tasks_where(&self, predicate: impl Fn(&Task) -> bool) -> Vec<Task> {
        self.tasks
            .values()
            .rev()
            .filter(|task| predicate(task))
            .cloned()
            .collect()
    }
}

fn to_count(value: usize) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

#[async_trait]
impl TaskRepository for InMemoryMarketplace {
    async fn create_task(&self, plan: &CreationPlan) -> RepositoryResult<Task> {
        let mut state = self.write()?;
        let id = state.next_task_id()?;
        let task = Task::from_new(id, plan.task().clone());

        state.tasks.insert(id, task.clone());
        state.apply_ledger(plan.ledger(), task.created_at());
        state.activity.push(plan.activity().clone().attach(id));
        Ok(task)
    }

    async fn find_task(&self, id: TaskId) -> RepositoryResult<Option<Task>> {
        let state = self.read()?;
        Ok(state.tasks.get(&id).cloned())
    }

    async fn list_tasks(
        &self,
        filter: &TaskFilter,
        page: PageRequest,
    ) -> RepositoryResult<Page<TaskSummary>> {
        let state = self.read()?;
        let matching = state.newest_tasks_where(|task| filter.matches(task));
        let total = to_count(matching.len());
        let items = matching
            .into_iter()
            .skip(page.offset())
            .take(page.limit())
            .map(|task| {
                let pending = state.pending_bids(task.id());
                TaskSummary::new(task, pending)
            })
            .collect();
        Ok(Page::new(items, total, page.offset()))
    }

    async fn tasks_posted_by(&self, address: &AgentAddress) -> RepositoryResult<Vec<Task>> {
        let state = self.read()?;
        Ok(state.newest_tasks_where(|task| task.poster() == address))
    }

    async fn tasks_worked_by(&self, address: &AgentAddress) -> RepositoryResult<Vec<Task>> {
        let state = self.read()?;
        Ok(state.newest_tasks_where(|task| task.worker() == Some(address)))
    }

    async fn place_bid(&self, plan: &BidPlan) -> RepositoryResult<Bid> {
        let mut state = self.write()?;
        let new_bid = plan.bid();
        let task = state
            .tasks
            .get(&new_bid.task_id())
            .ok_or(RepositoryError::TaskNotFound(new_bid.task_id()))?;
        if task.status() != TaskStatus::Open || task.poster() == new_bid.bidder() {
            return Err(RepositoryError::TransitionConflict {
                task_id: new_bid.task_id(),
                expected: TaskStatus::Open,
            });
        }

        let id = state.next_bid_id()?;
        let bid = Bid::from_new(id, new_bid.clone());
        state.bids.insert(id, bid.clone());
        state
            .activity
            .push(plan.activity().clone().attach(new_bid.task_id()));
        Ok(bid)
    }

    async fn find_bid(&self, id: BidId) -> RepositoryResult<Option<Bid>> {
        let state = self.read()?;
        Ok(state.bids.get(&id).cloned())
    }

    async fn list_bids(&self, task_id: TaskId) -> RepositoryResult<Vec<Bid>> {
        let state = self.read()?;
        let mut bids: Vec<Bid> = state
            .bids
            .values()
            .filter(|bid| bid.task_id() == task_id)
            .cloned()
            .collect();
        bids.sort_by_key(|bid| (bid.created_at(), bid.id()));
        Ok(bids)
    }

    async fn pending_bid_count(&self, task_id: TaskId) -> RepositoryResult<u64> {
        let state = self.read()?;
        Ok(state.pending_bids(task_id))
    }

    async fn list_activity(&self, task_id: TaskId) -> RepositoryResult<Vec<ActivityRecord>> {
        let state = self.read()?;
        Ok(state
            .activity
            .iter()
            .filter(|record| record.task_id() == task_id)
            .cloned()
            .collect())
    }

    async fn commit_transition(&self, outcome: &TransitionOutcome) -> RepositoryResult<()> {
        let mut state = self.write()?;
        let guard = outcome.guard();
        let task_id = guard.task_id();

        let stored = state
            .tasks
            .get(&task_id)
            .ok_or(RepositoryError::TaskNotFound(task_id))?;
        if !guard.admits(stored) {
            return Err(RepositoryError::TransitionConflict {
                task_id,
                expected: guard.expected_status(),
            });
        }
        if let Some(cascade) = outcome.cascade() {
            let still_pending = state.bids.get(&cascade.accepted()).is_some_and(|bid| {
                bid.task_id() == task_id && bid.status() == BidStatus::Pending
            });
            if !still_pending {
                return Err(RepositoryError::BidConflict(cascade.accepted()));
            }
        }

        // Guard confirmed; the dependent batch cannot fail from here on.
        state.tasks.insert(task_id, outcome.task().clone());
        if let Some(cascade) = outcome.cascade() {
            for bid in state.bids.values_mut() {
                if let Some(status) = cascade.disposition_for(bid) {
                    bid.set_status(status);
                }
            }
        }
        state.apply_ledger(outcome.ledger(), outcome.activity().created_at());
        state.activity.push(outcome.activity().clone().attach(task_id));
        Ok(())
    }

    async fn commit_withdrawal(&self, plan: &WithdrawalPlan) -> RepositoryResult<Bid> {
        let mut state = self.write()?;
        let task_open = state
            .tasks
            .get(&plan.task_id())
            .is_some_and(|task| task.status() == TaskStatus::Open);
        let bid = state
            .bids
            .get_mut(&plan.bid_id())
            .filter(|bid| {
                task_open
                    && bid.task_id() == plan.task_id()
                    && bid.bidder() == plan.bidder()
                    && bid.status() == BidStatus::Pending
            })
            .ok_or(RepositoryError::BidConflict(plan.bid_id()))?;
        bid.set_status(BidStatus::Withdrawn);
        let withdrawn = bid.clone();

        state
            .activity
            .push(plan.activity().clone().attach(plan.task_id()));
        Ok(withdrawn)
    }

    async fn stats(&self) -> RepositoryResult<BoardStats> {
        let state = self.read()?;
        let mut stats = BoardStats {
            total_tasks: to_count(state.tasks.len()),
            agent_count: to_count(state.agents.len()),
            bid_count: to_count(state.bids.len()),
            ..BoardStats::default()
        };
        for task in state.tasks.values() {
            let bounty = task.bounty().value();
            match task.status() {
                TaskStatus::Open => stats.open_tasks += 1,
                TaskStatus::Assigned => stats.assigned_tasks += 1,
                status if status.is_completed() => {
                    stats.completed_tasks += 1;
                    stats.paid_out_sats = stats.paid_out_sats.saturating_add(bounty);
                }
                _ => {}
            }
            if task.status() != TaskStatus::Cancelled {
                stats.total_bounty_sats = stats.total_bounty_sats.saturating_add(bounty);
            }
        }
        Ok(stats)
    }
}

#[async_trait]
impl AgentRepository for InMemoryMarketplace {
    async fn upsert(&self, profile: &AgentProfile, now: DateTime<Utc>) -> RepositoryResult<Agent> {
        let mut state = self.write()?;
        let agent = state
            .agents
            .entry(profile.address().clone())
            .and_modify(|existing| existing.merge_profile(profile))
            .or_insert_with(|| Agent::register(profile.clone(), now));
        Ok(agent.clone())
    }

    async fn find_agent(&self, address: &AgentAddress) -> RepositoryResult<Option<Agent>> {
        let state = self.read()?;
        Ok(state.agents.get(address).cloned())
    }

    async fn list_ranked(&self) -> RepositoryResult<Vec<Agent>> {
        let state = self.read()?;
        let mut agents: Vec<Agent> = state.agents.values().cloned().collect();
        agents.sort_by(|left, right| {
            right
                .reputation()
                .cmp(&left.reputation())
                .then_with(|| right.tasks_completed().cmp(&left.tasks_completed()))
                .then_with(|| left.first_seen().cmp(&right.first_seen()))
                .then_with(|| left.address().cmp(right.address()))
        });
        Ok(agents)
    }
}
