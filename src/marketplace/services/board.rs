//! Read-side queries for the task board.

use super::error::{MarketplaceError, MarketplaceResult};
use crate::config::BoardConfig;
use crate::marketplace::{
    domain::{
        ActivityRecord, Agent, AgentAddress, Bid, BoardStats, Page, PageRequest, Task, TaskFilter,
        TaskId, TaskSummary,
    },
    ports::{AgentRepository, TaskRepository},
};
use std::sync::Arc;
use tracing::debug;

/// A task with its bids (oldest first) and activity log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDetail {
    /// The task.
    pub task: Task,
    /// Every bid on the task, oldest first.
    pub bids: Vec<Bid>,
    /// The task's audit trail, oldest first.
    pub activity: Vec<ActivityRecord>,
}

/// An agent with the tasks they posted and worked on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentDetail {
    /// The agent's ledger entry.
    pub agent: Agent,
    /// Tasks the agent posted, newest first.
    pub tasks_posted: Vec<Task>,
    /// Tasks the agent was assigned, newest first.
    pub tasks_worked: Vec<Task>,
}

/// Read-only board query service.
#[derive(Clone)]
pub struct BoardQueryService<T, A>
where
    T: TaskRepository,
    A: AgentRepository,
{
    tasks: Arc<T>,
    agents: Arc<A>,
    config: BoardConfig,
}

impl<T, A> BoardQueryService<T, A>
where
    T: TaskRepository,
    A: AgentRepository,
{
    /// Creates a new board query service.
    #[must_use]
    pub const fn new(tasks: Arc<T>, agents: Arc<A>, config: BoardConfig) -> Self {
        Self {
            tasks,
            agents,
            config,
        }
    }

    /// Lists tasks matching `filter`, newest first.
    ///
    /// `limit` is clamped by [`BoardConfig::clamp_limit`].
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceError::Repository`] when persistence fails.
    pub async fn list_tasks(
        &self,
        filter: &TaskFilter,
        limit: Option<usize>,
        offset: usize,
    ) -> MarketplaceResult<Page<TaskSummary>> {
        let page = PageRequest::new(self.config.clamp_limit(limit), offset);
        let listing = self.tasks.list_tasks(filter, page).await?;
        debug!(
            total = listing.total(),
            returned = listing.items().len(),
            offset,
            "tasks listed"
        );
        Ok(listing)
    }

    /// Returns a task with its bids and activity.
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceError::TaskNotFound`] for unknown ids.
    pub async fn get_task(&self, task_id: TaskId) -> MarketplaceResult<TaskDetail> {
        let task = self
            .tasks
            .find_task(task_id)
            .await?
            .ok_or(MarketplaceError::TaskNotFound(task_id))?;
        let bids = self.tasks.list_bids(task_id).await?;
        let activity = self.tasks.list_activity(task_id).await?;
        Ok(TaskDetail {
            task,
            bids,
            activity,
        })
    }

    /// Returns the live number of pending bids on a task.
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceError::Repository`] when persistence fails.
    pub async fn pending_bid_count(&self, task_id: TaskId) -> MarketplaceResult<u64> {
        Ok(self.tasks.pending_bid_count(task_id).await?)
    }

    /// Lists agents by reputation, then completed tasks, descending.
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceError::Repository`] when persistence fails.
    pub async fn list_agents(&self) -> MarketplaceResult<Vec<Agent>> {
        Ok(self.agents.list_ranked().await?)
    }

    /// Returns an agent with their posted and worked tasks.
    ///
    /// Looking an agent up never creates it.
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceError::Domain`] for malformed addresses and
    /// [`MarketplaceError::AgentNotFound`] for unknown ones.
    pub async fn get_agent(&self, raw_address: &str) -> MarketplaceResult<AgentDetail> {
        let address = AgentAddress::new(raw_address)?;
        let agent = self
            .agents
            .find_agent(&address)
            .await?
            .ok_or_else(|| MarketplaceError::AgentNotFound(address.clone()))?;
        let tasks_posted = self.tasks.tasks_posted_by(&address).await?;
        let tasks_worked = self.tasks.tasks_worked_by(&address).await?;
        Ok(AgentDetail {
            agent,
            tasks_posted,
            tasks_worked,
        })
    }

    /// Returns aggregate board counters.
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceError::Repository`] when persistence fails.
    pub async fn stats(&self) -> MarketplaceResult<BoardStats> {
        Ok(self.tasks.stats().await?)
    }
}
