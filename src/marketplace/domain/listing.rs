//! Read-side projections for the task board.

use super::{AgentAddress, Task, TaskStatus};
use serde::Serialize;

/// Optional criteria narrowing a task listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    status: Option<TaskStatus>,
    poster: Option<AgentAddress>,
    tag: Option<String>,
}

impl TaskFilter {
    /// Creates a filter matching every task.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the listing to one status.
    #[must_use]
    pub const fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Restricts the listing to one poster.
    #[must_use]
    pub fn with_poster(mut self, poster: AgentAddress) -> Self {
        self.poster = Some(poster);
        self
    }

    /// Restricts the listing to tasks carrying `tag`, compared
    /// case-insensitively.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into().trim().to_ascii_lowercase());
        self
    }

    /// Returns the status criterion.
    #[must_use]
    pub const fn status(&self) -> Option<TaskStatus> {
        self.status
    }

    /// Returns the poster criterion.
    #[must_use]
    pub const fn poster(&self) -> Option<&AgentAddress> {
        self.poster.as_ref()
    }

    /// Returns the normalized tag criterion.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Returns whether `task` satisfies every criterion.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        self.status.is_none_or(|status| task.status() == status)
            && self.poster.as_ref().is_none_or(|poster| task.poster() == poster)
            && self
                .tag
                .as_deref()
                .is_none_or(|tag| task.tags().iter().any(|candidate| candidate == tag))
    }
}

/// Window into an ordered listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    limit: usize,
    offset: usize,
}

impl PageRequest {
    /// Creates a page request; callers clamp `limit` beforehand.
    #[must_use]
    pub const fn new(limit: usize, offset: usize) -> Self {
        Self { limit, offset }
    }

    /// Returns the maximum number of items.
    #[must_use]
    pub const fn limit(self) -> usize {
        self.limit
    }

    /// Returns the number of items skipped.
    #[must_use]
    pub const fn offset(self) -> usize {
        self.offset
    }
}

/// One page of a listing together with the unpaged total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    items: Vec<T>,
    total: u64,
    offset: usize,
}

impl<T> Page<T> {
    /// Creates a page.
    #[must_use]
    pub const fn new(items: Vec<T>, total: u64, offset: usize) -> Self {
        Self {
            items,
            total,
            offset,
        }
    }

    /// Returns the page items.
    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Consumes the page, returning its items.
    #[must_use]
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// Returns the number of matching items across all pages.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// Returns whether items exist past this page.
    #[must_use]
    pub fn has_more(&self) -> bool {
        let seen = u64::try_from(self.offset.saturating_add(self.items.len())).unwrap_or(u64::MAX);
        seen < self.total
    }
}

/// Task row of the board listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskSummary {
    task: Task,
    pending_bids: u64,
}

impl TaskSummary {
    /// Creates a summary.
    #[must_use]
    pub const fn new(task: Task, pending_bids: u64) -> Self {
        Self { task, pending_bids }
    }

    /// Returns the task.
    #[must_use]
    pub const fn task(&self) -> &Task {
        &self.task
    }

    /// Returns the live count of pending bids.
    #[must_use]
    pub const fn pending_bids(&self) -> u64 {
        self.pending_bids
    }
}

/// Aggregate board counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BoardStats {
    /// Number of tasks ever posted.
    pub total_tasks: u64,
    /// Tasks accepting bids.
    pub open_tasks: u64,
    /// Tasks with an assigned worker still working.
    pub assigned_tasks: u64,
    /// Tasks whose work was approved (verified or paid).
    pub completed_tasks: u64,
    /// Bounty sats across tasks that were not cancelled.
    pub total_bounty_sats: u64,
    /// Bounty sats across approved tasks.
    pub paid_out_sats: u64,
    /// Agents in the ledger.
    pub agent_count: u64,
    /// Bids ever placed.
    pub bid_count: u64,
}
