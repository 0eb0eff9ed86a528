//! Diesel row models for marketplace persistence.

use super::schema::{agents, bids, task_activity, tasks};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Nullable, Text, Timestamptz, Varchar};

/// Query result row for task records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskRow {
    /// Task identifier.
    pub id: i64,
    /// Poster address.
    pub poster: String,
    /// Title.
    pub title: String,
    /// Description.
    pub description: String,
    /// Bounty in sats.
    pub bounty_sats: i64,
    /// Lifecycle status.
    pub status: String,
    /// Normalized tags.
    pub tags: Vec<String>,
    /// Optional deadline.
    pub deadline: Option<DateTime<Utc>>,
    /// Assigned worker.
    pub worker: Option<String>,
    /// Proof URL.
    pub proof_url: Option<String>,
    /// Proof description.
    pub proof_description: Option<String>,
    /// Payment reference.
    pub payment_tx: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Insert model for task records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = tasks)]
pub struct NewTaskRow {
    /// Poster address.
    pub poster: String,
    /// Title.
    pub title: String,
    /// Description.
    pub description: String,
    /// Bounty in sats.
    pub bounty_sats: i64,
    /// Lifecycle status.
    pub status: String,
    /// Normalized tags.
    pub tags: Vec<String>,
    /// Optional deadline.
    pub deadline: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Lifecycle columns rewritten by a guarded transition.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = tasks)]
#[diesel(treat_none_as_null = true)]
pub struct TaskStateChangeset {
    /// Bounty, replaced by the accepted bid amount.
    pub bounty_sats: i64,
    /// New lifecycle status.
    pub status: String,
    /// Assigned worker.
    pub worker: Option<String>,
    /// Proof URL.
    pub proof_url: Option<String>,
    /// Proof description.
    pub proof_description: Option<String>,
    /// Payment reference.
    pub payment_tx: Option<String>,
    /// Transition timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Query result row for bid records.
#[derive(Debug, Clone, Queryable, QueryableByName, Selectable)]
#[diesel(table_name = bids)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BidRow {
    /// Bid identifier.
    #[diesel(sql_type = BigInt)]
    pub id: i64,
    /// Owning task.
    #[diesel(sql_type = BigInt)]
    pub task_id: i64,
    /// Bidder address.
    #[diesel(sql_type = Varchar)]
    pub bidder: String,
    /// Offered amount.
    #[diesel(sql_type = BigInt)]
    pub amount_sats: i64,
    /// Optional message.
    #[diesel(sql_type = Nullable<Text>)]
    pub message: Option<String>,
    /// Bid status.
    #[diesel(sql_type = Varchar)]
    pub status: String,
    /// Creation timestamp.
    #[diesel(sql_type = Timestamptz)]
    pub created_at: DateTime<Utc>,
}

/// Query result row for activity records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = task_activity)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ActivityRow {
    /// Owning task.
    pub task_id: i64,
    /// Acting agent.
    pub actor: String,
    /// Action label.
    pub action: String,
    /// Free-text details.
    pub details: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Insert model for activity records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = task_activity)]
pub struct NewActivityRow {
    /// Owning task.
    pub task_id: i64,
    /// Acting agent.
    pub actor: String,
    /// Action label.
    pub action: String,
    /// Free-text details.
    pub details: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Query result row for agent records.
#[derive(Debug, Clone, Queryable, QueryableByName, Selectable)]
#[diesel(table_name = agents)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AgentRow {
    /// Primary address.
    #[diesel(sql_type = Varchar)]
    pub address: String,
    /// Display name.
    #[diesel(sql_type = Nullable<Text>)]
    pub display_name: Option<String>,
    /// Secondary address.
    #[diesel(sql_type = Nullable<Varchar>)]
    pub secondary_address: Option<String>,
    /// Reputation.
    #[diesel(sql_type = BigInt)]
    pub reputation: i64,
    /// Posted-task count.
    #[diesel(sql_type = BigInt)]
    pub tasks_posted: i64,
    /// Completed-task count.
    #[diesel(sql_type = BigInt)]
    pub tasks_completed: i64,
    /// Earned sats.
    #[diesel(sql_type = BigInt)]
    pub total_earned_sats: i64,
    /// Spent sats.
    #[diesel(sql_type = BigInt)]
    pub total_spent_sats: i64,
    /// First-seen timestamp.
    #[diesel(sql_type = Timestamptz)]
    pub first_seen: DateTime<Utc>,
}

/// Insert model for a zeroed agent entry; counters take column defaults.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = agents)]
pub struct NewAgentRow {
    /// Primary address.
    pub address: String,
    /// First-seen timestamp.
    pub first_seen: DateTime<Utc>,
}

/// Aggregate counters returned by the stats query.
#[derive(Debug, Clone, QueryableByName)]
pub struct StatsRow {
    /// Number of tasks.
    #[diesel(sql_type = BigInt)]
    pub total_tasks: i64,
    /// Open tasks.
    #[diesel(sql_type = BigInt)]
    pub open_tasks: i64,
    /// Assigned tasks.
    #[diesel(sql_type = BigInt)]
    pub assigned_tasks: i64,
    /// Verified or paid tasks.
    #[diesel(sql_type = BigInt)]
    pub completed_tasks: i64,
    /// Bounty across non-cancelled tasks.
    #[diesel(sql_type = BigInt)]
    pub total_bounty_sats: i64,
    /// Bounty across approved tasks.
    #[diesel(sql_type = BigInt)]
    pub paid_out_sats: i64,
    /// Agents in the ledger.
    #[diesel(sql_type = BigInt)]
    pub agent_count: i64,
    /// Bids ever placed.
    #[diesel(sql_type = BigInt)]
    pub bid_count: i64,
}
