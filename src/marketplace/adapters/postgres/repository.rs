//! `PostgreSQL` repository implementation for marketplace storage.
//!
//! Each write runs in one transaction. Lifecycle transitions start with a
//! conditional `UPDATE` of the task row filtered on the expected status and
//! role holder; the dependent batch runs only when that update matched a row,
//! so a lost race rolls back without side effects.

use super::{
    conversion::{
        activity_from_row, agent_from_row, bid_from_row, new_activity_row, new_task_row,
        state_changeset, stats_from_row, task_from_row, to_bigint,
    },
    models::{ActivityRow, AgentRow, BidRow, NewAgentRow, StatsRow, TaskRow},
    schema::{agents, bids, task_activity, tasks},
};
use crate::marketplace::{
    domain::{
        ActivityEntry, ActivityRecord, Agent, AgentAddress, AgentProfile, Bid, BidId, BidPlan,
        BidStatus, BoardStats, CreationPlan, LedgerDelta, Page, PageRequest, Task, TaskFilter,
        TaskId, TaskRole, TaskStatus, TaskSummary, TransitionOutcome, WithdrawalPlan,
    },
    ports::{AgentRepository, RepositoryError, RepositoryResult, TaskRepository},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::Error as DieselError;
use diesel::sql_types::{BigInt, Nullable, Text, Timestamptz, Varchar};
use std::collections::HashMap;

/// `PostgreSQL` connection pool type used by marketplace adapters.
pub type MarketplacePgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed marketplace implementing both repository ports.
#[derive(Debug, Clone)]
pub struct PostgresMarketplace {
    pool: MarketplacePgPool,
}

impl From<DieselError> for RepositoryError {
    fn from(err: DieselError) -> Self {
        Self::persistence(err)
    }
}

const INSERT_BID_SQL: &str = concat!(
    "INSERT INTO bids (task_id, bidder, amount_sats, message, status, created_at) ",
    "SELECT id, $2, $3, $4, 'pending', $5 FROM tasks ",
    "WHERE id = $1 AND status = 'open' AND poster <> $2 ",
    "FOR SHARE ",
    "RETURNING id, task_id, bidder, amount_sats, message, status, created_at",
);

const WITHDRAW_BID_SQL: &str = concat!(
    "UPDATE bids SET status = 'withdrawn' ",
    "WHERE id = $1 AND task_id = $2 AND bidder = $3 AND status = 'pending' ",
    "AND EXISTS (SELECT 1 FROM tasks WHERE id = $2 AND status = 'open' FOR SHARE) ",
    "RETURNING id, task_id, bidder, amount_sats, message, status, created_at",
);

const APPLY_DELTA_SQL: &str = concat!(
    "UPDATE agents SET ",
    "reputation = reputation + $2, ",
    "tasks_posted = tasks_posted + $3, ",
    "tasks_completed = tasks_completed + $4, ",
    "total_earned_sats = GREATEST(total_earned_sats + $5, 0), ",
    "total_spent_sats = GREATEST(total_spent_sats + $6, 0) ",
    "WHERE address = $1",
);

const UPSERT_AGENT_SQL: &str = concat!(
    "INSERT INTO agents (address, display_name, secondary_address, first_seen) ",
    "VALUES ($1, $2, $3, $4) ",
    "ON CONFLICT (address) DO UPDATE SET ",
    "display_name = COALESCE(EXCLUDED.display_name, agents.display_name), ",
    "secondary_address = COALESCE(EXCLUDED.secondary_address, agents.secondary_address) ",
    "RETURNING address, display_name, secondary_address, reputation, tasks_posted, ",
    "tasks_completed, total_earned_sats, total_spent_sats, first_seen",
);

const STATS_SQL: &str = concat!(
    "SELECT ",
    "(SELECT COUNT(*) FROM tasks) AS total_tasks, ",
    "(SELECT COUNT(*) FROM tasks WHERE status = 'open') AS open_tasks, ",
    "(SELECT COUNT(*) FROM tasks WHERE status = 'assigned') AS assigned_tasks, ",
    "(SELECT COUNT(*) FROM tasks WHERE status IN ('verified', 'paid')) AS completed_tasks, ",
    "(SELECT COALESCE(SUM(bounty_sats), 0)::BIGINT FROM tasks ",
    "WHERE status <> 'cancelled') AS total_bounty_sats, ",
    "(SELECT COALESCE(SUM(bounty_sats), 0)::BIGINT FROM tasks ",
    "WHERE status IN ('verified', 'paid')) AS paid_out_sats, ",
    "(SELECT COUNT(*) FROM agents) AS agent_count, ",
    "(SELECT COUNT(*) FROM bids) AS bid_count",
);

impl PostgresMarketplace {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: MarketplacePgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> RepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> RepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(RepositoryError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(RepositoryError::persistence)?
    }
}

#[async_trait]
impl TaskRepository for PostgresMarketplace {
    async fn create_task(&self, plan: &CreationPlan) -> RepositoryResult<Task> {
        let creation = plan.clone();
        self.run_blocking(move |connection| {
            connection.transaction(|conn| {
                apply_ledger(conn, creation.ledger(), creation.task().created_at())?;
                let row = diesel::insert_into(tasks::table)
                    .values(&new_task_row(creation.task()))
                    .returning(TaskRow::as_returning())
                    .get_result::<TaskRow>(conn)?;
                let task = task_from_row(row)?;
                insert_activity(conn, creation.activity(), task.id())?;
                Ok(task)
            })
        })
        .await
    }

    async fn find_task(&self, id: TaskId) -> RepositoryResult<Option<Task>> {
        self.run_blocking(move |connection| {
            let row = tasks::table
                .find(id.value())
                .select(TaskRow::as_select())
                .first::<TaskRow>(connection)
                .optional()?;
            row.map(task_from_row).transpose()
        })
        .await
    }

    async fn list_tasks(
        &self,
        filter: &TaskFilter,
        page: PageRequest,
    ) -> RepositoryResult<Page<TaskSummary>> {
        let criteria = filter.clone();
        self.run_blocking(move |connection| {
            connection.transaction(|conn| {
                let matching = filtered_tasks(&criteria).count().get_result::<i64>(conn)?;
                let rows = filtered_tasks(&criteria)
                    .select(TaskRow::as_select())
                    .order(tasks::id.desc())
                    .limit(i64::try_from(page.limit()).unwrap_or(i64::MAX))
                    .offset(i64::try_from(page.offset()).unwrap_or(i64::MAX))
                    .load::<TaskRow>(conn)?;
                let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
                let pending = pending_counts(conn, ids)?;

                let items = rows
                    .into_iter()
                    .map(|row| {
                        let count = pending.get(&row.id).copied().unwrap_or_default();
                        let task = task_from_row(row)?;
                        Ok(TaskSummary::new(task, u64::try_from(count).unwrap_or_default()))
                    })
                    .collect::<RepositoryResult<Vec<_>>>()?;
                let total =
                    u64::try_from(matching).map_err(RepositoryError::invalid_persisted_data)?;
                Ok(Page::new(items, total, page.offset()))
            })
        })
        .await
    }

    async fn tasks_posted_by(&self, address: &AgentAddress) -> RepositoryResult<Vec<Task>> {
        let poster = address.as_str().to_owned();
        self.run_blocking(move |connection| {
            let rows = tasks::table
                .filter(tasks::poster.eq(poster))
                .select(TaskRow::as_select())
                .order(tasks::id.desc())
                .load::<TaskRow>(connection)?;
            rows.into_iter().map(task_from_row).collect()
        })
        .await
    }

    async fn tasks_worked_by(&self, address: &AgentAddress) -> RepositoryResult<Vec<Task>> {
        let worker = address.as_str().to_owned();
        self.run_blocking(move |connection| {
            let rows = tasks::table
                .filter(tasks::worker.eq(worker))
                .select(TaskRow::as_select())
                .order(tasks::id.desc())
                .load::<TaskRow>(connection)?;
            rows.into_iter().map(task_from_row).collect()
        })
        .await
    }

    async fn place_bid(&self, plan: &BidPlan) -> RepositoryResult<Bid> {
        let bid_plan = plan.clone();
        self.run_blocking(move |connection| {
            connection.transaction(|conn| {
                let draft = bid_plan.bid();
                let task_id = draft.task_id();
                ensure_agent(conn, draft.bidder(), draft.created_at())?;

                let row = diesel::sql_query(INSERT_BID_SQL)
                    .bind::<BigInt, _>(task_id.value())
                    .bind::<Varchar, _>(draft.bidder().as_str())
                    .bind::<BigInt, _>(draft.amount().signed())
                    .bind::<Nullable<Text>, _>(draft.message())
                    .bind::<Timestamptz, _>(draft.created_at())
                    .get_result::<BidRow>(conn)
                    .optional()?;
                let Some(row) = row else {
                    return Err(rejected_write(conn, task_id, TaskStatus::Open));
                };

                let bid = bid_from_row(row)?;
                insert_activity(conn, bid_plan.activity(), task_id)?;
                Ok(bid)
            })
        })
        .await
    }

    async fn find_bid(&self, id: BidId) -> RepositoryResult<Option<Bid>> {
        self.run_blocking(move |connection| {
            let row = bids::table
                .find(id.value())
                .select(BidRow::as_select())
                .first::<BidRow>(connection)
                .optional()?;
            row.map(bid_from_row).transpose()
        })
        .await
    }

    async fn list_bids(&self, task_id: TaskId) -> RepositoryResult<Vec<Bid>> {
        self.run_blocking(move |connection| {
            let rows = bids::table
                .filter(bids::task_id.eq(task_id.value()))
                .select(BidRow::as_select())
                .order((bids::created_at.asc(), bids::id.asc()))
                .load::<BidRow>(connection)?;
            rows.into_iter().map(bid_from_row).collect()
        })
        .await
    }

    async fn pending_bid_count(&self, task_id: TaskId) -> RepositoryResult<u64> {
        self.run_blocking(move |connection| {
            let count = bids::table
                .filter(bids::task_id.eq(task_id.value()))
                .filter(bids::status.eq(BidStatus::Pending.as_str()))
                .count()
                .get_result::<i64>(connection)?;
            u64::try_from(count).map_err(RepositoryError::invalid_persisted_data)
        })
        .await
    }

    async fn list_activity(&self, task_id: TaskId) -> RepositoryResult<Vec<ActivityRecord>> {
        self.run_blocking(move |connection| {
            let rows = task_activity::table
                .filter(task_activity::task_id.eq(task_id.value()))
                .select(ActivityRow::as_select())
                .order(task_activity::id.asc())
                .load::<ActivityRow>(connection)?;
            rows.into_iter().map(activity_from_row).collect()
        })
        .await
    }

    async fn commit_transition(&self, outcome: &TransitionOutcome) -> RepositoryResult<()> {
        let planned = outcome.clone();
        self.run_blocking(move |connection| {
            connection.transaction(|conn| {
                let guard = planned.guard();
                let task_id = guard.task_id();
                let changeset = state_changeset(planned.task());
                let actor = guard.actor().as_str().to_owned();
                let guarded = tasks::table
                    .filter(tasks::id.eq(task_id.value()))
                    .filter(tasks::status.eq(guard.expected_status().as_str()));

                let updated = match guard.role() {
                    TaskRole::Poster => diesel::update(guarded.filter(tasks::poster.eq(actor)))
                        .set(&changeset)
                        .execute(conn)?,
                    TaskRole::Worker => diesel::update(guarded.filter(tasks::worker.eq(actor)))
                        .set(&changeset)
                        .execute(conn)?,
                };
                if updated == 0 {
                    return Err(rejected_write(conn, task_id, guard.expected_status()));
                }

                if let Some(cascade) = planned.cascade() {
                    settle_bids(conn, task_id, cascade.accepted())?;
                }
                apply_ledger(conn, planned.ledger(), planned.activity().created_at())?;
                insert_activity(conn, planned.activity(), task_id)
            })
        })
        .await
    }

    async fn commit_withdrawal(&self, plan: &WithdrawalPlan) -> RepositoryResult<Bid> {
        let withdrawal = plan.clone();
        self.run_blocking(move |connection| {
            connection.transaction(|conn| {
                let row = diesel::sql_query(WITHDRAW_BID_SQL)
                    .bind::<BigInt, _>(withdrawal.bid_id().value())
                    .bind::<BigInt, _>(withdrawal.task_id().value())
                    .bind::<Varchar, _>(withdrawal.bidder().as_str())
                    .get_result::<BidRow>(conn)
                    .optional()?
                    .ok_or(RepositoryError::BidConflict(withdrawal.bid_id()))?;
                let bid = bid_from_row(row)?;
                insert_activity(conn, withdrawal.activity(), withdrawal.task_id())?;
                Ok(bid)
            })
        })
        .await
    }

    async fn stats(&self) -> RepositoryResult<BoardStats> {
        self.run_blocking(move |connection| {
            let row = diesel::sql_query(STATS_SQL).get_result::<StatsRow>(connection)?;
            stats_from_row(&row)
        })
        .await
    }
}

#[async_trait]
impl AgentRepository for PostgresMarketplace {
    async fn upsert(&self, profile: &AgentProfile, now: DateTime<Utc>) -> RepositoryResult<Agent> {
        let identity = profile.clone();
        self.run_blocking(move |connection| {
            let row = diesel::sql_query(UPSERT_AGENT_SQL)
                .bind::<Varchar, _>(identity.address().as_str())
                .bind::<Nullable<Text>, _>(identity.display_name())
                .bind::<Nullable<Varchar>, _>(
                    identity.secondary_address().map(AgentAddress::as_str),
                )
                .bind::<Timestamptz, _>(now)
                .get_result::<AgentRow>(connection)?;
            agent_from_row(row)
        })
        .await
    }

    async fn find_agent(&self, address: &AgentAddress) -> RepositoryResult<Option<Agent>> {
        let key = address.as_str().to_owned();
        self.run_blocking(move |connection| {
            let row = agents::table
                .find(key)
                .select(AgentRow::as_select())
                .first::<AgentRow>(connection)
                .optional()?;
            row.map(agent_from_row).transpose()
        })
        .await
    }

    async fn list_ranked(&self) -> RepositoryResult<Vec<Agent>> {
        self.run_blocking(move |connection| {
            let rows = agents::table
                .select(AgentRow::as_select())
                .order((
                    agents::reputation.desc(),
                    agents::tasks_completed.desc(),
                    agents::first_seen.asc(),
                    agents::address.asc(),
                ))
                .load::<AgentRow>(connection)?;
            rows.into_iter().map(agent_from_row).collect()
        })
        .await
    }
}

fn filtered_tasks(filter: &TaskFilter) -> tasks::BoxedQuery<'static, Pg> {
    let mut query = tasks::table.into_boxed();
    if let Some(status) = filter.status() {
        query = query.filter(tasks::status.eq(status.as_str()));
    }
    if let Some(poster) = filter.poster() {
        query = query.filter(tasks::poster.eq(poster.as_str().to_owned()));
    }
    if let Some(tag) = filter.tag() {
        query = query.filter(tasks::tags.contains(vec![tag.to_owned()]));
    }
    query
}

fn pending_counts(
    connection: &mut PgConnection,
    task_ids: Vec<i64>,
) -> RepositoryResult<HashMap<i64, i64>> {
    if task_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let counts = bids::table
        .filter(bids::task_id.eq_any(task_ids))
        .filter(bids::status.eq(BidStatus::Pending.as_str()))
        .group_by(bids::task_id)
        .select((bids::task_id, diesel::dsl::count_star()))
        .load::<(i64, i64)>(connection)?;
    Ok(counts.into_iter().collect())
}

/// Maps a guarded write that matched no row to the reason it was rejected.
fn rejected_write(
    connection: &mut PgConnection,
    task_id: TaskId,
    expected: TaskStatus,
) -> RepositoryError {
    let exists = diesel::select(diesel::dsl::exists(
        tasks::table.filter(tasks::id.eq(task_id.value())),
    ))
    .get_result::<bool>(connection);
    match exists {
        Ok(true) => RepositoryError::TransitionConflict { task_id, expected },
        Ok(false) => RepositoryError::TaskNotFound(task_id),
        Err(err) => err.into(),
    }
}

fn settle_bids(
    connection: &mut PgConnection,
    task_id: TaskId,
    accepted: BidId,
) -> RepositoryResult<()> {
    let pending = BidStatus::Pending.as_str();
    let accepted_rows = diesel::update(
        bids::table
            .filter(bids::id.eq(accepted.value()))
            .filter(bids::task_id.eq(task_id.value()))
            .filter(bids::status.eq(pending)),
    )
    .set(bids::status.eq(BidStatus::Accepted.as_str()))
    .execute(connection)?;
    if accepted_rows == 0 {
        return Err(RepositoryError::BidConflict(accepted));
    }

    diesel::update(
        bids::table
            .filter(bids::task_id.eq(task_id.value()))
            .filter(bids::status.eq(pending)),
    )
    .set(bids::status.eq(BidStatus::Rejected.as_str()))
    .execute(connection)?;
    Ok(())
}

fn ensure_agent(
    connection: &mut PgConnection,
    address: &AgentAddress,
    now: DateTime<Utc>,
) -> RepositoryResult<()> {
    diesel::insert_into(agents::table)
        .values(&NewAgentRow {
            address: address.as_str().to_owned(),
            first_seen: now,
        })
        .on_conflict(agents::address)
        .do_nothing()
        .execute(connection)?;
    Ok(())
}

fn apply_ledger(
    connection: &mut PgConnection,
    deltas: &[LedgerDelta],
    now: DateTime<Utc>,
) -> RepositoryResult<()> {
    for delta in deltas {
        ensure_agent(connection, delta.address(), now)?;
        diesel::sql_query(APPLY_DELTA_SQL)
            .bind::<Varchar, _>(delta.address().as_str())
            .bind::<BigInt, _>(to_bigint(delta.reputation())?)
            .bind::<BigInt, _>(to_bigint(delta.tasks_posted())?)
            .bind::<BigInt, _>(to_bigint(delta.tasks_completed())?)
            .bind::<BigInt, _>(delta.earned_sats())
            .bind::<BigInt, _>(delta.spent_sats())
            .execute(connection)?;
    }
    Ok(())
}

fn insert_activity(
    connection: &mut PgConnection,
    entry: &ActivityEntry,
    task_id: TaskId,
) -> RepositoryResult<()> {
    diesel::insert_into(task_activity::table)
        .values(&new_activity_row(entry, task_id))
        .execute(connection)?;
    Ok(())
}
