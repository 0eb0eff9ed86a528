//! Conversions between Diesel rows and marketplace domain types.

use super::models::{
    ActivityRow, AgentRow, BidRow, NewActivityRow, NewTaskRow, StatsRow, TaskRow,
    TaskStateChangeset,
};
use crate::marketplace::{
    domain::{
        ActivityAction, ActivityEntry, ActivityRecord, Agent, AgentAddress, Bid, BidId, BidStatus,
        BoardStats, NewTask, PaymentReference, PersistedAgentData, PersistedBidData,
        PersistedTaskData, Sats, Task, TaskId, TaskStatus, WorkProof,
    },
    ports::{RepositoryError, RepositoryResult},
};

pub(super) fn to_bigint(value: u64) -> RepositoryResult<i64> {
    i64::try_from(value).map_err(RepositoryError::invalid_persisted_data)
}

fn to_unsigned(value: i64) -> RepositoryResult<u64> {
    u64::try_from(value).map_err(RepositoryError::invalid_persisted_data)
}

fn to_sats(value: i64) -> RepositoryResult<Sats> {
    Sats::new(to_unsigned(value)?).map_err(RepositoryError::invalid_persisted_data)
}

fn to_address(value: String) -> RepositoryResult<AgentAddress> {
    AgentAddress::new(value).map_err(RepositoryError::invalid_persisted_data)
}

pub(super) fn to_task_id(value: i64) -> RepositoryResult<TaskId> {
    TaskId::new(value).map_err(RepositoryError::invalid_persisted_data)
}

pub(super) fn to_bid_id(value: i64) -> RepositoryResult<BidId> {
    BidId::new(value).map_err(RepositoryError::invalid_persisted_data)
}

pub(super) fn new_task_row(task: &NewTask) -> NewTaskRow {
    NewTaskRow {
        poster: task.poster().as_str().to_owned(),
        title: task.title().to_owned(),
        description: task.description().to_owned(),
        bounty_sats: task.bounty().signed(),
        status: TaskStatus::Open.as_str().to_owned(),
        tags: task.tags().to_vec(),
        deadline: task.deadline(),
        created_at: task.created_at(),
        updated_at: task.created_at(),
    }
}

pub(super) fn state_changeset(task: &Task) -> TaskStateChangeset {
    TaskStateChangeset {
        bounty_sats: task.bounty().signed(),
        status: task.status().as_str().to_owned(),
        worker: task.worker().map(|worker| worker.as_str().to_owned()),
        proof_url: task.proof().map(|proof| proof.url().to_owned()),
        proof_description: task
            .proof()
            .and_then(WorkProof::description)
            .map(str::to_owned),
        payment_tx: task.payment_tx().map(|tx| tx.as_str().to_owned()),
        updated_at: task.updated_at(),
    }
}

pub(super) fn task_from_row(row: TaskRow) -> RepositoryResult<Task> {
    let TaskRow {
        id,
        poster,
        title,
        description,
        bounty_sats,
        status: persisted_status,
        tags,
        deadline,
        worker,
        proof_url,
        proof_description,
        payment_tx: persisted_payment_tx,
        created_at,
        updated_at,
    } = row;

    let status = TaskStatus::try_from(persisted_status.as_str())
        .map_err(RepositoryError::invalid_persisted_data)?;
    let proof = proof_url
        .map(|url| WorkProof::new(url, proof_description))
        .transpose()
        .map_err(RepositoryError::invalid_persisted_data)?;
    let payment_tx = persisted_payment_tx
        .map(PaymentReference::new)
        .transpose()
        .map_err(RepositoryError::invalid_persisted_data)?;

    Ok(Task::from_persisted(PersistedTaskData {
        id: to_task_id(id)?,
        poster: to_address(poster)?,
        title,
        description,
        bounty: to_sats(bounty_sats)?,
        status,
        tags,
        deadline,
        worker: worker.map(to_address).transpose()?,
        proof,
        payment_tx,
        created_at,
        updated_at,
    }))
}

pub(super) fn bid_from_row(row: BidRow) -> RepositoryResult<Bid> {
    let status =
        BidStatus::try_from(row.status.as_str()).map_err(RepositoryError::invalid_persisted_data)?;
    Ok(Bid::from_persisted(PersistedBidData {
        id: to_bid_id(row.id)?,
        task_id: to_task_id(row.task_id)?,
        bidder: to_address(row.bidder)?,
        amount: to_sats(row.amount_sats)?,
        message: row.message,
        status,
        created_at: row.created_at,
    }))
}

pub(super) fn new_activity_row(entry: &ActivityEntry, task_id: TaskId) -> NewActivityRow {
    NewActivityRow {
        task_id: task_id.value(),
        actor: entry.actor().as_str().to_owned(),
        action: entry.action().as_str().to_owned(),
        details: entry.details().to_owned(),
        created_at: entry.created_at(),
    }
}

pub(super) fn activity_from_row(row: ActivityRow) -> RepositoryResult<ActivityRecord> {
    let action = ActivityAction::try_from(row.action.as_str())
        .map_err(RepositoryError::invalid_persisted_data)?;
    let entry = ActivityEntry::new(to_address(row.actor)?, action, row.details, row.created_at);
    Ok(entry.attach(to_task_id(row.task_id)?))
}

pub(super) fn agent_from_row(row: AgentRow) -> RepositoryResult<Agent> {
    Ok(Agent::from_persisted(PersistedAgentData {
        address: to_address(row.address)?,
        display_name: row.display_name,
        secondary_address: row.secondary_address.map(to_address).transpose()?,
        reputation: to_unsigned(row.reputation)?,
        tasks_posted: to_unsigned(row.tasks_posted)?,
        tasks_completed: to_unsigned(row.tasks_completed)?,
        total_earned_sats: to_unsigned(row.total_earned_sats)?,
        total_spent_sats: to_unsigned(row.total_spent_sats)?,
        first_seen: row.first_seen,
    }))
}

pub(super) fn stats_from_row(row: &StatsRow) -> RepositoryResult<BoardStats> {
    Ok(BoardStats {
        total_tasks: to_unsigned(row.total_tasks)?,
        open_tasks: to_unsigned(row.open_tasks)?,
        assigned_tasks: to_unsigned(row.assigned_tasks)?,
        completed_tasks: to_unsigned(row.completed_tasks)?,
        total_bounty_sats: to_unsigned(row.total_bounty_sats)?,
        paid_out_sats: to_unsigned(row.paid_out_sats)?,
        agent_count: to_unsigned(row.agent_count)?,
        bid_count: to_unsigned(row.bid_count)?,
    })
}
