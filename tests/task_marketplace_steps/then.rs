//! Then steps for task marketplace BDD scenarios.

use super::world::{MarketplaceWorld, run_async};
use bounty_board::marketplace::domain::{Agent, TaskStatus};
use rstest_bdd_macros::then;

fn ledger_entry(world: &MarketplaceWorld, address: &str) -> Result<Agent, eyre::Report> {
    let detail = run_async(world.board.get_agent(address))?;
    Ok(detail.agent)
}

#[then(r#"the task status is "{status}""#)]
fn task_status_is(world: &MarketplaceWorld, status: String) -> Result<(), eyre::Report> {
    let expected = TaskStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid expected status in scenario: {err}"))?;
    let task_id = world.task()?.id();
    let stored = run_async(world.board.get_task(task_id))?;

    if stored.task.status() != expected {
        return Err(eyre::eyre!(
            "expected status {}, found {}",
            expected.as_str(),
            stored.task.status().as_str()
        ));
    }
    Ok(())
}

#[then(r#"the request fails with a "{kind}" error"#)]
fn request_fails_with(world: &MarketplaceWorld, kind: String) -> Result<(), eyre::Report> {
    let err = world
        .last_error
        .as_ref()
        .ok_or_else(|| eyre::eyre!("expected a {kind} error, but the request succeeded"))?;

    if err.kind().as_str() != kind {
        return Err(eyre::eyre!("expected a {kind} error, got {err:?}"));
    }
    Ok(())
}

#[then(r#"agent "{address}" has earned {amount:u64} sats"#)]
fn agent_has_earned(
    world: &MarketplaceWorld,
    address: String,
    amount: u64,
) -> Result<(), eyre::Report> {
    let agent = ledger_entry(world, &address)?;
    eyre::ensure!(
        agent.total_earned_sats() == amount,
        "expected {address} to have earned {amount}, found {}",
        agent.total_earned_sats()
    );
    Ok(())
}

#[then(r#"agent "{address}" has spent {amount:u64} sats"#)]
fn agent_has_spent(
    world: &MarketplaceWorld,
    address: String,
    amount: u64,
) -> Result<(), eyre::Report> {
    let agent = ledger_entry(world, &address)?;
    eyre::ensure!(
        agent.total_spent_sats() == amount,
        "expected {address} to have spent {amount}, found {}",
        agent.total_spent_sats()
    );
    Ok(())
}

#[then(r#"agent "{address}" has reputation {reputation:u64}"#)]
fn agent_has_reputation(
    world: &MarketplaceWorld,
    address: String,
    reputation: u64,
) -> Result<(), eyre::Report> {
    let agent = ledger_entry(world, &address)?;
    eyre::ensure!(
        agent.reputation() == reputation,
        "expected {address} to have reputation {reputation}, found {}",
        agent.reputation()
    );
    Ok(())
}
