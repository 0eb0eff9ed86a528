//! When steps for task marketplace BDD scenarios.

use super::world::{MarketplaceWorld, run_async};
use bounty_board::auth::domain::MarketplaceAction;
use bounty_board::marketplace::services::{
    PlaceBidRequest, SubmitWorkRequest, VerifyWorkRequest,
};
use rstest_bdd_macros::when;

#[when(r#"agent "{bidder}" bids {amount:u64} sats on the task"#)]
fn agent_bids(
    world: &mut MarketplaceWorld,
    bidder: String,
    amount: u64,
) -> Result<(), eyre::Report> {
    let task_id = world.task()?.id();
    let actor = world.actor(&bidder, MarketplaceAction::PlaceBid)?;
    let result = run_async(
        world
            .lifecycle
            .place_bid(&actor, PlaceBidRequest::new(task_id, amount)),
    );
    match result {
        Ok(placed) => {
            world.bids_by_bidder.insert(bidder, placed);
            world.last_error = None;
        }
        Err(err) => world.last_error = Some(err),
    }
    Ok(())
}

#[when(r#"agent "{actor}" accepts the bid from "{bidder}""#)]
fn agent_accepts(
    world: &mut MarketplaceWorld,
    actor: String,
    bidder: String,
) -> Result<(), eyre::Report> {
    let task_id = world.task()?.id();
    let bid_id = world.bid_from(&bidder)?.id();
    let authenticated = world.actor(&actor, MarketplaceAction::AcceptBid)?;
    let result = run_async(world.lifecycle.accept_bid(&authenticated, task_id, bid_id));
    world.record(result);
    Ok(())
}

#[when(r#"agent "{worker}" submits proof "{proof_url}""#)]
fn agent_submits(
    world: &mut MarketplaceWorld,
    worker: String,
    proof_url: String,
) -> Result<(), eyre::Report> {
    let task_id = world.task()?.id();
    let actor = world.actor(&worker, MarketplaceAction::SubmitWork)?;
    let result = run_async(
        world
            .lifecycle
            .submit_work(&actor, SubmitWorkRequest::new(task_id, proof_url)),
    );
    world.record(result);
    Ok(())
}

#[when(r#"agent "{poster}" approves the work with payment "{payment_tx}""#)]
fn agent_approves_with_payment(
    world: &mut MarketplaceWorld,
    poster: String,
    payment_tx: String,
) -> Result<(), eyre::Report> {
    let task_id = world.task()?.id();
    let actor = world.actor(&poster, MarketplaceAction::VerifyWork)?;
    let result = run_async(world.lifecycle.verify_work(
        &actor,
        VerifyWorkRequest::approve(task_id).with_payment_tx(payment_tx),
    ));
    world.record(result);
    Ok(())
}

#[when(r#"agent "{poster}" rejects the work"#)]
fn agent_rejects(world: &mut MarketplaceWorld, poster: String) -> Result<(), eyre::Report> {
    let task_id = world.task()?.id();
    let actor = world.actor(&poster, MarketplaceAction::VerifyWork)?;
    let result = run_async(
        world
            .lifecycle
            .verify_work(&actor, VerifyWorkRequest::reject(task_id)),
    );
    world.record(result);
    Ok(())
}

#[when(r#"agent "{poster}" cancels the task"#)]
fn agent_cancels(world: &mut MarketplaceWorld, poster: String) -> Result<(), eyre::Report> {
    let task_id = world.task()?.id();
    let actor = world.actor(&poster, MarketplaceAction::CancelTask)?;
    let result = run_async(world.lifecycle.cancel_task(&actor, task_id));
    world.record(result);
    Ok(())
}
