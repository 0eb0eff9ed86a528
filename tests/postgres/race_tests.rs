//! Racing writers against one task through the guarded SQL writes.

use std::sync::Arc;

use super::helpers::{POSTER, PgMarketplace, RIVAL, WORKER, test_runtime};
use bounty_board::auth::domain::MarketplaceAction;
use bounty_board::marketplace::{
    domain::{AgentAddress, Bid, BidStatus, Task, TaskStatus},
    services::{ErrorKind, MarketplaceResult, PlaceBidRequest},
};
use pg_embedded_setup_unpriv::{TestCluster, test_support::shared_test_cluster};
use rstest::rstest;
use tokio::task::JoinHandle;

fn spawn_accept(
    marketplace: &Arc<PgMarketplace>,
    task: &Task,
    offer: &Bid,
) -> JoinHandle<MarketplaceResult<Task>> {
    let shared = Arc::clone(marketplace);
    let task_id = task.id();
    let bid_id = offer.id();
    tokio::spawn(async move {
        let poster = shared.actor(POSTER, MarketplaceAction::AcceptBid);
        shared.lifecycle.accept_bid(&poster, task_id, bid_id).await
    })
}

fn kinds<T>(outcomes: Vec<MarketplaceResult<T>>) -> (usize, Vec<ErrorKind>) {
    let mut winners = 0;
    let mut losers = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(_) => winners += 1,
            Err(err) => losers.push(err.kind()),
        }
    }
    (winners, losers)
}

#[rstest]
fn concurrent_acceptances_assign_exactly_one_worker(shared_test_cluster: &'static TestCluster) {
    let marketplace = Arc::new(
        PgMarketplace::new(shared_test_cluster, "race_accepts").expect("marketplace setup"),
    );
    let rt = test_runtime();

    rt.block_on(async {
        let task = marketplace.post(10_000).await;
        let mut offers = Vec::new();
        let bidders = [
            (WORKER, 9_000),
            (RIVAL, 8_500),
            ("bc1qthird", 8_000),
            ("bc1qfourth", 7_500),
        ];
        for (bidder, amount) in bidders {
            offers.push(marketplace.bid(&task, bidder, amount).await);
        }

        let handles: Vec<_> = offers
            .iter()
            .map(|offer| spawn_accept(&marketplace, &task, offer))
            .collect();
        let mut outcomes = Vec::new();
        for handle in handles {
            outcomes.push(handle.await.expect("accept task should join"));
        }
        let (winners, losers) = kinds(outcomes);

        assert_eq!(winners, 1, "exactly one acceptance should win");
        assert_eq!(losers, vec![ErrorKind::StateConflict; 3]);

        let detail = marketplace.board.get_task(task.id()).await.expect("task detail");
        assert_eq!(detail.task.status(), TaskStatus::Assigned);
        let accepted: Vec<&Bid> = detail
            .bids
            .iter()
            .filter(|bid| bid.status() == BidStatus::Accepted)
            .collect();
        assert_eq!(accepted.len(), 1, "exactly one bid should be accepted");
        assert_eq!(
            accepted.first().map(|bid| bid.bidder()),
            detail.task.worker(),
            "accepted bid should belong to the assigned worker"
        );
        assert_eq!(
            accepted.first().map(|bid| bid.amount()),
            Some(detail.task.bounty()),
            "bounty follows the accepted bid"
        );
        assert!(
            detail.bids.iter().all(|bid| bid.status() != BidStatus::Pending),
            "no bid should remain pending"
        );
    });
}

#[rstest]
fn acceptance_racing_cancellation_leaves_a_consistent_task(
    shared_test_cluster: &'static TestCluster,
) {
    let marketplace = Arc::new(
        PgMarketplace::new(shared_test_cluster, "race_cancel").expect("marketplace setup"),
    );
    let rt = test_runtime();

    rt.block_on(async {
        let task = marketplace.post(10_000).await;
        let offer = marketplace.bid(&task, WORKER, 9_000).await;

        let accept = spawn_accept(&marketplace, &task, &offer);
        let shared = Arc::clone(&marketplace);
        let task_id = task.id();
        let cancel = tokio::spawn(async move {
            let poster = shared.actor(POSTER, MarketplaceAction::CancelTask);
            shared.lifecycle.cancel_task(&poster, task_id).await
        });
        let outcomes = vec![
            accept.await.expect("accept task should join"),
            cancel.await.expect("cancel task should join"),
        ];
        let (winners, losers) = kinds(outcomes);

        assert_eq!(winners, 1, "exactly one writer should win");
        assert_eq!(losers, vec![ErrorKind::StateConflict]);

        let stored = marketplace.board.get_task(task.id()).await.expect("task detail");
        let poster = marketplace.agent(POSTER).await;
        match stored.task.status() {
            TaskStatus::Assigned => {
                assert_eq!(stored.task.worker().map(AgentAddress::as_str), Some(WORKER));
                assert_eq!(poster.total_spent_sats(), 10_000, "spend kept after assignment");
                assert_eq!(stored.bids.first().map(Bid::status), Some(BidStatus::Accepted));
            }
            TaskStatus::Cancelled => {
                assert!(stored.task.worker().is_none(), "cancelled task has no worker");
                assert_eq!(poster.total_spent_sats(), 0, "spend released by cancellation");
                assert_eq!(stored.bids.first().map(Bid::status), Some(BidStatus::Pending));
            }
            other => panic!("unexpected status {other}"),
        }
    });
}

#[rstest]
fn bids_racing_acceptance_never_stay_pending(shared_test_cluster: &'static TestCluster) {
    let marketplace = Arc::new(
        PgMarketplace::new(shared_test_cluster, "race_bids").expect("marketplace setup"),
    );
    let rt = test_runtime();

    rt.block_on(async {
        let task = marketplace.post(10_000).await;
        let offer = marketplace.bid(&task, WORKER, 9_000).await;

        let accept = spawn_accept(&marketplace, &task, &offer);
        let late: Vec<_> = ["bc1qlatea", "bc1qlateb", "bc1qlatec"]
            .into_iter()
            .map(|bidder| {
                let shared = Arc::clone(&marketplace);
                let request_task = task.id();
                tokio::spawn(async move {
                    let actor = shared.actor(bidder, MarketplaceAction::PlaceBid);
                    shared
                        .lifecycle
                        .place_bid(&actor, PlaceBidRequest::new(request_task, 6_000))
                        .await
                })
            })
            .collect();

        accept
            .await
            .expect("accept task should join")
            .expect("acceptance should win against new bids");
        let mut late_outcomes = Vec::new();
        for handle in late {
            late_outcomes.push(handle.await.expect("bid task should join"));
        }
        let (_, losers) = kinds(late_outcomes);
        assert!(
            losers.iter().all(|kind| *kind == ErrorKind::StateConflict),
            "late bids may only fail on state, got {losers:?}"
        );

        let detail = marketplace.board.get_task(task.id()).await.expect("task detail");
        assert_eq!(
            marketplace
                .board
                .pending_bid_count(task.id())
                .await
                .expect("pending count"),
            0
        );
        for bid in detail.bids.iter().filter(|bid| bid.id() != offer.id()) {
            assert_eq!(
                bid.status(),
                BidStatus::Rejected,
                "bid placed before acceptance is rejected by it"
            );
        }
    });
}

#[rstest]
fn withdrawal_racing_acceptance_has_one_winner(shared_test_cluster: &'static TestCluster) {
    let marketplace = Arc::new(
        PgMarketplace::new(shared_test_cluster, "race_withdraw").expect("marketplace setup"),
    );
    let rt = test_runtime();

    rt.block_on(async {
        let task = marketplace.post(10_000).await;
        let offer = marketplace.bid(&task, WORKER, 9_000).await;

        let accept = spawn_accept(&marketplace, &task, &offer);
        let shared = Arc::clone(&marketplace);
        let (task_id, bid_id) = (task.id(), offer.id());
        let withdraw = tokio::spawn(async move {
            let worker = shared.actor(WORKER, MarketplaceAction::WithdrawBid);
            shared.lifecycle.withdraw_bid(&worker, task_id, bid_id).await
        });
        let accepted = accept.await.expect("accept task should join");
        let withdrawn = withdraw.await.expect("withdraw task should join");

        let detail = marketplace.board.get_task(task.id()).await.expect("task detail");
        let stored = detail.bids.first().map(Bid::status);
        match (accepted, withdrawn) {
            (Ok(assigned), Err(err)) => {
                assert_eq!(err.kind(), ErrorKind::StateConflict);
                assert_eq!(assigned.status(), TaskStatus::Assigned);
                assert_eq!(stored, Some(BidStatus::Accepted));
            }
            (Err(err), Ok(bid)) => {
                assert_eq!(err.kind(), ErrorKind::StateConflict);
                assert_eq!(bid.status(), BidStatus::Withdrawn);
                assert_eq!(stored, Some(BidStatus::Withdrawn));
                assert_eq!(detail.task.status(), TaskStatus::Open);
                assert!(detail.task.worker().is_none());
            }
            (accept_outcome, withdraw_outcome) => panic!(
                "expected exactly one winner, got {accept_outcome:?} and {withdraw_outcome:?}"
            ),
        }
    });
}
