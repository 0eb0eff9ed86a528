//! Guarded transitions and the bid cascade against a real database.

use super::helpers::{POSTER, PgMarketplace, RIVAL, WORKER, test_runtime};
use bounty_board::auth::domain::MarketplaceAction;
use bounty_board::marketplace::{
    domain::{ActivityAction, Bid, BidStatus, TaskStatus},
    services::{ErrorKind, SubmitWorkRequest, VerifyWorkRequest},
};
use pg_embedded_setup_unpriv::{TestCluster, test_support::shared_test_cluster};
use rstest::rstest;

const THIRD: &str = "bc1qthird";

#[rstest]
fn acceptance_settles_every_bid_and_fixes_the_bounty(shared_test_cluster: &'static TestCluster) {
    let marketplace =
        PgMarketplace::new(shared_test_cluster, "cascade").expect("marketplace setup");
    let rt = test_runtime();

    rt.block_on(async {
        let task = marketplace.post(10_000).await;
        let winning = marketplace.bid(&task, WORKER, 8_000).await;
        marketplace.bid(&task, RIVAL, 7_000).await;
        let withdrawn = marketplace.bid(&task, THIRD, 6_000).await;
        marketplace
            .lifecycle
            .withdraw_bid(
                &marketplace.actor(THIRD, MarketplaceAction::WithdrawBid),
                task.id(),
                withdrawn.id(),
            )
            .await
            .expect("withdrawal should succeed");

        let assigned = marketplace
            .lifecycle
            .accept_bid(
                &marketplace.actor(POSTER, MarketplaceAction::AcceptBid),
                task.id(),
                winning.id(),
            )
            .await
            .expect("acceptance should succeed");

        assert_eq!(assigned.status(), TaskStatus::Assigned);
        assert_eq!(assigned.bounty().value(), 8_000, "bounty follows the accepted bid");
        let detail = marketplace.board.get_task(task.id()).await.expect("task detail");
        let statuses: Vec<BidStatus> = detail.bids.iter().map(Bid::status).collect();
        assert_eq!(
            statuses,
            vec![BidStatus::Accepted, BidStatus::Rejected, BidStatus::Withdrawn]
        );
        assert_eq!(detail.task.bounty().value(), 8_000);
    });
}

#[rstest]
fn verdict_is_final_once_recorded(shared_test_cluster: &'static TestCluster) {
    let marketplace =
        PgMarketplace::new(shared_test_cluster, "verdict").expect("marketplace setup");
    let rt = test_runtime();

    rt.block_on(async {
        let task = marketplace.submitted(10_000, 8_000).await;
        let verifier = marketplace.actor(POSTER, MarketplaceAction::VerifyWork);

        let paid = marketplace
            .lifecycle
            .verify_work(
                &verifier,
                VerifyWorkRequest::approve(task.id()).with_payment_tx("beef01"),
            )
            .await
            .expect("approval should succeed");
        let again = marketplace
            .lifecycle
            .verify_work(&verifier, VerifyWorkRequest::reject(task.id()))
            .await
            .expect_err("second verdict should be refused");

        assert_eq!(paid.status(), TaskStatus::Paid);
        assert_eq!(again.kind(), ErrorKind::StateConflict);
        let worker = marketplace.agent(WORKER).await;
        assert_eq!(worker.reputation(), 1);
        assert_eq!(worker.tasks_completed(), 1);
        assert_eq!(worker.total_earned_sats(), 8_000);
        let poster = marketplace.agent(POSTER).await;
        assert_eq!(poster.reputation(), 1, "poster credited for the approval");
        assert_eq!(poster.total_spent_sats(), 10_000);
    });
}

#[rstest]
fn submission_by_someone_else_leaves_task_untouched(shared_test_cluster: &'static TestCluster) {
    let marketplace =
        PgMarketplace::new(shared_test_cluster, "foreign_submit").expect("marketplace setup");
    let rt = test_runtime();

    rt.block_on(async {
        let task = marketplace.post(5_000).await;
        let offer = marketplace.bid(&task, WORKER, 5_000).await;
        marketplace
            .lifecycle
            .accept_bid(
                &marketplace.actor(POSTER, MarketplaceAction::AcceptBid),
                task.id(),
                offer.id(),
            )
            .await
            .expect("acceptance should succeed");

        let err = marketplace
            .lifecycle
            .submit_work(
                &marketplace.actor(RIVAL, MarketplaceAction::SubmitWork),
                SubmitWorkRequest::new(task.id(), "https://example.com/forged.parquet"),
            )
            .await
            .expect_err("only the worker may submit");

        assert_eq!(err.kind(), ErrorKind::Authorization);
        let detail = marketplace.board.get_task(task.id()).await.expect("task detail");
        assert_eq!(detail.task.status(), TaskStatus::Assigned);
        assert!(detail.task.proof().is_none());
    });
}

#[rstest]
fn activity_trail_is_read_back_in_order(shared_test_cluster: &'static TestCluster) {
    let marketplace =
        PgMarketplace::new(shared_test_cluster, "activity").expect("marketplace setup");
    let rt = test_runtime();

    rt.block_on(async {
        let task = marketplace.submitted(3_000, 2_500).await;
        marketplace
            .lifecycle
            .verify_work(
                &marketplace.actor(POSTER, MarketplaceAction::VerifyWork),
                VerifyWorkRequest::reject(task.id()).with_reason("labels missing"),
            )
            .await
            .expect("rejection should succeed");

        let detail = marketplace.board.get_task(task.id()).await.expect("task detail");
        let actions: Vec<ActivityAction> =
            detail.activity.iter().map(|entry| entry.action()).collect();
        assert_eq!(
            actions,
            vec![
                ActivityAction::Created,
                ActivityAction::Bid,
                ActivityAction::AcceptedBid,
                ActivityAction::Submitted,
                ActivityAction::Disputed,
            ]
        );
        assert_eq!(detail.task.status(), TaskStatus::Disputed);
    });
}
