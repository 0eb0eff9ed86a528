//! Agent upserts, ranking and board statistics over `PostgreSQL`.

use super::helpers::{POSTER, PgMarketplace, RIVAL, WORKER, test_runtime};
use bounty_board::auth::domain::MarketplaceAction;
use bounty_board::marketplace::{
    domain::{AgentAddress, AgentProfile, BoardStats},
    ports::AgentRepository,
    services::{SubmitWorkRequest, VerifyWorkRequest},
};
use chrono::{Duration, Utc};
use pg_embedded_setup_unpriv::{TestCluster, test_support::shared_test_cluster};
use rstest::rstest;

fn address(raw: &str) -> AgentAddress {
    AgentAddress::new(raw).expect("address should be valid")
}

#[rstest]
fn upsert_keeps_names_it_is_not_given(shared_test_cluster: &'static TestCluster) {
    let marketplace = PgMarketplace::new(shared_test_cluster, "upsert").expect("marketplace setup");
    let rt = test_runtime();

    rt.block_on(async {
        let registered_at = Utc::now();
        let first = marketplace
            .store
            .upsert(
                &AgentProfile::new(address(WORKER))
                    .with_display_name("Indexer")
                    .with_secondary_address(address("ark1qworker")),
                registered_at,
            )
            .await
            .expect("first upsert should succeed");
        let bare = marketplace
            .store
            .upsert(
                &AgentProfile::new(address(WORKER)),
                registered_at + Duration::minutes(5),
            )
            .await
            .expect("bare upsert should succeed");
        let renamed = marketplace
            .store
            .upsert(
                &AgentProfile::new(address(WORKER)).with_display_name("Archivist"),
                registered_at + Duration::minutes(10),
            )
            .await
            .expect("renaming upsert should succeed");

        assert_eq!(bare.display_name(), Some("Indexer"));
        assert_eq!(
            bare.secondary_address().map(AgentAddress::as_str),
            Some("ark1qworker")
        );
        assert_eq!(bare.first_seen(), first.first_seen(), "first sighting is kept");
        assert_eq!(renamed.display_name(), Some("Archivist"));
        assert_eq!(
            renamed.secondary_address().map(AgentAddress::as_str),
            Some("ark1qworker")
        );
    });
}

#[rstest]
fn stats_count_only_live_bounties(shared_test_cluster: &'static TestCluster) {
    let marketplace = PgMarketplace::new(shared_test_cluster, "stats").expect("marketplace setup");
    let rt = test_runtime();

    rt.block_on(async {
        let task = marketplace.post(10_000).await;
        let winning = marketplace.bid(&task, WORKER, 8_000).await;
        marketplace.bid(&task, RIVAL, 7_000).await;
        marketplace.bid(&task, "bc1qthird", 6_000).await;
        marketplace
            .lifecycle
            .accept_bid(
                &marketplace.actor(POSTER, MarketplaceAction::AcceptBid),
                task.id(),
                winning.id(),
            )
            .await
            .expect("acceptance should succeed");
        marketplace
            .lifecycle
            .submit_work(
                &marketplace.actor(WORKER, MarketplaceAction::SubmitWork),
                SubmitWorkRequest::new(task.id(), "https://example.com/index.parquet"),
            )
            .await
            .expect("submission should succeed");
        marketplace
            .lifecycle
            .verify_work(
                &marketplace.actor(POSTER, MarketplaceAction::VerifyWork),
                VerifyWorkRequest::approve(task.id()).with_payment_tx("beef01"),
            )
            .await
            .expect("approval should succeed");
        let cancelled = marketplace.post(3_000).await;
        marketplace
            .lifecycle
            .cancel_task(
                &marketplace.actor(POSTER, MarketplaceAction::CancelTask),
                cancelled.id(),
            )
            .await
            .expect("cancellation should succeed");

        let stats = marketplace.board.stats().await.expect("stats");

        assert_eq!(
            stats,
            BoardStats {
                total_tasks: 2,
                open_tasks: 0,
                assigned_tasks: 0,
                completed_tasks: 1,
                total_bounty_sats: 8_000,
                paid_out_sats: 8_000,
                agent_count: 4,
                bid_count: 3,
            }
        );
        let worker = marketplace.agent(WORKER).await;
        assert_eq!(worker.total_earned_sats(), stats.paid_out_sats);
    });
}

#[rstest]
fn ranking_puts_reputation_first(shared_test_cluster: &'static TestCluster) {
    let marketplace = PgMarketplace::new(shared_test_cluster, "ranking").expect("marketplace setup");
    let rt = test_runtime();

    rt.block_on(async {
        let task = marketplace.submitted(2_000, 2_000).await;
        marketplace
            .lifecycle
            .verify_work(
                &marketplace.actor(POSTER, MarketplaceAction::VerifyWork),
                VerifyWorkRequest::approve(task.id()),
            )
            .await
            .expect("approval should succeed");
        let open = marketplace.post(1_000).await;
        marketplace.bid(&open, RIVAL, 900).await;

        let ranked = marketplace.board.list_agents().await.expect("ranking");
        let order: Vec<&str> = ranked.iter().map(|agent| agent.address().as_str()).collect();

        assert_eq!(order.len(), 3);
        assert_eq!(order.last(), Some(&RIVAL), "agent without reputation ranks last");
        assert_eq!(
            ranked.first().map(|agent| agent.tasks_completed()),
            Some(1),
            "completed work breaks the reputation tie"
        );
    });
}
