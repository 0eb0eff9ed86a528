//! Shared test helpers for in-memory marketplace integration tests.

use std::sync::Arc;

use bounty_board::auth::{
    adapters::ShapeOnlyVerifier,
    domain::{AuthEnvelope, AuthenticatedActor, MarketplaceAction},
    services::EnvelopeGuard,
};
use bounty_board::config::{AuthConfig, BoardConfig};
use bounty_board::marketplace::{
    adapters::memory::InMemoryMarketplace,
    domain::{Agent, AgentAddress, Bid, Task},
    ports::AgentRepository,
    services::{
        BoardQueryService, CreateTaskRequest, PlaceBidRequest, SubmitWorkRequest,
        TaskLifecycleService,
    },
};
use chrono::Utc;
use mockable::DefaultClock;
use rstest::fixture;

/// Poster used across scenarios.
pub const POSTER: &str = "bc1qposter";
/// Winning bidder used across scenarios.
pub const WORKER: &str = "bc1qworker";
/// Losing bidder used across scenarios.
pub const RIVAL: &str = "bc1qrival";

/// Lifecycle service over the in-memory store.
pub type Lifecycle = TaskLifecycleService<InMemoryMarketplace, InMemoryMarketplace, DefaultClock>;

/// A wired marketplace: guard, lifecycle and board over one store.
pub struct Marketplace {
    /// Shared store.
    pub store: Arc<InMemoryMarketplace>,
    /// Lifecycle service.
    pub lifecycle: Lifecycle,
    /// Board query service.
    pub board: BoardQueryService<InMemoryMarketplace, InMemoryMarketplace>,
    guard: EnvelopeGuard<ShapeOnlyVerifier, DefaultClock>,
}

impl Marketplace {
    /// Creates a marketplace with default configuration.
    #[must_use]
    pub fn new() -> Self {
        let store = Arc::new(InMemoryMarketplace::new());
        let clock = Arc::new(DefaultClock);
        Self {
            lifecycle: TaskLifecycleService::new(
                Arc::clone(&store),
                Arc::clone(&store),
                Arc::clone(&clock),
            ),
            board: BoardQueryService::new(
                Arc::clone(&store),
                Arc::clone(&store),
                BoardConfig::default(),
            ),
            guard: EnvelopeGuard::new(AuthConfig::default(), Arc::new(ShapeOnlyVerifier), clock),
            store,
        }
    }

    /// Authenticates `address` for `action` with a freshly stamped envelope.
    ///
    /// # Panics
    ///
    /// Panics if the envelope is refused.
    #[must_use]
    pub fn actor(&self, address: &str, action: MarketplaceAction) -> AuthenticatedActor {
        let envelope = AuthEnvelope::new(address, "S".repeat(88), Utc::now().to_rfc3339());
        self.guard
            .authenticate(&envelope, action)
            .expect("fresh envelope should authenticate")
    }

    /// Posts a task for `bounty_sats` as [`POSTER`].
    ///
    /// # Panics
    ///
    /// Panics if creation fails.
    pub async fn post(&self, bounty_sats: u64) -> Task {
        self.lifecycle
            .create_task(
                &self.actor(POSTER, MarketplaceAction::CreateTask),
                CreateTaskRequest::new("Label UTXOs", "Label every output of block 800000", bounty_sats),
            )
            .await
            .expect("task creation should succeed")
    }

    /// Places a bid on `task`.
    ///
    /// # Panics
    ///
    /// Panics if the bid is refused.
    pub async fn bid(&self, task: &Task, bidder: &str, amount_sats: u64) -> Bid {
        self.lifecycle
            .place_bid(
                &self.actor(bidder, MarketplaceAction::PlaceBid),
                PlaceBidRequest::new(task.id(), amount_sats),
            )
            .await
            .expect("bid should be placed")
    }

    /// Drives a fresh task to `submitted` with [`WORKER`] as worker.
    ///
    /// # Panics
    ///
    /// Panics if any step fails.
    pub async fn submitted(&self, bounty_sats: u64, bid_sats: u64) -> Task {
        let task = self.post(bounty_sats).await;
        let offer = self.bid(&task, WORKER, bid_sats).await;
        self.lifecycle
            .accept_bid(
                &self.actor(POSTER, MarketplaceAction::AcceptBid),
                task.id(),
                offer.id(),
            )
            .await
            .expect("acceptance should succeed");
        self.lifecycle
            .submit_work(
                &self.actor(WORKER, MarketplaceAction::SubmitWork),
                SubmitWorkRequest::new(task.id(), "https://example.com/labels.csv"),
            )
            .await
            .expect("submission should succeed")
    }

    /// Loads the ledger entry for `address`.
    ///
    /// # Panics
    ///
    /// Panics if the agent is unknown.
    pub async fn agent(&self, address: &str) -> Agent {
        let parsed = AgentAddress::new(address).expect("address should be valid");
        self.store
            .find_agent(&parsed)
            .await
            .expect("lookup should succeed")
            .expect("agent should exist")
    }
}

impl Default for Marketplace {
    fn default() -> Self {
        Self::new()
    }
}

/// Provides a fresh marketplace for each test.
#[fixture]
pub fn marketplace() -> Marketplace {
    Marketplace::new()
}
