//! Shared test helpers for `PostgreSQL` integration tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bounty_board::auth::{
    adapters::ShapeOnlyVerifier,
    domain::{AuthEnvelope, AuthenticatedActor, MarketplaceAction},
    services::EnvelopeGuard,
};
use bounty_board::config::{AuthConfig, BoardConfig};
use bounty_board::marketplace::{
    adapters::postgres::{MarketplacePgPool, PostgresMarketplace},
    domain::{Agent, AgentAddress, Bid, Task},
    ports::AgentRepository,
    services::{
        BoardQueryService, CreateTaskRequest, PlaceBidRequest, SubmitWorkRequest,
        TaskLifecycleService,
    },
};
use chrono::Utc;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use mockable::DefaultClock;
use pg_embedded_setup_unpriv::{ClusterHandle, TestCluster};
use tokio::runtime::Runtime;

/// SQL that creates the marketplace schema.
pub const CREATE_MARKETPLACE_SQL: &str =
    include_str!("../../migrations/2026-10-01-000000_create_marketplace/up.sql");

/// Template database name for the pre-migrated schema.
pub const TEMPLATE_DB: &str = "bounty_board_test_template";

/// Poster used across tests.
pub const POSTER: &str = "bc1qposter";
/// Winning bidder used across tests.
pub const WORKER: &str = "bc1qworker";
/// Losing bidder used across tests.
pub const RIVAL: &str = "bc1qrival";

static NEXT_DATABASE: AtomicU64 = AtomicU64::new(0);

/// Creates a multi-threaded runtime so spawned writers really overlap.
///
/// # Panics
///
/// Panics if the runtime cannot be built.
#[must_use]
pub fn test_runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .expect("failed to create test runtime")
}

/// Ensures the template database exists with the schema applied.
///
/// # Errors
///
/// Returns an error if template creation or migration fails.
pub fn ensure_template(cluster: &TestCluster) -> eyre::Result<()> {
    cluster
        .ensure_template_exists(TEMPLATE_DB, |db_name| {
            let url = cluster.connection().database_url(db_name);
            let mut conn = PgConnection::establish(&url).map_err(|e| eyre::eyre!("{e}"))?;
            conn.batch_execute(CREATE_MARKETPLACE_SQL)
                .map_err(|e| eyre::eyre!("{e}"))?;
            Ok(())
        })
        .map_err(|e| eyre::eyre!("template setup failed: {e}"))
}

/// Drops the per-test database when the test ends, even on panic.
pub struct CleanupGuard {
    cluster: &'static ClusterHandle,
    db_name: String,
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        if let Err(e) = self.cluster.drop_database(&*self.db_name) {
            eprintln!("Warning: failed to drop test database {}: {e}", self.db_name);
        }
    }
}

/// Lifecycle service over the `PostgreSQL` store.
pub type PgLifecycle = TaskLifecycleService<PostgresMarketplace, PostgresMarketplace, DefaultClock>;

/// A wired marketplace over a fresh database cloned from the template.
pub struct PgMarketplace {
    /// Shared store.
    pub store: Arc<PostgresMarketplace>,
    /// Lifecycle service.
    pub lifecycle: PgLifecycle,
    /// Board query service.
    pub board: BoardQueryService<PostgresMarketplace, PostgresMarketplace>,
    guard: EnvelopeGuard<ShapeOnlyVerifier, DefaultClock>,
    // Declared last so the pool closes before the database is dropped.
    _cleanup: CleanupGuard,
}

impl PgMarketplace {
    /// Creates a database from the template and wires the services to it.
    ///
    /// # Errors
    ///
    /// Returns an error if the template, database or pool cannot be set up.
    pub fn new(cluster: &'static TestCluster, prefix: &str) -> eyre::Result<Self> {
        ensure_template(cluster)?;
        let db_name = format!(
            "{prefix}_{}_{}",
            std::process::id(),
            NEXT_DATABASE.fetch_add(1, Ordering::Relaxed)
        );
        cluster
            .create_database_from_template(&*db_name, TEMPLATE_DB)
            .map_err(|e| eyre::eyre!("database setup failed: {e}"))?;
        let cleanup = CleanupGuard {
            cluster: &**cluster,
            db_name: db_name.clone(),
        };

        let url = cluster.connection().database_url(&db_name);
        let pool: MarketplacePgPool = Pool::builder()
            .max_size(4)
            .build(ConnectionManager::<PgConnection>::new(url))?;
        let store = Arc::new(PostgresMarketplace::new(pool));
        let clock = Arc::new(DefaultClock);
        Ok(Self {
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
            _cleanup: cleanup,
        })
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
                CreateTaskRequest::new("Index blocks", "Index blocks 800000 to 800100", bounty_sats)
                    .with_tags(vec!["Indexing".to_owned()]),
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
                SubmitWorkRequest::new(task.id(), "https://example.com/index.parquet"),
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
