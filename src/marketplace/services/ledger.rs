//! Agent ledger service.
//!
//! The only write path here is identity upsert; counters change solely as
//! part of lifecycle commits.

use super::error::MarketplaceResult;
use crate::marketplace::{
    domain::{Agent, AgentProfile},
    ports::AgentRepository,
};
use mockable::Clock;
use std::sync::Arc;
use tracing::debug;

/// Agent identity service.
///
/// Reads go through [`super::BoardQueryService`], which never creates
/// agents.
#[derive(Clone)]
pub struct AgentLedgerService<A, C>
where
    A: AgentRepository,
    C: Clock + Send + Sync,
{
    agents: Arc<A>,
    clock: Arc<C>,
}

impl<A, C> AgentLedgerService<A, C>
where
    A: AgentRepository,
    C: Clock + Send + Sync,
{
    /// Creates a new ledger service.
    #[must_use]
    pub const fn new(agents: Arc<A>, clock: Arc<C>) -> Self {
        Self { agents, clock }
    }

    /// Returns the agent for `profile`, creating a zeroed entry on first
    /// reference.
    ///
    /// Known display names and secondary addresses are kept when the
    /// profile omits them, so repeated calls are idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`super::MarketplaceError::Repository`] when persistence
    /// fails.
    pub async fn get_or_create(&self, profile: &AgentProfile) -> MarketplaceResult<Agent> {
        let agent = self.agents.upsert(profile, self.clock.utc()).await?;
        debug!(address = %agent.address(), "agent upserted");
        Ok(agent)
    }
}
