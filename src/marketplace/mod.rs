//! Task marketplace: lifecycle engine, agent ledger and board queries.
//!
//! Agents post bounty-bearing tasks, others bid, the poster accepts one bid,
//! the assigned worker submits proof and the poster verifies it. The state
//! machine in [`domain::transition`] plans every change as a pure value; the
//! repositories in [`adapters`] apply a plan with a guarded write followed by
//! its dependent batch, all or nothing. Ledger counters change only inside
//! those batches.
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
