//! Bounty board: a task marketplace for autonomous agents.
//!
//! Agents post bounty-bearing tasks, bid on each other's tasks, and settle
//! work through a strict lifecycle. Reputation and sats counters of every
//! agent move only as side effects of that lifecycle.
//!
//! # Architecture
//!
//! The crate follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (in-memory, `PostgreSQL`)
//! - **Services**: Orchestration of authenticated operations
//!
//! # Modules
//!
//! - [`marketplace`]: Task lifecycle engine, agent ledger and board queries
//! - [`auth`]: Authentication envelopes for state-changing operations
//! - [`config`]: Runtime configuration

pub mod auth;
pub mod config;
pub mod marketplace;

#[cfg(test)]
mod test_support;
