//! Port contracts for the task marketplace.
//!
//! Ports define infrastructure-agnostic interfaces used by marketplace
//! services.

pub mod repository;

pub use repository::{AgentRepository, RepositoryError, RepositoryResult, TaskRepository};
