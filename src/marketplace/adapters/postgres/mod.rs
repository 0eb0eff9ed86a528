//! `PostgreSQL` adapters for marketplace persistence.

mod conversion;
mod models;
mod repository;
mod schema;

pub use repository::{MarketplacePgPool, PostgresMarketplace};
