//! In-memory adapters for the task marketplace.

mod marketplace;

pub use marketplace::InMemoryMarketplace;
