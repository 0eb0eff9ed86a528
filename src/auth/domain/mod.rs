//! Domain types for request authentication.

mod envelope;
mod error;

pub use envelope::{AuthEnvelope, AuthenticatedActor, MarketplaceAction, SignedMessage};
pub use error::AuthError;
