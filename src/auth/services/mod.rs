//! Application services for request authentication.

mod guard;

pub use guard::EnvelopeGuard;
