//! Request authentication for state-changing marketplace operations.
//!
//! Every mutation carries an [`domain::AuthEnvelope`]: an address, a
//! signature and the ISO-8601 timestamp it signed. The
//! [`services::EnvelopeGuard`] checks freshness and signature shape as an
//! explicit layer and then defers to a pluggable
//! [`ports::SignatureVerifier`] for the cryptographic question. The bundled
//! [`adapters::ShapeOnlyVerifier`] accepts every well-shaped signature.
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
