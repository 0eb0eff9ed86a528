//! Port contracts for request authentication.

mod verifier;

pub use verifier::{SignatureRejection, SignatureVerifier};

#[cfg(test)]
pub use verifier::MockSignatureVerifier;
