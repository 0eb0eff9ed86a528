//! Signature verifier implementations.

mod shape_only;

pub use shape_only::ShapeOnlyVerifier;
