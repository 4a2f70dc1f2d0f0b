//! Domain layer types and invariants.

pub mod annotation;
pub mod error;
pub mod sections;
