//! Shared primitives: frame indices, body sides, cancellation, progress, errors, and math helpers.

pub mod core;
pub mod error;
pub mod math;
