//! Shared primitives: canvas geometry, pixels and the crate error type.

/// Canvas and pixel primitives.
pub mod core;
/// Error type and result alias.
pub mod error;
