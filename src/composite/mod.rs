//! Composite operator registry.

/// Operator identifiers and their per-pixel blend functions.
pub mod ops;
