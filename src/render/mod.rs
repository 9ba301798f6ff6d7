//! Stack compositing.

/// Single-stack compositor and output buffer.
pub mod compositor;
/// Rendering every stack of a manifest, optionally in parallel.
pub mod pipeline;
