//! Container entry access, image decoding and the per-session decoded-layer cache.

/// Named-entry stores (zip and in-memory).
pub mod archive;
/// Decoded-layer cache with in-flight deduplication.
pub mod cache;
/// Raster decoding to straight-alpha RGBA8.
pub mod decode;
