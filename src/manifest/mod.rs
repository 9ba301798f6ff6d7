//! `stack.xml` manifest model and parser.

/// Manifest, stack and layer types.
pub mod model;
/// XML parsing into [`model::Manifest`].
pub mod parse;
