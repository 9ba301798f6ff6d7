//! Output sinks.
//!
//! Sinks consume rendered stacks in stack order and are used by `ArchiveSession::render_into`.

/// Generic output sink trait, built-in sinks and PNG encoding.
pub mod sink;
