//! Session-oriented API over one opened container.

/// Archive session: store, manifest and cache bundled together.
pub mod archive_session;
