//! cgcompress decodes multi-variant image containers.
//!
//! A container is a zip archive holding a `stack.xml` manifest and a set of layer images. Each
//! `<stack>` of the manifest describes one variant built by compositing offset layers onto a
//! shared canvas. The public API is session-oriented:
//!
//! - Open a container into an [`ArchiveSession`]
//! - Render single stacks or every stack, optionally in parallel
//! - Stream rendered stacks into an [`OutputSink`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

/// Container entry access, decoding and layer cache.
pub mod assets;
/// Composite operator registry.
pub mod composite;
/// Output sinks.
pub mod encode;
/// Shared primitives and errors.
pub mod foundation;
/// Manifest model and parser.
pub mod manifest;
/// Stack compositing.
pub mod render;
/// Session-oriented API.
pub mod session;

pub use crate::foundation::core::{Canvas, Rgba8};
pub use crate::foundation::error::{CgError, CgResult, ManifestError};

pub use crate::assets::archive::{ArchiveStore, MemoryArchiveStore, ZipArchiveStore};
pub use crate::assets::cache::LayerCache;
pub use crate::assets::decode::{DecodedImage, ImageDecoder, RasterDecoder, decode_image};
pub use crate::composite::ops::{BlendFn, CompositeOp, resolve};
pub use crate::encode::sink::{
    InMemorySink, OutputSink, PngDirSink, SinkConfig, encode_png, write_png,
};
pub use crate::manifest::model::{Layer, Manifest, Stack};
pub use crate::manifest::parse::{MANIFEST_ENTRY, parse_manifest};
pub use crate::render::compositor::{LayerSource, OutputBuffer, blend_image, render_stack};
pub use crate::render::pipeline::{RenderAllOpts, render_all_stacks, render_stack_at};
pub use crate::session::archive_session::{
    ArchiveSession, MimetypePolicy, ORA_MIMETYPE, SessionOpts,
};
