use std::path::Path;
use std::sync::Arc;

use crate::assets::archive::{ArchiveStore, ZipArchiveStore, normalize_entry_name};
use crate::assets::cache::LayerCache;
use crate::assets::decode::{DecodedImage, ImageDecoder, RasterDecoder};
use crate::encode::sink::{OutputSink, SinkConfig};
use crate::foundation::error::{CgError, CgResult};
use crate::manifest::model::Manifest;
use crate::manifest::parse::{MANIFEST_ENTRY, parse_manifest};
use crate::render::compositor::{LayerSource, OutputBuffer};
use crate::render::pipeline::{RenderAllOpts, render_all_stacks, render_stack_at};

/// Entry holding the container's media type.
pub const MIMETYPE_ENTRY: &str = "mimetype";
/// Media type expected in [`MIMETYPE_ENTRY`].
pub const ORA_MIMETYPE: &str = "image/openraster";

/// How to treat the `mimetype` entry when opening a container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MimetypePolicy {
    /// A present entry must match [`ORA_MIMETYPE`]; a missing one is only logged.
    #[default]
    Lenient,
    /// The entry must be present and match [`ORA_MIMETYPE`].
    Require,
}

/// Options for [`ArchiveSession::open`].
#[derive(Clone, Debug)]
pub struct SessionOpts {
    /// Entry holding the manifest.
    pub manifest_entry: String,
    /// Mimetype check applied at open.
    pub mimetype: MimetypePolicy,
}

impl Default for SessionOpts {
    fn default() -> Self {
        Self {
            manifest_entry: MANIFEST_ENTRY.to_string(),
            mimetype: MimetypePolicy::default(),
        }
    }
}

/// One opened container: its entries, parsed manifest and decoded-layer cache.
///
/// The cache lives as long as the session, so rendering several stacks (or the same stack
/// twice) decodes each shared layer once.
pub struct ArchiveSession {
    store: Box<dyn ArchiveStore>,
    decoder: Box<dyn ImageDecoder>,
    manifest: Manifest,
    cache: LayerCache,
}

impl std::fmt::Debug for ArchiveSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveSession")
            .field("manifest", &self.manifest)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl ArchiveSession {
    /// Open a session over `store`, checking the mimetype and parsing the manifest.
    #[tracing::instrument(level = "debug", skip_all, fields(manifest = %opts.manifest_entry))]
    pub fn open(
        store: Box<dyn ArchiveStore>,
        decoder: Box<dyn ImageDecoder>,
        opts: &SessionOpts,
    ) -> CgResult<Self> {
        check_mimetype(store.as_ref(), opts.mimetype)?;

        let text = store.text(&opts.manifest_entry)?;
        let manifest = parse_manifest(&text)?;

        let referenced = manifest.asset_names();
        for asset in &referenced {
            if !store.contains(asset) {
                tracing::warn!(asset, "manifest references an asset missing from the container");
            }
        }
        let unreferenced = store
            .entry_names()
            .into_iter()
            .filter(|e| {
                e != MIMETYPE_ENTRY
                    && !same_entry(&opts.manifest_entry, e)
                    && !referenced.iter().any(|a| same_entry(a, e))
            })
            .count();
        if unreferenced > 0 {
            tracing::warn!(unreferenced, "container holds entries no layer references");
        }
        tracing::debug!(
            width = manifest.width,
            height = manifest.height,
            stacks = manifest.stack_count(),
            "opened container"
        );

        Ok(Self {
            store,
            decoder,
            manifest,
            cache: LayerCache::new(),
        })
    }

    /// Open a container file with the default decoder and options.
    pub fn open_path(path: impl AsRef<Path>) -> CgResult<Self> {
        let store = ZipArchiveStore::open(path)?;
        Self::open(
            Box::new(store),
            Box::new(RasterDecoder),
            &SessionOpts::default(),
        )
    }

    /// Open an in-memory container with the default decoder and options.
    pub fn from_bytes(bytes: Vec<u8>) -> CgResult<Self> {
        let store = ZipArchiveStore::from_bytes(bytes)?;
        Self::open(
            Box::new(store),
            Box::new(RasterDecoder),
            &SessionOpts::default(),
        )
    }

    /// Parsed manifest.
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Decoded-layer cache shared by every render of this session.
    pub fn cache(&self) -> &LayerCache {
        &self.cache
    }

    /// Underlying container entries.
    pub fn store(&self) -> &dyn ArchiveStore {
        self.store.as_ref()
    }

    /// Number of renderable stacks.
    pub fn stack_count(&self) -> usize {
        self.manifest.stack_count()
    }

    /// Render stack `index`.
    pub fn render(&self, index: usize) -> CgResult<OutputBuffer> {
        render_stack_at(&self.manifest, index, self)
    }

    /// Render every stack in manifest order.
    pub fn render_all(&self, opts: &RenderAllOpts) -> CgResult<Vec<OutputBuffer>> {
        render_all_stacks(&self.manifest, self, opts)
    }

    /// Render every stack and stream the results into `sink` in stack order.
    pub fn render_into(&self, sink: &mut dyn OutputSink, opts: &RenderAllOpts) -> CgResult<()> {
        let canvas = self.manifest.canvas()?;
        let buffers = self.render_all(opts)?;

        sink.begin(SinkConfig {
            width: canvas.width,
            height: canvas.height,
            stack_count: buffers.len(),
        })?;
        for (index, buffer) in buffers.into_iter().enumerate() {
            sink.push(index, buffer)?;
        }
        sink.end()
    }
}

impl LayerSource for ArchiveSession {
    fn layer_image(&self, asset: &str) -> CgResult<Arc<DecodedImage>> {
        self.cache
            .get(self.store.as_ref(), self.decoder.as_ref(), asset)
    }
}

fn same_entry(asset: &str, entry: &str) -> bool {
    normalize_entry_name(asset).is_ok_and(|a| a == entry)
}

fn check_mimetype(store: &dyn ArchiveStore, policy: MimetypePolicy) -> CgResult<()> {
    if !store.contains(MIMETYPE_ENTRY) {
        return match policy {
            MimetypePolicy::Require => Err(CgError::invalid_container(format!(
                "missing '{MIMETYPE_ENTRY}' entry"
            ))),
            MimetypePolicy::Lenient => {
                tracing::warn!("container has no '{MIMETYPE_ENTRY}' entry");
                Ok(())
            }
        };
    }

    let raw = store.bytes(MIMETYPE_ENTRY)?;
    let found = String::from_utf8_lossy(&raw);
    if found.trim() != ORA_MIMETYPE {
        return Err(CgError::invalid_container(format!(
            "unexpected mimetype '{}', expected '{ORA_MIMETYPE}'",
            found.trim()
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/session/archive_session.rs"]
mod tests;
