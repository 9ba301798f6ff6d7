use rayon::prelude::*;

use crate::foundation::error::{CgError, CgResult};
use crate::manifest::model::Manifest;
use crate::render::compositor::{LayerSource, OutputBuffer, render_stack};

/// Threading options for rendering every stack of a manifest.
#[derive(Clone, Debug)]
pub struct RenderAllOpts {
    /// Render stacks concurrently on a dedicated rayon pool.
    pub parallel: bool,
    /// Override the number of worker threads. `None` uses rayon defaults.
    pub threads: Option<usize>,
}

impl Default for RenderAllOpts {
    fn default() -> Self {
        Self {
            parallel: true,
            threads: None,
        }
    }
}

/// Render one stack by index, wrapping layer failures in [`CgError::Stack`].
///
/// Canvas and index errors concern the whole manifest and are returned unwrapped.
pub fn render_stack_at(
    manifest: &Manifest,
    index: usize,
    source: &dyn LayerSource,
) -> CgResult<OutputBuffer> {
    manifest.canvas()?;
    let stack = manifest.stack(index)?;
    render_stack(manifest, stack, source).map_err(|e| CgError::Stack {
        stack: index,
        source: Box::new(e),
    })
}

/// Render every stack in manifest order.
///
/// Returns the first failure in stack order. Decoded layers are shared through `source`, so
/// parallel renders of stacks that reuse a layer still decode it once.
pub fn render_all_stacks(
    manifest: &Manifest,
    source: &dyn LayerSource,
    opts: &RenderAllOpts,
) -> CgResult<Vec<OutputBuffer>> {
    manifest.canvas()?;
    let count = manifest.stack_count();

    if !opts.parallel || count <= 1 {
        return (0..count)
            .map(|i| render_stack_at(manifest, i, source))
            .collect();
    }

    let pool = build_thread_pool(opts.threads)?;
    let rendered = pool.install(|| {
        (0..count)
            .into_par_iter()
            .map(|i| render_stack_at(manifest, i, source))
            .collect::<Vec<_>>()
    });
    rendered.into_iter().collect()
}

fn build_thread_pool(threads: Option<usize>) -> CgResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(CgError::validation("'threads' must be >= 1 when set"));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| CgError::validation(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/render/pipeline.rs"]
mod tests;
