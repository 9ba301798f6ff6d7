use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::foundation::error::{CgError, CgResult};
use crate::render::compositor::OutputBuffer;

/// Configuration provided to an [`OutputSink`] before the first buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkConfig {
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// Number of buffers that will be pushed.
    pub stack_count: usize,
}

/// Consumer of rendered stacks.
///
/// Ordering contract: `push` is called in increasing stack index order.
pub trait OutputSink: Send {
    /// Called once before any buffer is pushed.
    fn begin(&mut self, cfg: SinkConfig) -> CgResult<()>;
    /// Take ownership of one rendered stack.
    fn push(&mut self, stack: usize, buffer: OutputBuffer) -> CgResult<()>;
    /// Called once after the last buffer is pushed.
    fn end(&mut self) -> CgResult<()>;
}

/// In-memory sink for tests and embedding.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    buffers: Vec<(usize, OutputBuffer)>,
    finished: bool,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg
    }

    /// Captured buffers with their stack index.
    pub fn buffers(&self) -> &[(usize, OutputBuffer)] {
        &self.buffers
    }

    /// Return `true` once `end` has been called.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl OutputSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> CgResult<()> {
        self.cfg = Some(cfg);
        self.buffers.clear();
        self.finished = false;
        Ok(())
    }

    fn push(&mut self, stack: usize, buffer: OutputBuffer) -> CgResult<()> {
        self.buffers.push((stack, buffer));
        Ok(())
    }

    fn end(&mut self) -> CgResult<()> {
        self.finished = true;
        Ok(())
    }
}

/// Writes each stack as `<dir>/<prefix><index>.png`.
#[derive(Debug)]
pub struct PngDirSink {
    dir: PathBuf,
    prefix: String,
    written: Vec<PathBuf>,
}

impl PngDirSink {
    /// Sink writing into `dir`, created on `begin` if missing.
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
            written: Vec::new(),
        }
    }

    /// Path used for stack `index`.
    pub fn path_for(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{}{index}.png", self.prefix))
    }

    /// Files written so far.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl OutputSink for PngDirSink {
    fn begin(&mut self, _cfg: SinkConfig) -> CgResult<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("create output dir '{}'", self.dir.display()))?;
        self.written.clear();
        Ok(())
    }

    fn push(&mut self, stack: usize, buffer: OutputBuffer) -> CgResult<()> {
        let path = self.path_for(stack);
        write_png(&path, &buffer)?;
        tracing::debug!(stack, path = %path.display(), "wrote stack png");
        self.written.push(path);
        Ok(())
    }

    fn end(&mut self) -> CgResult<()> {
        Ok(())
    }
}

/// Encode a buffer as PNG bytes.
pub fn encode_png(buffer: &OutputBuffer) -> CgResult<Vec<u8>> {
    let img = to_rgba_image(buffer)?;
    let mut out = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
        .context("encode png")?;
    Ok(out)
}

/// Write a buffer to `path` as PNG.
pub fn write_png(path: &Path, buffer: &OutputBuffer) -> CgResult<()> {
    to_rgba_image(buffer)?
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", path.display()))?;
    Ok(())
}

fn to_rgba_image(buffer: &OutputBuffer) -> CgResult<image::RgbaImage> {
    image::RgbaImage::from_raw(buffer.width, buffer.height, buffer.data.clone()).ok_or_else(|| {
        CgError::validation(format!(
            "output buffer of {} bytes does not match {}x{}",
            buffer.data.len(),
            buffer.width,
            buffer.height
        ))
    })
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
