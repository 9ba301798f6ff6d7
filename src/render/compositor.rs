use std::sync::Arc;

use crate::assets::decode::DecodedImage;
use crate::composite::ops::{self, CompositeOp};
use crate::foundation::core::{Canvas, Rgba8};
use crate::foundation::error::{CgError, CgResult};
use crate::manifest::model::{Layer, Manifest, Stack};

/// Flattened stack pixels, straight-alpha RGBA8.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputBuffer {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major. Always `width * height * 4` long.
    pub data: Vec<u8>,
}

impl OutputBuffer {
    /// Fully transparent buffer covering `canvas`.
    pub fn transparent(canvas: Canvas) -> CgResult<Self> {
        Ok(Self {
            width: canvas.width,
            height: canvas.height,
            data: vec![0u8; canvas.rgba8_len()?],
        })
    }

    /// Pixel at `(x, y)`, or `None` outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        Some(Rgba8::from_slice(&self.data[idx..idx + 4]))
    }
}

/// Provides decoded layer images by asset name.
pub trait LayerSource: Sync {
    /// Decoded image for `asset`.
    fn layer_image(&self, asset: &str) -> CgResult<Arc<DecodedImage>>;
}

/// Flatten `stack` into a buffer sized by the manifest canvas.
///
/// Layers are drawn from the last manifest entry to the first, so `stack.layers[0]` ends up on
/// top. Failures of individual layers are wrapped in [`CgError::Layer`].
#[tracing::instrument(level = "debug", skip_all, fields(layers = stack.layers.len()))]
pub fn render_stack(
    manifest: &Manifest,
    stack: &Stack,
    source: &dyn LayerSource,
) -> CgResult<OutputBuffer> {
    let canvas = manifest.canvas()?;
    let mut out = OutputBuffer::transparent(canvas)?;

    for (index, layer) in stack.layers.iter().enumerate().rev() {
        if !layer.visible {
            continue;
        }
        draw_layer(&mut out, layer, source).map_err(|e| CgError::Layer {
            layer: index,
            asset: layer.asset_name.clone(),
            source: Box::new(e),
        })?;
    }

    Ok(out)
}

fn draw_layer(out: &mut OutputBuffer, layer: &Layer, source: &dyn LayerSource) -> CgResult<()> {
    let img = source.layer_image(&layer.asset_name)?;
    blend_image(out, &img, layer.x, layer.y, layer.op, layer.opacity)
}

/// Blend `img` onto `out` with its top-left corner at `(x, y)`.
///
/// `opacity` scales the top alpha of source-over layers and is ignored by alpha-replace. Pixels
/// that land outside `out` are clipped. Fails when either pixel buffer does not match its
/// dimensions.
pub fn blend_image(
    out: &mut OutputBuffer,
    img: &DecodedImage,
    x: i32,
    y: i32,
    op: CompositeOp,
    opacity: f32,
) -> CgResult<()> {
    img.check_len()?;
    let expected = Canvas {
        width: out.width,
        height: out.height,
    }
    .rgba8_len()?;
    if out.data.len() != expected {
        return Err(CgError::validation(format!(
            "output buffer of {} bytes does not match {}x{}",
            out.data.len(),
            out.width,
            out.height
        )));
    }
    // Dispatch once per layer; each arm gets its own monomorphized loop.
    match op {
        CompositeOp::SourceOver if opacity < 1.0 => {
            let opacity = opacity.max(0.0);
            blend_clipped(out, img, x, y, |bottom, top: Rgba8| {
                let a = (f32::from(top.a) * opacity).round() as u8;
                ops::source_over(bottom, Rgba8 { a, ..top })
            })
        }
        CompositeOp::SourceOver => blend_clipped(out, img, x, y, ops::source_over),
        CompositeOp::AlphaReplace => blend_clipped(out, img, x, y, ops::alpha_replace),
    }
    Ok(())
}

#[inline(always)]
fn blend_clipped<F>(out: &mut OutputBuffer, img: &DecodedImage, x: i32, y: i32, blend: F)
where
    F: Fn(Rgba8, Rgba8) -> Rgba8,
{
    let (ox, oy) = (i64::from(x), i64::from(y));
    let x0 = ox.max(0);
    let y0 = oy.max(0);
    let x1 = (ox + i64::from(img.width)).min(i64::from(out.width));
    let y1 = (oy + i64::from(img.height)).min(i64::from(out.height));
    if x0 >= x1 || y0 >= y1 {
        return;
    }

    let out_w = out.width as usize;
    let img_w = img.width as usize;
    let span = (x1 - x0) as usize;
    let src_x = (x0 - ox) as usize;

    for dst_y in y0..y1 {
        let src_y = (dst_y - oy) as usize;
        let src_start = (src_y * img_w + src_x) * 4;
        let dst_start = ((dst_y as usize) * out_w + x0 as usize) * 4;

        let src_row = &img.rgba8[src_start..src_start + span * 4];
        let dst_row = &mut out.data[dst_start..dst_start + span * 4];
        for (d, s) in dst_row.chunks_exact_mut(4).zip(src_row.chunks_exact(4)) {
            let px = blend(Rgba8::from_slice(d), Rgba8::from_slice(s));
            d.copy_from_slice(&px.to_array());
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
