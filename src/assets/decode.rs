use anyhow::Context;

use crate::foundation::core::Rgba8;
use crate::foundation::error::{CgError, CgResult};

/// Decoded layer image in straight-alpha RGBA8.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row-major RGBA8 bytes, tightly packed.
    pub rgba8: Vec<u8>,
}

impl DecodedImage {
    /// Wrap a pixel buffer, checking that its length is `width * height * 4`.
    pub fn from_rgba8(width: u32, height: u32, rgba8: Vec<u8>) -> CgResult<Self> {
        let img = Self {
            width,
            height,
            rgba8,
        };
        img.check_len()?;
        Ok(img)
    }

    /// Check that the pixel buffer holds exactly `width * height * 4` bytes.
    pub fn check_len(&self) -> CgResult<()> {
        let expected = (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|px| px.checked_mul(4));
        if expected != Some(self.rgba8.len()) {
            return Err(CgError::validation(format!(
                "rgba8 buffer of {} bytes does not match {}x{}",
                self.rgba8.len(),
                self.width,
                self.height
            )));
        }
        Ok(())
    }

    /// Image of the given size filled with one colour.
    pub fn filled(width: u32, height: u32, px: Rgba8) -> Self {
        let count = (width as usize) * (height as usize);
        Self {
            width,
            height,
            rgba8: px.to_array().repeat(count),
        }
    }

    /// Pixel at `(x, y)`, or `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        Some(Rgba8::from_slice(&self.rgba8[idx..idx + 4]))
    }
}

/// Turns an encoded asset into pixels.
pub trait ImageDecoder: Send + Sync {
    /// Decode `bytes` into a straight-alpha RGBA8 image.
    fn decode(&self, bytes: &[u8]) -> anyhow::Result<DecodedImage>;
}

impl<F> ImageDecoder for F
where
    F: Fn(&[u8]) -> anyhow::Result<DecodedImage> + Send + Sync,
{
    fn decode(&self, bytes: &[u8]) -> anyhow::Result<DecodedImage> {
        self(bytes)
    }
}

/// Decoder backed by the `image` crate (WebP, PNG and the other formats it is built with).
#[derive(Clone, Copy, Debug, Default)]
pub struct RasterDecoder;

impl ImageDecoder for RasterDecoder {
    fn decode(&self, bytes: &[u8]) -> anyhow::Result<DecodedImage> {
        decode_image(bytes)
    }
}

/// Decode an encoded raster image to straight-alpha RGBA8.
pub fn decode_image(bytes: &[u8]) -> anyhow::Result<DecodedImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    Ok(DecodedImage {
        width,
        height,
        rgba8: rgba.into_raw(),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
