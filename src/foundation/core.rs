use crate::foundation::error::{CgError, CgResult};

/// Output canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Validate raw manifest dimensions.
    ///
    /// Negative values (the `-1` sentinel for absent `w`/`h` included) are rejected with
    /// [`CgError::UnknownDimension`].
    pub fn from_manifest(width: i32, height: i32) -> CgResult<Self> {
        match (u32::try_from(width), u32::try_from(height)) {
            (Ok(width), Ok(height)) => Ok(Self { width, height }),
            _ => Err(CgError::UnknownDimension { width, height }),
        }
    }

    /// Byte length of a tightly packed RGBA8 buffer of this size.
    pub fn rgba8_len(self) -> CgResult<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|px| px.checked_mul(4))
            .ok_or_else(|| {
                CgError::validation(format!(
                    "canvas {}x{} is too large",
                    self.width, self.height
                ))
            })
    }
}

/// Straight-alpha RGBA8 pixel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize)]
pub struct Rgba8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Rgba8 {
    /// Fully transparent black, the initial value of every output pixel.
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);

    /// Magenta with zero alpha: marks "no paint here" for alpha-replace layers.
    pub const MAGENTA_TRANSPARENT: Self = Self::new(255, 0, 255, 0);

    /// Construct a pixel from channel values.
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Read a pixel from the first four bytes of `px`.
    #[inline]
    pub fn from_slice(px: &[u8]) -> Self {
        Self::new(px[0], px[1], px[2], px[3])
    }

    /// Channel values in `[r, g, b, a]` order.
    #[inline]
    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
