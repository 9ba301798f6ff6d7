use crate::foundation::core::Rgba8;
use crate::foundation::error::{CgError, CgResult};

/// Pixel blend function: `(bottom, top) -> result`.
pub type BlendFn = fn(Rgba8, Rgba8) -> Rgba8;

/// Composite operators understood by the manifest `composite-op` attribute.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(into = "&'static str")]
pub enum CompositeOp {
    /// `svg:src-over`: alpha-weighted blend with an always-opaque result.
    #[default]
    SourceOver,
    /// `cgcompress:alpha-replace`: copy the top pixel unless it is the magenta-transparent marker.
    AlphaReplace,
}

impl CompositeOp {
    /// All built-in operators.
    pub const ALL: [CompositeOp; 2] = [CompositeOp::SourceOver, CompositeOp::AlphaReplace];

    /// Resolve a manifest identifier.
    pub fn from_id(id: &str) -> CgResult<Self> {
        match id {
            "svg:src-over" => Ok(Self::SourceOver),
            "cgcompress:alpha-replace" => Ok(Self::AlphaReplace),
            other => Err(CgError::UnsupportedOperator(other.to_string())),
        }
    }

    /// Manifest identifier of this operator.
    pub fn id(self) -> &'static str {
        match self {
            Self::SourceOver => "svg:src-over",
            Self::AlphaReplace => "cgcompress:alpha-replace",
        }
    }

    /// Pixel function implementing this operator.
    pub fn blend_fn(self) -> BlendFn {
        match self {
            Self::SourceOver => source_over,
            Self::AlphaReplace => alpha_replace,
        }
    }
}

impl From<CompositeOp> for &'static str {
    fn from(op: CompositeOp) -> Self {
        op.id()
    }
}

/// Look up the blend function for a manifest identifier.
pub fn resolve(id: &str) -> CgResult<BlendFn> {
    CompositeOp::from_id(id).map(CompositeOp::blend_fn)
}

/// `top` over `bottom` weighted by `top.a`.
///
/// Each colour channel is `(255 - a) * bottom / 255 + a * top / 255` with both terms truncated.
/// The result alpha is always 255: accumulated transparency of `bottom` is not tracked.
pub fn source_over(bottom: Rgba8, top: Rgba8) -> Rgba8 {
    let a = u16::from(top.a);
    let inv = 255 - a;
    let mix = |b: u8, t: u8| -> u8 {
        let out = inv * u16::from(b) / 255 + a * u16::from(t) / 255;
        out as u8
    };

    Rgba8 {
        r: mix(bottom.r, top.r),
        g: mix(bottom.g, top.g),
        b: mix(bottom.b, top.b),
        a: 255,
    }
}

/// `top` replaces `bottom` unless `top` is exactly [`Rgba8::MAGENTA_TRANSPARENT`].
pub fn alpha_replace(bottom: Rgba8, top: Rgba8) -> Rgba8 {
    if top == Rgba8::MAGENTA_TRANSPARENT {
        bottom
    } else {
        top
    }
}

#[cfg(test)]
#[path = "../../tests/unit/composite/ops.rs"]
mod tests;
