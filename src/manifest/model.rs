use std::collections::BTreeSet;

use crate::composite::ops::CompositeOp;
use crate::foundation::core::Canvas;
use crate::foundation::error::{CgError, CgResult};

/// Value of `w`/`h` when the attribute is absent from `<image>`.
pub const UNSET_DIMENSION: i32 = -1;

/// One placed, offset, operator-tagged reference to an image asset.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Layer {
    /// Archive entry holding the encoded image; also the decode cache key.
    pub asset_name: String,
    /// Horizontal offset of the layer's left edge on the canvas. May be negative.
    pub x: i32,
    /// Vertical offset of the layer's top edge on the canvas. May be negative.
    pub y: i32,
    /// Operator used to blend this layer onto the pixels below it.
    pub op: CompositeOp,
    /// Optional display name from the manifest.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Hidden layers are skipped while rendering.
    pub visible: bool,
    /// Multiplier in `[0, 1]` applied to the alpha of source-over layers.
    pub opacity: f32,
}

impl Layer {
    /// Visible source-over layer at `(x, y)`.
    pub fn new(asset_name: impl Into<String>, x: i32, y: i32) -> Self {
        Self {
            asset_name: asset_name.into(),
            x,
            y,
            op: CompositeOp::SourceOver,
            name: None,
            visible: true,
            opacity: 1.0,
        }
    }

    /// Replace the composite operator.
    pub fn with_op(mut self, op: CompositeOp) -> Self {
        self.op = op;
        self
    }

    /// Replace the opacity.
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }
}

/// Ordered layer placements describing one renderable variant.
///
/// `layers[0]` is the topmost layer; the last entry is drawn first.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct Stack {
    /// Layers in manifest order (front to back).
    pub layers: Vec<Layer>,
}

/// Parsed `stack.xml`: canvas size plus every stack.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Manifest {
    /// Raw `w` attribute; [`UNSET_DIMENSION`] when absent.
    pub width: i32,
    /// Raw `h` attribute; [`UNSET_DIMENSION`] when absent.
    pub height: i32,
    /// Stacks in document order.
    pub stacks: Vec<Stack>,
}

impl Manifest {
    /// Validated canvas size.
    pub fn canvas(&self) -> CgResult<Canvas> {
        Canvas::from_manifest(self.width, self.height)
    }

    /// Number of stacks (renderable variants).
    pub fn stack_count(&self) -> usize {
        self.stacks.len()
    }

    /// Borrow a stack by index.
    pub fn stack(&self, index: usize) -> CgResult<&Stack> {
        self.stacks.get(index).ok_or(CgError::StackOutOfRange {
            index,
            count: self.stacks.len(),
        })
    }

    /// Distinct asset names referenced by any stack, sorted.
    pub fn asset_names(&self) -> BTreeSet<&str> {
        self.stacks
            .iter()
            .flat_map(|s| s.layers.iter())
            .map(|l| l.asset_name.as_str())
            .collect()
    }
}
