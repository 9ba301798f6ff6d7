use std::sync::Arc;

/// Convenience result type used across the crate.
pub type CgResult<T> = Result<T, CgError>;

/// Structural problems found while reading a manifest tree.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ManifestError {
    /// The document has no `image` element.
    #[error("manifest has no <image> root element")]
    MissingRoot,

    /// The document has more than one `image` element.
    #[error("manifest has {count} <image> elements, expected exactly 1")]
    DuplicateRoot {
        /// Number of `image` elements found.
        count: usize,
    },

    /// A required attribute is absent or an attribute value cannot be interpreted.
    #[error("bad attribute '{attribute}' on <{element}>: {reason}")]
    BadAttribute {
        /// Element tag name.
        element: &'static str,
        /// Attribute name.
        attribute: &'static str,
        /// Human-readable reason, including the offending value when there is one.
        reason: String,
    },
}

/// Top-level error taxonomy used by decoding and rendering APIs.
///
/// Errors are `Clone` so a failed in-flight decode can be reported to every waiting render.
#[derive(thiserror::Error, Debug, Clone)]
pub enum CgError {
    /// Manifest tree is structurally invalid.
    #[error("manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// Manifest text is not well-formed markup.
    #[error("malformed markup: {0}")]
    MalformedMarkup(String),

    /// A `composite-op` value has no registered operator.
    #[error("unsupported composite operator '{0}'")]
    UnsupportedOperator(String),

    /// The archive has no entry with this name.
    #[error("archive entry not found: '{0}'")]
    EntryNotFound(String),

    /// A layer references an asset that is not in the archive.
    #[error("asset not found: '{0}'")]
    AssetNotFound(String),

    /// The image decoder rejected an asset.
    #[error("failed to decode asset '{name}': {cause}")]
    DecodeFailure {
        /// Asset name.
        name: String,
        /// Decoder failure description.
        cause: String,
    },

    /// Canvas width or height is negative (the `-1` "unset" sentinel included).
    #[error("unknown canvas dimensions {width}x{height}")]
    UnknownDimension {
        /// Manifest width.
        width: i32,
        /// Manifest height.
        height: i32,
    },

    /// Requested stack index does not exist.
    #[error("stack index {index} out of range (manifest has {count} stacks)")]
    StackOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of stacks in the manifest.
        count: usize,
    },

    /// The container is not a usable cgcompress archive.
    #[error("invalid container: {0}")]
    InvalidContainer(String),

    /// Invalid caller-provided options.
    #[error("validation error: {0}")]
    Validation(String),

    /// A layer failed while rendering a stack.
    #[error("layer {layer} ('{asset}'): {source}")]
    Layer {
        /// Index of the layer in manifest order (0 is topmost).
        layer: usize,
        /// Asset name referenced by the layer.
        asset: String,
        /// Underlying failure.
        #[source]
        source: Box<CgError>,
    },

    /// A stack failed to render.
    #[error("stack {stack}: {source}")]
    Stack {
        /// Stack index in manifest order.
        stack: usize,
        /// Underlying failure.
        #[source]
        source: Box<CgError>,
    },

    /// Wrapped lower-level error from dependencies or IO.
    #[error("{0:#}")]
    Other(Arc<anyhow::Error>),
}

impl From<anyhow::Error> for CgError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(Arc::new(err))
    }
}

impl CgError {
    /// Build a [`CgError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`CgError::InvalidContainer`] value.
    pub fn invalid_container(msg: impl Into<String>) -> Self {
        Self::InvalidContainer(msg.into())
    }

    /// Build a [`ManifestError::BadAttribute`] wrapped as [`CgError::Manifest`].
    pub fn bad_attribute(
        element: &'static str,
        attribute: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        Self::Manifest(ManifestError::BadAttribute {
            element,
            attribute,
            reason: reason.into(),
        })
    }

    /// Strip [`CgError::Stack`] and [`CgError::Layer`] context and return the underlying failure.
    pub fn root_cause(&self) -> &CgError {
        match self {
            Self::Layer { source, .. } | Self::Stack { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
