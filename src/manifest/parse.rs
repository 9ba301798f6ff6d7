use roxmltree::{Document, Node};

use crate::composite::ops::CompositeOp;
use crate::foundation::error::{CgError, CgResult, ManifestError};
use crate::manifest::model::{Layer, Manifest, Stack, UNSET_DIMENSION};

/// Archive entry holding the manifest.
pub const MANIFEST_ENTRY: &str = "stack.xml";

/// Parse manifest markup text.
pub fn parse_manifest(text: &str) -> CgResult<Manifest> {
    let doc = Document::parse(text).map_err(|e| CgError::MalformedMarkup(e.to_string()))?;
    manifest_from_document(&doc)
}

/// Extract a [`Manifest`] from an already parsed markup tree.
///
/// Elements are looked up among descendants by tag name, so `<stack>` and `<layer>` elements
/// may be wrapped in other elements.
pub fn manifest_from_document(doc: &Document<'_>) -> CgResult<Manifest> {
    let image = single_root(doc)?;

    let width = attr_i32(image, "image", "w", UNSET_DIMENSION)?;
    let height = attr_i32(image, "image", "h", UNSET_DIMENSION)?;

    let stacks = descendants_named(image, "stack")
        .map(|stack| {
            let layers = descendants_named(stack, "layer")
                .map(parse_layer)
                .collect::<CgResult<Vec<_>>>()?;
            Ok(Stack { layers })
        })
        .collect::<CgResult<Vec<_>>>()?;

    Ok(Manifest {
        width,
        height,
        stacks,
    })
}

fn single_root<'a, 'input>(doc: &'a Document<'input>) -> CgResult<Node<'a, 'input>> {
    let mut images = descendants_named(doc.root(), "image");
    let Some(first) = images.next() else {
        return Err(ManifestError::MissingRoot.into());
    };
    let extra = images.count();
    if extra > 0 {
        return Err(ManifestError::DuplicateRoot { count: extra + 1 }.into());
    }
    Ok(first)
}

fn parse_layer(node: Node<'_, '_>) -> CgResult<Layer> {
    let asset_name = node
        .attribute("src")
        .ok_or_else(|| CgError::bad_attribute("layer", "src", "attribute is required"))?
        .to_string();

    let op = match node.attribute("composite-op") {
        Some(id) => CompositeOp::from_id(id)?,
        None => CompositeOp::default(),
    };

    let visible = match node.attribute("visibility") {
        None | Some("visible") => true,
        Some("hidden") => false,
        Some(other) => {
            return Err(CgError::bad_attribute(
                "layer",
                "visibility",
                format!("expected 'visible' or 'hidden', got '{other}'"),
            ));
        }
    };

    Ok(Layer {
        asset_name,
        x: attr_i32(node, "layer", "x", 0)?,
        y: attr_i32(node, "layer", "y", 0)?,
        op,
        name: node.attribute("name").map(str::to_string),
        visible,
        opacity: attr_opacity(node)?,
    })
}

fn attr_opacity(node: Node<'_, '_>) -> CgResult<f32> {
    let Some(raw) = node.attribute("opacity") else {
        return Ok(1.0);
    };
    match raw.trim().parse::<f32>() {
        Ok(v) if (0.0..=1.0).contains(&v) => Ok(v),
        _ => Err(CgError::bad_attribute(
            "layer",
            "opacity",
            format!("expected a number in [0, 1], got '{raw}'"),
        )),
    }
}

fn descendants_named<'a, 'input>(
    node: Node<'a, 'input>,
    tag: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.descendants()
        .filter(move |n| n.is_element() && n.has_tag_name(tag))
}

fn attr_i32(
    node: Node<'_, '_>,
    element: &'static str,
    name: &'static str,
    default: i32,
) -> CgResult<i32> {
    let Some(raw) = node.attribute(name) else {
        return Ok(default);
    };
    raw.trim().parse::<i32>().map_err(|_| {
        CgError::bad_attribute(element, name, format!("expected an integer, got '{raw}'"))
    })
}

#[cfg(test)]
#[path = "../../tests/unit/manifest/parse.rs"]
mod tests;
