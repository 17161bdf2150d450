//! Layered override merge.
//!
//! Layers are folded left to right, later layers winning. A plain key
//! replaces whatever the earlier layers held. A key ending in the merge
//! marker (`where+`, `select+`) asks for structural combination instead:
//!
//! - mapping over mapping merges recursively,
//! - sequence over sequence concatenates in layer order,
//! - anything else (scalars, mismatched shapes, no prior value) is a
//!   plain insertion.
//!
//! The marker never survives into the output. Malformed marker usage is
//! silently treated as a plain key.
//!
//! ```
//! use yasql_core::{merge, Document, Value};
//!
//! let base = Document::new().with("where", vec![Value::from("a = 1")]);
//! let layer = Document::new().with("where+", vec![Value::from("b = 2")]);
//! let merged = merge(&[base, layer]);
//! assert_eq!(merged.get("where").and_then(Value::as_sequence).map(<[_]>::len), Some(2));
//! ```

use crate::value::{Document, Value};

/// The trailing sigil requesting structural combination.
pub const MERGE_MARKER: char = '+';

/// Split a key into its bare name and whether it carries the merge marker.
///
/// A key consisting only of the marker is not considered marked.
pub fn split_marker(key: &str) -> (&str, bool) {
    match key.strip_suffix(MERGE_MARKER) {
        Some(bare) if !bare.is_empty() => (bare, true),
        _ => (key, false),
    }
}

/// Merge layers in order, later layers taking priority.
pub fn merge(layers: &[Document]) -> Document {
    let mut out = Document::new();
    for layer in layers {
        merge_into(&mut out, layer);
    }
    out
}

/// Merge a single layer on top of `base`.
pub fn merge_into(base: &mut Document, layer: &Document) {
    fold(base, layer, false);
}

/// Resolve all merge markers in a document against nothing.
pub fn normalize(doc: &Document) -> Document {
    let mut out = Document::new();
    merge_into(&mut out, doc);
    out
}

/// Fold `overlay` over `base`, combining nested mappings even under plain
/// keys.
///
/// The overlay still wins every scalar or sequence conflict, and its merge
/// markers behave as in [`merge`] wherever two values meet. Values that do
/// not meet anything are kept as written, markers included, so query
/// bodies keep their `select+` for the template pass.
pub fn merge_under(base: &Document, overlay: &Document) -> Document {
    let mut out = base.clone();
    fold(&mut out, overlay, true);
    out
}

fn fold(base: &mut Document, layer: &Document, deep: bool) {
    let insert = |value: &Value| if deep { value.clone() } else { normalize_value(value) };
    for (raw_key, value) in layer.iter() {
        let (key, marked) = split_marker(raw_key);
        match (base.get_mut(key), value) {
            (Some(Value::Mapping(prior)), Value::Mapping(incoming)) if marked || deep => {
                fold(prior, incoming, deep);
            }
            (Some(Value::Sequence(prior)), Value::Sequence(incoming)) if marked => {
                prior.extend(incoming.iter().map(insert));
            }
            _ => {
                base.insert(key, insert(value));
            }
        }
    }
}

fn normalize_value(value: &Value) -> Value {
    match value {
        Value::Mapping(doc) => Value::Mapping(normalize(doc)),
        Value::Sequence(items) => Value::Sequence(items.iter().map(normalize_value).collect()),
        other => other.clone(),
    }
}
