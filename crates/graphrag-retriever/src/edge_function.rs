//! The Edge Function: deterministic derivation of `Edges` from a `Content`
//! given an `EdgeSpec`. A pure function over metadata, independent of any
//! traversal state.

use graphrag_core::{Content, Edge, EdgeRule, EdgeSpec, FieldRef, ScalarValue, WarningKind, WarningSink};

/// Expand a metadata value into its constituent scalars.
///
/// Scalars expand to a single element; arrays expand element-wise, skipping
/// (and warning on) any element that isn't itself a scalar. Any other shape
/// (object, null) warns and yields nothing.
fn expand_values(
    field: &str,
    value: Option<&serde_json::Value>,
    sink: Option<&WarningSink>,
) -> Vec<ScalarValue> {
    let Some(value) = value else {
        return Vec::new();
    };
    match value {
        serde_json::Value::Array(items) => items
            .iter()
            .filter_map(|item| match ScalarValue::from_json(item) {
                Some(v) => Some(v),
                None => {
                    graphrag_core::warnings::emit(
                        sink,
                        graphrag_core::WarningEvent::new(
                            WarningKind::UnsupportedMetadataValue,
                            format!("field {field:?} contains an unsupported array element"),
                        ),
                    );
                    None
                }
            })
            .collect(),
        other => match ScalarValue::from_json(other) {
            Some(v) => vec![v],
            None => {
                graphrag_core::warnings::emit(
                    sink,
                    graphrag_core::WarningEvent::new(
                        WarningKind::UnsupportedMetadataValue,
                        format!("field {field:?} has an unsupported value type"),
                    ),
                );
                Vec::new()
            }
        },
    }
}

/// Derive the incoming/outgoing edges of `content` under `spec`.
///
/// Pure and deterministic: the same `(spec, content)` pair always yields
/// bytewise-identical `Edges`. `sink` receives a warning for every metadata
/// value that can't be expressed as a [`ScalarValue`]; such values are
/// skipped rather than treated as an error.
pub fn derive_edges(spec: &EdgeSpec, content: &Content, sink: Option<&WarningSink>) -> graphrag_core::Edges {
    let mut edges = graphrag_core::Edges::default();
    for rule in &spec.rules {
        apply_rule(rule, content, sink, &mut edges);
    }
    edges
}

fn apply_rule(
    rule: &EdgeRule,
    content: &Content,
    sink: Option<&WarningSink>,
    edges: &mut graphrag_core::Edges,
) {
    match (&rule.source, &rule.target) {
        (FieldRef::Id, FieldRef::Field(dst)) => {
            edges.outgoing.insert(Edge::id(content.id.clone()));
            for v in expand_values(dst, content.metadata.get(dst), sink) {
                edges.incoming.insert(Edge::metadata(dst.clone(), v));
            }
        }
        (FieldRef::Field(src), FieldRef::Id) => {
            edges.incoming.insert(Edge::id(content.id.clone()));
            for v in expand_values(src, content.metadata.get(src), sink) {
                if let ScalarValue::Str(id) = v {
                    edges.outgoing.insert(Edge::id(id));
                } else {
                    graphrag_core::warnings::emit(
                        sink,
                        graphrag_core::WarningEvent::new(
                            WarningKind::UnsupportedMetadataValue,
                            format!("field {src:?} must hold string ids to link to Id"),
                        ),
                    );
                }
            }
        }
        (FieldRef::Field(src), FieldRef::Field(dst)) => {
            for v in expand_values(src, content.metadata.get(src), sink) {
                edges.outgoing.insert(Edge::metadata(dst.clone(), v));
            }
            for v in expand_values(dst, content.metadata.get(dst), sink) {
                edges.incoming.insert(Edge::metadata(dst.clone(), v));
            }
        }
        (FieldRef::Id, FieldRef::Id) => {
            // Degenerate rule; every content links to itself. Harmless but
            // pointless, so it contributes nothing beyond the id edge pair
            // already produced by the other arms.
            edges.outgoing.insert(Edge::id(content.id.clone()));
            edges.incoming.insert(Edge::id(content.id.clone()));
        }
    }
}
