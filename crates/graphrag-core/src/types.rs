//! The edge model: hashable scalar values, typed edges, and edge specs.
//! Edge values are restricted to a small hashable value type so an edge can
//! live directly in a `HashSet`.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A scalar metadata value, restricted to the types the edge model can match
/// and hash: strings, booleans, integers, and floats (stored as bit patterns
/// so `ScalarValue` can derive `Hash`/`Eq`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScalarValue {
    Str(String),
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl PartialEq for ScalarValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ScalarValue::Str(a), ScalarValue::Str(b)) => a == b,
            (ScalarValue::Bool(a), ScalarValue::Bool(b)) => a == b,
            (ScalarValue::Int(a), ScalarValue::Int(b)) => a == b,
            (ScalarValue::Float(a), ScalarValue::Float(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }
}

impl Eq for ScalarValue {}

impl std::hash::Hash for ScalarValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            ScalarValue::Str(s) => s.hash(state),
            ScalarValue::Bool(b) => b.hash(state),
            ScalarValue::Int(i) => i.hash(state),
            ScalarValue::Float(f) => f.to_bits().hash(state),
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Str(s) => write!(f, "{s}"),
            ScalarValue::Bool(b) => write!(f, "{b}"),
            ScalarValue::Int(i) => write!(f, "{i}"),
            ScalarValue::Float(v) => write!(f, "{v}"),
        }
    }
}

impl ScalarValue {
    /// Attempt to read a single scalar out of a `serde_json::Value`.
    ///
    /// Returns `None` for object/null/array values; those are the caller's
    /// cue to emit an "unsupported value" warning rather than fail.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) => Some(ScalarValue::Str(s.clone())),
            serde_json::Value::Bool(b) => Some(ScalarValue::Bool(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(ScalarValue::Int(i))
                } else {
                    n.as_f64().map(ScalarValue::Float)
                }
            }
            _ => None,
        }
    }
}

/// Either side of an [`EdgeRule`]: a metadata field, or the sentinel
/// referring to a content's own id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldRef {
    Id,
    Field(String),
}

impl From<&str> for FieldRef {
    fn from(s: &str) -> Self {
        FieldRef::Field(s.to_string())
    }
}

impl From<String> for FieldRef {
    fn from(s: String) -> Self {
        FieldRef::Field(s)
    }
}

/// One rule of an [`EdgeSpec`]: `(source_field, target_field)`, where either
/// side may be the `Id` sentinel denoting the content's own id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeRule {
    pub source: FieldRef,
    pub target: FieldRef,
}

impl EdgeRule {
    pub fn new(source: impl Into<FieldRef>, target: impl Into<FieldRef>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// Shorthand for a rule that links a single field to itself, e.g.
    /// `"keywords"` meaning `("keywords", "keywords")`.
    pub fn field(field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            source: FieldRef::Field(field.clone()),
            target: FieldRef::Field(field),
        }
    }
}

impl From<&str> for EdgeRule {
    fn from(field: &str) -> Self {
        EdgeRule::field(field)
    }
}

impl From<(&str, &str)> for EdgeRule {
    fn from((source, target): (&str, &str)) -> Self {
        EdgeRule::new(source, target)
    }
}

/// An ordered list of [`EdgeRule`]s used to derive [`Edges`] from a
/// [`crate::Content`]. Rules are deterministic and applied in order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EdgeSpec {
    pub rules: Vec<EdgeRule>,
}

impl EdgeSpec {
    pub fn new<R: Into<EdgeRule>>(rules: impl IntoIterator<Item = R>) -> Self {
        Self {
            rules: rules.into_iter().map(Into::into).collect(),
        }
    }
}

/// A declarative match predicate on a node's metadata or id.
///
/// `MetadataEdge` matches any content whose `metadata[field] == value` or
/// whose `metadata[field]` is a collection containing `value`. `IdEdge`
/// matches the content with that id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Edge {
    Metadata { field: String, value: ScalarValue },
    Id(String),
}

impl Edge {
    pub fn metadata(field: impl Into<String>, value: ScalarValue) -> Self {
        Edge::Metadata {
            field: field.into(),
            value,
        }
    }

    pub fn id(id: impl Into<String>) -> Self {
        Edge::Id(id.into())
    }
}

/// Incoming and outgoing edges derived from a single content by an
/// [`crate::EdgeFunction`]-shaped operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edges {
    /// Edges by which *other* nodes may find this node.
    pub incoming: HashSet<Edge>,
    /// Edges this node presents, expressed in the incoming vocabulary they
    /// would match.
    pub outgoing: HashSet<Edge>,
}

impl Edges {
    pub fn is_empty(&self) -> bool {
        self.incoming.is_empty() && self.outgoing.is_empty()
    }
}
