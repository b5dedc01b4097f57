//! The adjacency query planner: a pure function over an edge set that
//! partitions it into backend-agnostic query descriptors an adapter can
//! render natively, grouping edges by field before building a query.

use graphrag_core::{Edge, ScalarValue};
use std::collections::HashMap;

/// One query an adapter should issue, already grouped so a native `IN` /
/// any-of predicate applies.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryDescriptor {
    /// `metadata[field] IN values` (scalar equality or list-membership).
    SingleField { field: String, values: Vec<ScalarValue> },
    /// `id IN ids`, pre-chunked to `chunk_size`.
    Ids { ids: Vec<String> },
}

/// Default chunk size for `id IN {...}` queries.
pub const DEFAULT_ID_CHUNK_SIZE: usize = 100;

/// Partition `edges` into query descriptors.
///
/// `MetadataEdge`s are grouped by field (the `single_meta` bucket in the
/// spec; `multi_meta` is reserved for future multi-field edges and is
/// unreachable with the current single-field `Edge` model). `IdEdge`s are
/// collected into one `id IN {...}` query and split into chunks of at most
/// `id_chunk_size`.
pub fn plan_adjacency_queries(edges: &std::collections::HashSet<Edge>, id_chunk_size: usize) -> Vec<QueryDescriptor> {
    let chunk_size = id_chunk_size.max(1);
    let mut by_field: HashMap<String, Vec<ScalarValue>> = HashMap::new();
    let mut ids: Vec<String> = Vec::new();

    for edge in edges {
        match edge {
            Edge::Metadata { field, value } => {
                by_field.entry(field.clone()).or_default().push(value.clone());
            }
            Edge::Id(id) => ids.push(id.clone()),
        }
    }

    let mut descriptors: Vec<QueryDescriptor> = Vec::new();

    let mut fields: Vec<_> = by_field.into_iter().collect();
    fields.sort_by(|(a, _), (b, _)| a.cmp(b));
    for (field, mut values) in fields {
        values.sort_by(|a, b| a.to_string().cmp(&b.to_string()));
        descriptors.push(QueryDescriptor::SingleField { field, values });
    }

    ids.sort();
    for chunk in ids.chunks(chunk_size) {
        descriptors.push(QueryDescriptor::Ids { ids: chunk.to_vec() });
    }

    descriptors
}
