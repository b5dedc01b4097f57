//! The externally-facing result type.

use crate::node::{Metadata, Node};
use serde::{Deserialize, Serialize};

/// The reserved metadata key an adapter may use to carry an embedding for
/// diagnostic use; stripped from results unless the caller opts in.
pub const RESERVED_EMBEDDING_KEY: &str = "__embedding";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub page_content: String,
    pub metadata: Metadata,
}

impl Document {
    /// Build the externally-facing `Document` from a selected `Node`,
    /// stripping traversal-private keys and the reserved embedding key
    /// unless `include_embedding` is set.
    pub fn from_node(node: &Node, include_embedding: bool) -> Self {
        let mut metadata = node.metadata.clone();
        if include_embedding {
            let embedding: Vec<serde_json::Value> = node
                .embedding
                .iter()
                .map(|v| serde_json::json!(v))
                .collect();
            metadata.insert(RESERVED_EMBEDDING_KEY.to_string(), serde_json::json!(embedding));
        } else {
            metadata.remove(RESERVED_EMBEDDING_KEY);
        }
        Self {
            id: node.id.clone(),
            page_content: node.content.clone(),
            metadata,
        }
    }
}
