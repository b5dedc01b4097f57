//! `Content` and `Node`: the value types flowing through a traversal, with
//! an open-ended `HashMap<String, JsonValue>` property bag for metadata.

use crate::error::{GraphRetrieverError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// Open-ended metadata bag. Values are scalars (string/bool/int/float) or
/// collections thereof; see [`crate::ScalarValue`] for the subset the edge
/// model understands.
pub type Metadata = HashMap<String, serde_json::Value>;

/// A document as returned by a [`crate::StoreAdapter`].
///
/// Immutable once produced. `id` is unique within one traversal; `embedding`
/// is nonempty; `score`, when present, is a similarity in a documented
/// orientation (higher = more similar).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub id: String,
    pub content: String,
    pub metadata: Metadata,
    pub embedding: Vec<f32>,
    pub score: Option<f32>,
}

impl Content {
    /// Construct a `Content`, enforcing the data-model invariants:
    /// `id` non-empty, `embedding` non-empty.
    pub fn new(
        id: impl Into<String>,
        content: impl Into<String>,
        metadata: Metadata,
        embedding: Vec<f32>,
    ) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(GraphRetrieverError::AdapterData(
                "content id must not be empty".to_string(),
            ));
        }
        if embedding.is_empty() {
            return Err(GraphRetrieverError::AdapterData(format!(
                "content {id} has an empty embedding"
            )));
        }
        Ok(Self {
            id,
            content: content.into(),
            metadata,
            embedding,
            score: None,
        })
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = Some(score);
        self
    }
}

/// A [`Content`] lifted into a traversal, carrying per-traversal depth
/// bookkeeping.
///
/// Equality and hashing are by `id` only, so a node can live in the
/// dedup/visited-set of a traversal without dragging its content along.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub content: String,
    pub metadata: Metadata,
    pub embedding: Vec<f32>,
    pub depth: usize,
    pub extra_metadata: Metadata,
}

impl Node {
    pub fn from_content(content: Content, depth: usize) -> Self {
        Self {
            id: content.id,
            content: content.content,
            metadata: content.metadata,
            embedding: content.embedding,
            depth,
            extra_metadata: Metadata::new(),
        }
    }

    /// Recreate the immutable [`Content`] view of this node (e.g. to feed
    /// back through the edge function).
    pub fn as_content(&self) -> Content {
        Content {
            id: self.id.clone(),
            content: self.content.clone(),
            metadata: self.metadata.clone(),
            embedding: self.embedding.clone(),
            score: None,
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn content_rejects_empty_id() {
        let err = Content::new("", "text", Metadata::new(), vec![1.0]).unwrap_err();
        assert!(matches!(err, GraphRetrieverError::AdapterData(_)));
    }

    #[test]
    fn content_rejects_empty_embedding() {
        let err = Content::new("a", "text", Metadata::new(), vec![]).unwrap_err();
        assert!(matches!(err, GraphRetrieverError::AdapterData(_)));
    }

    #[test]
    fn node_equality_and_hash_are_by_id_only() {
        let c1 = Content::new("same", "a", Metadata::new(), vec![1.0]).unwrap();
        let c2 = Content::new("same", "different text", Metadata::new(), vec![2.0]).unwrap();
        let n1 = Node::from_content(c1, 0);
        let n2 = Node::from_content(c2, 3);
        assert_eq!(n1, n2);

        let mut set = HashSet::new();
        set.insert(n1);
        set.insert(n2);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn as_content_round_trips_fields() {
        let mut metadata = Metadata::new();
        metadata.insert("k".to_string(), serde_json::json!("v"));
        let content = Content::new("id1", "hello", metadata, vec![0.1, 0.2]).unwrap();
        let node = Node::from_content(content, 2);
        let back = node.as_content();
        assert_eq!(back.id, "id1");
        assert_eq!(back.content, "hello");
        assert_eq!(back.embedding, vec![0.1, 0.2]);
    }
}
