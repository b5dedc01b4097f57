//! The reference `StoreAdapter`: brute-force cosine similarity over a
//! `DashMap`-backed in-memory content set. Iterate, score, sort, truncate —
//! no index to maintain.

use async_trait::async_trait;
use dashmap::DashMap;
use graphrag_core::{Content, Edge, MetadataFilter, Result, ScalarValue, StoreAdapter};
use std::collections::HashSet;
use std::sync::Arc;

/// Embeds a text query into a vector. Embedding models themselves are out
/// of scope, so the reference adapter takes one as a plug-in rather than
/// hard-coding a scheme.
pub type Embedder = Arc<dyn Fn(&str) -> Vec<f32> + Send + Sync>;

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

fn matches_filter(content: &Content, filter: Option<&MetadataFilter>) -> bool {
    let Some(filter) = filter else {
        return true;
    };
    filter.iter().all(|(field, expected)| content.metadata.get(field) == Some(expected))
}

fn matches_edge(content: &Content, edge: &Edge) -> bool {
    match edge {
        Edge::Id(id) => &content.id == id,
        Edge::Metadata { field, value } => match content.metadata.get(field) {
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .any(|item| ScalarValue::from_json(item).as_ref() == Some(value)),
            Some(other) => ScalarValue::from_json(other).as_ref() == Some(value),
            None => false,
        },
    }
}

/// An in-memory, brute-force `StoreAdapter`. Intended as the reference
/// adapter for tests and small corpora, not a production backend.
pub struct InMemoryStore {
    contents: DashMap<String, Content>,
    embedder: Embedder,
}

impl InMemoryStore {
    pub fn new(embedder: Embedder) -> Self {
        Self {
            contents: DashMap::new(),
            embedder,
        }
    }

    pub fn from_contents(embedder: Embedder, contents: impl IntoIterator<Item = Content>) -> Self {
        let store = Self::new(embedder);
        for content in contents {
            store.insert(content);
        }
        store
    }

    pub fn insert(&self, content: Content) {
        self.contents.insert(content.id.clone(), content);
    }

    fn ranked(&self, embedding: &[f32], k: usize, filter: Option<&MetadataFilter>) -> Vec<Content> {
        let mut scored: Vec<Content> = self
            .contents
            .iter()
            .filter(|entry| matches_filter(entry.value(), filter))
            .map(|entry| {
                let mut content = entry.value().clone();
                content.score = Some(cosine_similarity(&content.embedding, embedding));
                content
            })
            .collect();
        scored.sort_by(|a, b| b.score.unwrap().total_cmp(&a.score.unwrap()).then_with(|| a.id.cmp(&b.id)));
        scored.truncate(k);
        scored
    }
}

#[async_trait]
impl StoreAdapter for InMemoryStore {
    async fn search_with_embedding(
        &self,
        query: &str,
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<(Vec<f32>, Vec<Content>)> {
        let embedding = (self.embedder)(query);
        Ok((embedding.clone(), self.ranked(&embedding, k, filter)))
    }

    async fn search(&self, embedding: &[f32], k: usize, filter: Option<&MetadataFilter>) -> Result<Vec<Content>> {
        Ok(self.ranked(embedding, k, filter))
    }

    async fn get(&self, ids: &[String], filter: Option<&MetadataFilter>) -> Result<Vec<Content>> {
        let wanted: HashSet<&String> = ids.iter().collect();
        let mut seen = HashSet::new();
        Ok(self
            .contents
            .iter()
            .filter(|entry| wanted.contains(entry.key()) && matches_filter(entry.value(), filter))
            .filter(|entry| seen.insert(entry.key().clone()))
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn adjacent(
        &self,
        edges: &HashSet<Edge>,
        query_embedding: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<Content>> {
        if edges.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let mut scored: Vec<Content> = self
            .contents
            .iter()
            .filter(|entry| matches_filter(entry.value(), filter))
            .filter(|entry| edges.iter().any(|edge| matches_edge(entry.value(), edge)))
            .map(|entry| {
                let mut content = entry.value().clone();
                content.score = Some(cosine_similarity(&content.embedding, query_embedding));
                content
            })
            .collect();
        scored.sort_by(|a, b| b.score.unwrap().total_cmp(&a.score.unwrap()).then_with(|| a.id.cmp(&b.id)));
        scored.truncate(k);
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphrag_core::Metadata;

    fn embedder() -> Embedder {
        Arc::new(|_q: &str| vec![1.0, 0.0])
    }

    fn content(id: &str, embedding: Vec<f32>) -> Content {
        Content::new(id, id, Metadata::new(), embedding).unwrap()
    }

    #[tokio::test]
    async fn search_orders_by_similarity_descending() {
        let store = InMemoryStore::from_contents(
            embedder(),
            vec![content("a", vec![0.0, 1.0]), content("b", vec![1.0, 0.0])],
        );
        let (_, results) = store.search_with_embedding("q", 2, None).await.unwrap();
        assert_eq!(results[0].id, "b");
        assert_eq!(results[1].id, "a");
    }

    #[tokio::test]
    async fn get_dedupes_and_drops_missing_ids() {
        let store = InMemoryStore::from_contents(embedder(), vec![content("a", vec![1.0])]);
        let results = store
            .get(&["a".to_string(), "a".to_string(), "missing".to_string()], None)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn adjacent_matches_metadata_collection_membership() {
        let mut metadata = Metadata::new();
        metadata.insert("keywords".to_string(), serde_json::json!(["agile", "small"]));
        let c = Content::new("fox", "fox", metadata, vec![1.0]).unwrap();
        let store = InMemoryStore::from_contents(embedder(), vec![c]);
        let mut edges = HashSet::new();
        edges.insert(Edge::metadata("keywords", ScalarValue::Str("agile".into())));
        let results = store.adjacent(&edges, &[1.0], 10, None).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "fox");
    }

    #[tokio::test]
    async fn adjacent_with_empty_edges_returns_empty() {
        let store = InMemoryStore::from_contents(embedder(), vec![content("a", vec![1.0])]);
        let results = store.adjacent(&HashSet::new(), &[1.0], 10, None).await.unwrap();
        assert!(results.is_empty());
    }
}
