//! The abstract capability set exposed by any backing vector store: a small
//! `async_trait` interface the engine depends on, with concrete backends
//! (Astra, Chroma, SurrealDB, ...) plugging in out of scope of this crate.

use crate::error::Result;
use crate::node::{Content, Metadata};
use crate::types::Edge;
use async_trait::async_trait;
use std::collections::HashSet;

/// An optional metadata filter applied in conjunction with every adapter
/// query. Adapters render this into their native filter language.
pub type MetadataFilter = Metadata;

/// Abstract capability set for a backing vector store.
///
/// Every operation has a cooperative-concurrent counterpart with identical
/// semantics; because the trait is inherently `async`, a synchronous driver
/// simply blocks on these futures.
#[async_trait]
pub trait StoreAdapter: Send + Sync {
    /// Embed `query` and return up to `k` contents ordered by similarity
    /// descending, along with the query embedding. `k = 0` yields an empty
    /// result but still returns a valid embedding.
    async fn search_with_embedding(
        &self,
        query: &str,
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<(Vec<f32>, Vec<Content>)>;

    /// Return up to `k` contents ordered by similarity to `embedding`
    /// descending.
    async fn search(
        &self,
        embedding: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<Content>>;

    /// Return each existing matching content at most once; missing ids are
    /// silently omitted, duplicates deduped.
    async fn get(&self, ids: &[String], filter: Option<&MetadataFilter>) -> Result<Vec<Content>>;

    /// Return up to `k` contents whose metadata satisfies
    /// `user_filter AND (any edge in edges matches)`, the top-`k` by
    /// similarity to `query_embedding` across the union, each id appearing
    /// at most once. `edges` must be nonempty and `k >= 1`.
    async fn adjacent(
        &self,
        edges: &HashSet<Edge>,
        query_embedding: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<Content>>;
}
