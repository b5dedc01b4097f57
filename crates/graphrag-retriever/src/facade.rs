//! `GraphRetriever`: the core library surface. A small config-holding facade
//! wrapping a trait object, composed with the strategy builder so callers
//! can override `select_k`/`start_k`/`adjacent_k`/`max_depth`/`max_traverse`
//! per call without touching the base strategy.

use crate::strategy::{Eager, Strategy, StrategyConfig};
use crate::traversal::{Traversal, TraversalOutcome, TraversalSettings};
use graphrag_core::{EdgeSpec, MetadataFilter, Result, RetrieverSettings, WarningSink};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Constructs a fresh base [`Strategy`] for each invocation; a traversal
/// consumes its strategy, so the facade can't hand out one shared instance.
pub type StrategyFactory = Arc<dyn Fn() -> Box<dyn Strategy> + Send + Sync>;

/// The core library surface: a store adapter, an edge specification, and a
/// base strategy, invoked with optional per-call overrides.
pub struct GraphRetriever {
    store: Arc<dyn graphrag_core::StoreAdapter>,
    edges: EdgeSpec,
    base_strategy: Option<StrategyFactory>,
    settings: RetrieverSettings,
    warning_sink: Option<WarningSink>,
    include_embedding: bool,
}

impl GraphRetriever {
    pub fn new(store: Arc<dyn graphrag_core::StoreAdapter>, edges: EdgeSpec) -> Self {
        Self {
            store,
            edges,
            base_strategy: None,
            settings: RetrieverSettings::default(),
            warning_sink: None,
            include_embedding: false,
        }
    }

    /// Overrides the default `Eager` strategy (built from
    /// `settings.strategy`) with a caller-supplied one.
    pub fn with_strategy(mut self, factory: StrategyFactory) -> Self {
        self.base_strategy = Some(factory);
        self
    }

    /// The base strategy to use when no [`GraphRetriever::with_strategy`]
    /// override is set: `Eager` parameterized by `self.settings.strategy`,
    /// so a caller can tune defaults via [`GraphRetriever::with_settings`]
    /// alone without also providing a strategy factory.
    fn default_strategy(&self) -> Box<dyn Strategy> {
        let defaults = &self.settings.strategy;
        Box::new(Eager::new(StrategyConfig {
            select_k: defaults.select_k,
            start_k: defaults.start_k,
            adjacent_k: defaults.adjacent_k,
            max_traverse: defaults.max_traverse,
            max_depth: defaults.max_depth,
            query_embedding: Vec::new(),
        }))
    }

    pub fn with_settings(mut self, settings: RetrieverSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_warning_sink(mut self, sink: WarningSink) -> Self {
        self.warning_sink = Some(sink);
        self
    }

    /// Controls whether `ainvoke`/`invoke` carry the stored embedding on each
    /// returned [`graphrag_core::Document`]. Off by default — the reserved
    /// embedding metadata key is stripped from results unless a caller opts
    /// in.
    pub fn with_embeddings_in_output(mut self, include: bool) -> Self {
        self.include_embedding = include;
        self
    }

    fn build_traversal(
        &self,
        alternate: Option<Box<dyn Strategy>>,
        overrides: &HashMap<String, serde_json::Value>,
        best_effort: bool,
        include_embedding: bool,
        cancellation: CancellationToken,
    ) -> Result<Traversal> {
        let base = match &self.base_strategy {
            Some(factory) => factory(),
            None => self.default_strategy(),
        };
        let strategy = crate::strategy::build_strategy(base, alternate, overrides, self.warning_sink.as_ref())?;
        let traversal_settings = TraversalSettings {
            adjacency_fanout: self.settings.adjacency_fanout,
            id_chunk_size: self.settings.id_chunk_size,
            include_embedding,
            best_effort,
        };
        Ok(Traversal::new(
            Arc::clone(&self.store),
            self.edges.clone(),
            strategy,
            traversal_settings,
            self.warning_sink.clone(),
            cancellation,
        ))
    }

    /// Cooperative-concurrent invocation.
    pub async fn ainvoke(
        &self,
        query: &str,
        overrides: HashMap<String, serde_json::Value>,
        initial_roots: &[String],
        user_filter: Option<&MetadataFilter>,
    ) -> Result<Vec<graphrag_core::Document>> {
        let mut traversal =
            self.build_traversal(None, &overrides, false, self.include_embedding, CancellationToken::new())?;
        Ok(traversal.atraverse(query, initial_roots, user_filter).await?.into_documents())
    }

    /// Synchronous invocation.
    pub fn invoke(
        &self,
        query: &str,
        overrides: HashMap<String, serde_json::Value>,
        initial_roots: &[String],
        user_filter: Option<&MetadataFilter>,
    ) -> Result<Vec<graphrag_core::Document>> {
        let mut traversal =
            self.build_traversal(None, &overrides, false, self.include_embedding, CancellationToken::new())?;
        Ok(traversal.traverse(query, initial_roots, user_filter)?.into_documents())
    }

    /// Cooperative-concurrent invocation with explicit cancellation and
    /// best-effort/embedding-inclusion control, for callers that need the
    /// full [`TraversalOutcome`] rather than a flattened document list.
    pub async fn ainvoke_with(
        &self,
        query: &str,
        overrides: HashMap<String, serde_json::Value>,
        initial_roots: &[String],
        user_filter: Option<&MetadataFilter>,
        best_effort: bool,
        include_embedding: bool,
        cancellation: CancellationToken,
    ) -> Result<TraversalOutcome> {
        let mut traversal = self.build_traversal(None, &overrides, best_effort, include_embedding, cancellation)?;
        traversal.atraverse(query, initial_roots, user_filter).await
    }

    /// As [`GraphRetriever::ainvoke_with`], but bounds the whole call with a
    /// single overall deadline instead of an externally-managed token.
    pub async fn ainvoke_with_deadline(
        &self,
        query: &str,
        overrides: HashMap<String, serde_json::Value>,
        initial_roots: &[String],
        user_filter: Option<&MetadataFilter>,
        best_effort: bool,
        include_embedding: bool,
        deadline: std::time::Duration,
    ) -> Result<TraversalOutcome> {
        let cancellation = crate::deadline::with_deadline(&CancellationToken::new(), deadline);
        self.ainvoke_with(query, overrides, initial_roots, user_filter, best_effort, include_embedding, cancellation)
            .await
    }
}
