//! The Traversal Engine: orchestrates seeding, iterative frontier expansion,
//! edge extraction, adjacency fetching, strategy callbacks, deduplication,
//! depth/limit enforcement, cancellation, and finalization, following a
//! seed/neighborhood-roots/iterate/finalize protocol with a single-use
//! guard. Intra-round fan-out uses `tokio::sync::Semaphore`; cancellation
//! uses `tokio_util::sync::CancellationToken`.

use crate::edge_function;
use crate::planner::{self, QueryDescriptor};
use crate::strategy::{NodeTracker, Strategy};
use crate::top_k;
use graphrag_core::{
    Document, Edge, GraphRetrieverError, MetadataFilter, Node, PartialFailure, Result, StoreAdapter, WarningSink,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Ambient tuning carried into a single traversal (fan-out bound, id-chunk
/// size); separate from [`graphrag_core::RetrieverSettings`] so a facade can
/// supply either the loaded settings or literal values in tests.
#[derive(Debug, Clone)]
pub struct TraversalSettings {
    pub adjacency_fanout: usize,
    pub id_chunk_size: usize,
    pub include_embedding: bool,
    pub best_effort: bool,
}

impl Default for TraversalSettings {
    fn default() -> Self {
        Self {
            adjacency_fanout: 5,
            id_chunk_size: planner::DEFAULT_ID_CHUNK_SIZE,
            include_embedding: false,
            best_effort: false,
        }
    }
}

/// The result of a traversal: either complete, or (in best-effort mode) a
/// partial result annotated with the error that stopped it.
#[derive(Debug)]
pub enum TraversalOutcome {
    Complete(Vec<Document>),
    Partial(PartialFailure<Vec<Document>>),
}

impl TraversalOutcome {
    pub fn into_documents(self) -> Vec<Document> {
        match self {
            TraversalOutcome::Complete(docs) => docs,
            TraversalOutcome::Partial(failure) => failure.partial,
        }
    }
}

/// A single-use traversal. Re-invoking `traverse`/`atraverse` after
/// completion returns [`GraphRetrieverError::TraversalReuse`].
pub struct Traversal {
    store: Arc<dyn StoreAdapter>,
    edge_spec: graphrag_core::EdgeSpec,
    strategy: Box<dyn Strategy>,
    settings: TraversalSettings,
    warning_sink: Option<WarningSink>,
    cancellation: CancellationToken,
    used: bool,
    skipped_count: Arc<AtomicUsize>,
    expanded_count: usize,
}

impl Traversal {
    pub fn new(
        store: Arc<dyn StoreAdapter>,
        edge_spec: graphrag_core::EdgeSpec,
        strategy: Box<dyn Strategy>,
        settings: TraversalSettings,
        warning_sink: Option<WarningSink>,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            store,
            edge_spec,
            strategy,
            settings,
            warning_sink,
            cancellation,
            used: false,
            skipped_count: Arc::new(AtomicUsize::new(0)),
            expanded_count: 0,
        }
    }

    /// Number of adapter calls skipped so far because they returned
    /// [`GraphRetrieverError::AdapterData`] (logged and counted, never
    /// fatal).
    pub fn skipped_count(&self) -> usize {
        self.skipped_count.load(Ordering::Relaxed)
    }

    /// Number of nodes actually expanded (had their outgoing edges
    /// collected) so far, after `max_traverse` truncation — never exceeds
    /// the configured cap.
    pub fn expanded_count(&self) -> usize {
        self.expanded_count
    }

    /// Turns an `AdapterData` failure into `T::default()`, counting it in
    /// `skipped_count`; every other error kind still aborts the round.
    fn absorb_adapter_data<T: Default>(&self, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => Ok(value),
            Err(GraphRetrieverError::AdapterData(message)) => {
                tracing::warn!(%message, "adapter data error, skipping");
                self.skipped_count.fetch_add(1, Ordering::Relaxed);
                Ok(T::default())
            }
            Err(other) => Err(other),
        }
    }

    /// Cooperative-concurrent entry point.
    pub async fn atraverse(
        &mut self,
        query: &str,
        initial_roots: &[String],
        user_filter: Option<&MetadataFilter>,
    ) -> Result<TraversalOutcome> {
        if self.used {
            return Err(GraphRetrieverError::TraversalReuse);
        }
        self.used = true;
        self.run(query, initial_roots, user_filter).await
    }

    /// Synchronous entry point. Blocks on a dedicated current-thread
    /// runtime, for a synchronous driver over an inherently async adapter.
    pub fn traverse(
        &mut self,
        query: &str,
        initial_roots: &[String],
        user_filter: Option<&MetadataFilter>,
    ) -> Result<TraversalOutcome> {
        if self.used {
            return Err(GraphRetrieverError::TraversalReuse);
        }
        self.used = true;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| GraphRetrieverError::Configuration(format!("failed to start runtime: {e}")))?;
        runtime.block_on(self.run(query, initial_roots, user_filter))
    }

    async fn run(
        &mut self,
        query: &str,
        initial_roots: &[String],
        user_filter: Option<&MetadataFilter>,
    ) -> Result<TraversalOutcome> {
        let select_k = self.strategy.config().select_k;
        let start_k = self.strategy.config().start_k;
        let max_traverse = self.strategy.config().max_traverse;
        let max_depth = self.strategy.config().max_depth;

        if self.cancellation.is_cancelled() {
            return self.terminate_on_error(GraphRetrieverError::Cancelled, Vec::new());
        }

        // 1. Seed.
        let (query_embedding, seed_contents) = self.absorb_adapter_data(
            self.store.search_with_embedding(query, start_k, user_filter).await,
        )?;
        self.strategy.config_mut().query_embedding = query_embedding.clone();

        let mut discovered: HashMap<String, Node> = HashMap::new();
        let mut visited_ids: HashSet<String> = HashSet::new();
        let mut selected: Vec<Node> = Vec::new();
        self.expanded_count = 0;

        let mut seed_nodes: Vec<Node> = seed_contents.into_iter().map(|c| Node::from_content(c, 0)).collect();
        seed_nodes.sort_by(|a, b| a.id.cmp(&b.id));
        for node in &seed_nodes {
            discovered.insert(node.id.clone(), node.clone());
        }

        // 2. Neighborhood roots (optional). Never selected; seed the first
        // adjacency fetch only.
        let mut root_edges: HashMap<Edge, usize> = HashMap::new();
        if !initial_roots.is_empty() {
            if self.cancellation.is_cancelled() {
                return self.terminate_on_error(GraphRetrieverError::Cancelled, selected);
            }
            let root_contents = self.absorb_adapter_data(self.store.get(initial_roots, user_filter).await)?;
            let mut root_nodes = Vec::with_capacity(root_contents.len());
            for content in root_contents {
                let node = Node::from_content(content, 0);
                discovered.entry(node.id.clone()).or_insert_with(|| node.clone());
                root_nodes.push(node);
            }
            root_edges = collect_outgoing(&self.edge_spec, &root_nodes, self.warning_sink.as_ref());
        }

        // 3. First strategy iteration.
        let mut pending_edges: HashMap<Edge, usize> = root_edges;
        {
            let mut tracker = NodeTracker::new(select_k, max_depth, &visited_ids, selected.len());
            self.strategy.iteration(seed_nodes.clone(), &mut tracker);
            let (round_selected, mut round_traverse) = tracker.into_round();
            for n in round_selected.iter().chain(round_traverse.iter()) {
                visited_ids.insert(n.id.clone());
            }
            selected.extend(round_selected);

            if let Some(cap) = max_traverse {
                round_traverse.truncate(cap.saturating_sub(self.expanded_count));
            }
            let frontier_edges = collect_outgoing(&self.edge_spec, &round_traverse, self.warning_sink.as_ref());
            merge_min(&mut pending_edges, frontier_edges);
            self.expanded_count += round_traverse.len();
        }

        // 4. Iterate.
        loop {
            if self.cancellation.is_cancelled() {
                return self.terminate_on_error(GraphRetrieverError::Cancelled, selected);
            }

            if pending_edges.is_empty() {
                break;
            }
            if let Some(cap) = max_traverse {
                if self.expanded_count >= cap {
                    break;
                }
            }

            let adjacent_k = self.strategy.config().adjacent_k;
            let query_embedding = self.strategy.config().query_embedding.clone();
            let new_contents = match self
                .fetch_adjacent(&pending_edges, &query_embedding, adjacent_k, user_filter)
                .await
            {
                Ok(contents) => contents,
                Err(err) => return self.terminate_on_error(err, selected),
            };

            let mut newcomers: Vec<Node> = Vec::new();
            for content in new_contents {
                if discovered.contains_key(&content.id) {
                    continue;
                }
                let depth = depth_for_content(&self.edge_spec, &content, &pending_edges, self.warning_sink.as_ref());
                let node = Node::from_content(content, depth);
                discovered.insert(node.id.clone(), node.clone());
                newcomers.push(node);
            }
            newcomers.sort_by(|a, b| a.id.cmp(&b.id));

            if newcomers.is_empty() {
                break;
            }

            let mut tracker = NodeTracker::new(select_k, max_depth, &visited_ids, selected.len());
            self.strategy.iteration(newcomers, &mut tracker);
            let (round_selected, mut round_traverse) = tracker.into_round();
            let round_made_no_progress = round_selected.is_empty() && round_traverse.is_empty();
            for n in round_selected.iter().chain(round_traverse.iter()) {
                visited_ids.insert(n.id.clone());
            }
            selected.extend(round_selected);

            if let Some(cap) = max_traverse {
                round_traverse.truncate(cap.saturating_sub(self.expanded_count));
            }
            pending_edges = collect_outgoing(&self.edge_spec, &round_traverse, self.warning_sink.as_ref());
            self.expanded_count += round_traverse.len();

            if round_made_no_progress {
                break;
            }
        }

        // 5. Finalize.
        Ok(TraversalOutcome::Complete(finalize_documents(
            &mut self.strategy,
            selected,
            self.settings.include_embedding,
        )))
    }

    async fn fetch_adjacent(
        &self,
        pending_edges: &HashMap<Edge, usize>,
        query_embedding: &[f32],
        adjacent_k: usize,
        user_filter: Option<&MetadataFilter>,
    ) -> Result<Vec<graphrag_core::Content>> {
        if adjacent_k == 0 || pending_edges.is_empty() {
            return Ok(Vec::new());
        }
        let edges: HashSet<Edge> = pending_edges.keys().cloned().collect();
        let descriptors = planner::plan_adjacency_queries(&edges, self.settings.id_chunk_size);
        let semaphore = Arc::new(Semaphore::new(self.settings.adjacency_fanout.max(1)));

        let mut handles = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            let subset = descriptor_edges(&descriptor);
            let store = Arc::clone(&self.store);
            let sem = Arc::clone(&semaphore);
            let query_embedding = query_embedding.to_vec();
            let filter = user_filter.cloned();
            let cancellation = self.cancellation.clone();
            let skipped_count = Arc::clone(&self.skipped_count);
            handles.push(tokio::spawn(async move {
                let _permit = sem.acquire_owned().await.expect("semaphore is never closed");
                if cancellation.is_cancelled() {
                    return Ok(Vec::new());
                }
                match store.adjacent(&subset, &query_embedding, adjacent_k, filter.as_ref()).await {
                    Ok(contents) => Ok(contents),
                    Err(GraphRetrieverError::AdapterData(message)) => {
                        tracing::warn!(%message, "adapter data error, skipping");
                        skipped_count.fetch_add(1, Ordering::Relaxed);
                        Ok(Vec::new())
                    }
                    Err(other) => Err(other),
                }
            }));
        }

        let mut merged = Vec::new();
        for handle in handles {
            let result = handle
                .await
                .map_err(|e| GraphRetrieverError::AdapterTransport(format!("adjacency task join error: {e}")))??;
            merged.extend(result);
        }
        Ok(top_k::top_k(merged, query_embedding, adjacent_k))
    }

    fn terminate_on_error(&mut self, error: GraphRetrieverError, selected: Vec<Node>) -> Result<TraversalOutcome> {
        if self.settings.best_effort {
            let partial = finalize_documents(&mut self.strategy, selected, self.settings.include_embedding);
            Ok(TraversalOutcome::Partial(PartialFailure { partial, error }))
        } else {
            Err(error)
        }
    }
}

fn collect_outgoing(edge_spec: &graphrag_core::EdgeSpec, nodes: &[Node], sink: Option<&WarningSink>) -> HashMap<Edge, usize> {
    let mut map: HashMap<Edge, usize> = HashMap::new();
    for node in nodes {
        let edges = edge_function::derive_edges(edge_spec, &node.as_content(), sink);
        for edge in edges.outgoing {
            map.entry(edge)
                .and_modify(|depth| *depth = (*depth).min(node.depth))
                .or_insert(node.depth);
        }
    }
    map
}

fn merge_min(into: &mut HashMap<Edge, usize>, other: HashMap<Edge, usize>) {
    for (edge, depth) in other {
        into.entry(edge).and_modify(|d| *d = (*d).min(depth)).or_insert(depth);
    }
}

/// `depth = min(parent_depth + 1)` over the edges of `pending_edges` that
/// this content's *incoming* edges match.
fn depth_for_content(
    edge_spec: &graphrag_core::EdgeSpec,
    content: &graphrag_core::Content,
    pending_edges: &HashMap<Edge, usize>,
    sink: Option<&WarningSink>,
) -> usize {
    let incoming = edge_function::derive_edges(edge_spec, content, sink).incoming;
    incoming
        .iter()
        .filter_map(|edge| pending_edges.get(edge).map(|depth| depth + 1))
        .min()
        .unwrap_or_else(|| pending_edges.values().min().copied().unwrap_or(0) + 1)
}

fn descriptor_edges(descriptor: &QueryDescriptor) -> HashSet<Edge> {
    match descriptor {
        QueryDescriptor::SingleField { field, values } => values
            .iter()
            .map(|v| Edge::metadata(field.clone(), v.clone()))
            .collect(),
        QueryDescriptor::Ids { ids } => ids.iter().map(|id| Edge::id(id.clone())).collect(),
    }
}

fn finalize_documents(strategy: &mut Box<dyn Strategy>, selected: Vec<Node>, include_embedding: bool) -> Vec<Document> {
    let finalized = strategy.finalize(selected);
    finalized
        .iter()
        .map(|node| Document::from_node(node, include_embedding))
        .collect()
}
