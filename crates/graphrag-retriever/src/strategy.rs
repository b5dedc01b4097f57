//! Selection Strategy: the pluggable policy controlling which discovered
//! nodes are selected as results and which are scheduled for further
//! traversal. A plain-data configuration record plus `iteration`/`finalize`,
//! composed via a small builder layering overrides onto a base strategy
//! rather than an inheritance hierarchy.

use graphrag_core::{Node, Result, WarningEvent, WarningKind, WarningSink};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Plain-data strategy configuration.
#[derive(Debug, Clone)]
pub struct StrategyConfig {
    pub select_k: usize,
    pub start_k: usize,
    pub adjacent_k: usize,
    pub max_traverse: Option<usize>,
    pub max_depth: Option<usize>,
    /// Filled by the engine after seeding; empty until then.
    pub query_embedding: Vec<f32>,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            select_k: 10,
            start_k: 4,
            adjacent_k: 10,
            max_traverse: None,
            max_depth: None,
            query_embedding: Vec::new(),
        }
    }
}

/// Per-round handle a [`Strategy`] uses to record its decisions.
///
/// Constructed fresh by the engine for each `iteration` call; `visited_ids`
/// is the global (cross-round) set of nodes ever scheduled or selected, and
/// `already_selected` is the count of nodes selected in prior rounds.
pub struct NodeTracker<'a> {
    select_k: usize,
    max_depth: Option<usize>,
    visited_ids: &'a HashSet<String>,
    already_selected: usize,
    round_frontier_ids: HashSet<String>,
    to_select: Vec<Node>,
    to_traverse: Vec<Node>,
}

impl<'a> NodeTracker<'a> {
    pub fn new(select_k: usize, max_depth: Option<usize>, visited_ids: &'a HashSet<String>, already_selected: usize) -> Self {
        Self {
            select_k,
            max_depth,
            visited_ids,
            already_selected,
            round_frontier_ids: HashSet::new(),
            to_select: Vec::new(),
            to_traverse: Vec::new(),
        }
    }

    /// Append nodes to this round's selections, in call order.
    pub fn select(&mut self, nodes: impl IntoIterator<Item = Node>) {
        self.to_select.extend(nodes);
    }

    /// Add nodes to the next-round frontier, ignoring already-visited ids
    /// and nodes at or past `max_depth`. Returns the frontier size so far.
    pub fn traverse(&mut self, nodes: impl IntoIterator<Item = Node>) -> usize {
        for node in nodes {
            if self.visited_ids.contains(&node.id) {
                continue;
            }
            if let Some(max_depth) = self.max_depth {
                if node.depth >= max_depth {
                    continue;
                }
            }
            if self.round_frontier_ids.insert(node.id.clone()) {
                self.to_traverse.push(node);
            }
        }
        self.to_traverse.len()
    }

    /// Convenience composition of `select` then `traverse` over the same
    /// nodes.
    pub fn select_and_traverse(&mut self, nodes: Vec<Node>) {
        self.traverse(nodes.clone());
        self.select(nodes);
    }

    pub fn num_remaining(&self) -> usize {
        self.select_k
            .saturating_sub(self.already_selected + self.to_select.len())
    }

    pub fn should_stop(&self) -> bool {
        self.num_remaining() == 0 || self.to_traverse.is_empty()
    }

    /// Consume the tracker, returning `(selected, traversed)` for this
    /// round in call order.
    pub fn into_round(self) -> (Vec<Node>, Vec<Node>) {
        (self.to_select, self.to_traverse)
    }
}

/// A pluggable selection/termination policy.
pub trait Strategy: Send + Sync {
    fn config(&self) -> &StrategyConfig;
    fn config_mut(&mut self) -> &mut StrategyConfig;

    /// Called once per traversal round with newly discovered nodes, deduped
    /// against prior rounds and delivered in stable order.
    fn iteration(&mut self, nodes: Vec<Node>, tracker: &mut NodeTracker<'_>);

    /// Called once at termination; returns the final ranked list, truncated
    /// to `select_k`.
    fn finalize(&mut self, mut selected: Vec<Node>) -> Vec<Node> {
        selected.truncate(self.config().select_k);
        selected
    }
}

/// Breadth-first: every newly discovered node is selected and traversed.
#[derive(Debug, Clone)]
pub struct Eager {
    pub config: StrategyConfig,
}

impl Eager {
    pub fn new(config: StrategyConfig) -> Self {
        Self { config }
    }
}

impl Strategy for Eager {
    fn config(&self) -> &StrategyConfig {
        &self.config
    }

    fn config_mut(&mut self) -> &mut StrategyConfig {
        &mut self.config
    }

    fn iteration(&mut self, nodes: Vec<Node>, tracker: &mut NodeTracker<'_>) {
        tracker.select_and_traverse(nodes);
    }
}

#[derive(Debug, Clone)]
struct ScoredNode {
    score: f64,
    seq: usize,
    node: Node,
}

impl PartialEq for ScoredNode {
    fn eq(&self, other: &Self) -> bool {
        self.score == other.score && self.seq == other.seq
    }
}

impl Eq for ScoredNode {}

impl PartialOrd for ScoredNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoredNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap by score; ties broken by insertion order (earlier wins).
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Heap-driven strategy keyed by an arbitrary scorer.
///
/// Each iteration pushes newcomers onto a max-heap, then pops
/// `min(num_remaining, per_iteration_limit)` and selects+traverses each.
pub struct Scored {
    pub config: StrategyConfig,
    scorer: Arc<dyn Fn(&Node) -> f64 + Send + Sync>,
    per_iteration_limit: Option<usize>,
    heap: std::collections::BinaryHeap<ScoredNode>,
    seq: usize,
}

impl Scored {
    pub fn new(
        config: StrategyConfig,
        scorer: Arc<dyn Fn(&Node) -> f64 + Send + Sync>,
        per_iteration_limit: Option<usize>,
    ) -> Self {
        Self {
            config,
            scorer,
            per_iteration_limit,
            heap: std::collections::BinaryHeap::new(),
            seq: 0,
        }
    }
}

impl Strategy for Scored {
    fn config(&self) -> &StrategyConfig {
        &self.config
    }

    fn config_mut(&mut self) -> &mut StrategyConfig {
        &mut self.config
    }

    fn iteration(&mut self, nodes: Vec<Node>, tracker: &mut NodeTracker<'_>) {
        for node in nodes {
            let score = (self.scorer)(&node);
            self.seq += 1;
            self.heap.push(ScoredNode {
                score,
                seq: self.seq,
                node,
            });
        }

        let limit = self.per_iteration_limit.unwrap_or(usize::MAX);
        let mut popped = 0;
        while popped < limit && tracker.num_remaining() > 0 {
            let Some(top) = self.heap.pop() else {
                break;
            };
            tracker.select_and_traverse(vec![top.node]);
            popped += 1;
        }
    }
}

/// Maximal marginal relevance over embeddings, balancing relevance to the
/// query against diversity from already-selected nodes.
pub struct Mmr {
    pub config: StrategyConfig,
    lambda: f32,
    selected_embeddings: Vec<Vec<f32>>,
    candidates: Vec<Node>,
}

impl Mmr {
    pub fn new(config: StrategyConfig, lambda: f32) -> Self {
        Self {
            config,
            lambda,
            selected_embeddings: Vec::new(),
            candidates: Vec::new(),
        }
    }
}

impl Strategy for Mmr {
    fn config(&self) -> &StrategyConfig {
        &self.config
    }

    fn config_mut(&mut self) -> &mut StrategyConfig {
        &mut self.config
    }

    fn iteration(&mut self, nodes: Vec<Node>, tracker: &mut NodeTracker<'_>) {
        self.candidates.extend(nodes);

        while tracker.num_remaining() > 0 && !self.candidates.is_empty() {
            let query_embedding = self.config.query_embedding.clone();
            let mut best_idx = 0;
            let mut best_score = f32::NEG_INFINITY;
            for (i, candidate) in self.candidates.iter().enumerate() {
                let relevance = crate::top_k::cosine_similarity(&candidate.embedding, &query_embedding);
                let diversity = self
                    .selected_embeddings
                    .iter()
                    .map(|e| crate::top_k::cosine_similarity(&candidate.embedding, e))
                    .fold(f32::NEG_INFINITY, f32::max);
                let diversity = if diversity.is_finite() { diversity } else { 0.0 };
                let mmr_score = self.lambda * relevance - (1.0 - self.lambda) * diversity;
                if mmr_score > best_score {
                    best_score = mmr_score;
                    best_idx = i;
                }
            }
            let node = self.candidates.remove(best_idx);
            self.selected_embeddings.push(node.embedding.clone());
            tracker.select_and_traverse(vec![node]);
        }
    }
}

/// Combines a base strategy with per-call overrides. An `alternate`
/// strategy, if supplied, replaces the base wholesale before overrides
/// apply. Unknown override keys are warned on and otherwise ignored.
pub fn build_strategy(
    base: Box<dyn Strategy>,
    alternate: Option<Box<dyn Strategy>>,
    overrides: &HashMap<String, serde_json::Value>,
    sink: Option<&WarningSink>,
) -> Result<Box<dyn Strategy>> {
    let mut strategy = alternate.unwrap_or(base);
    {
        let cfg = strategy.config_mut();
        for (key, value) in overrides {
            match key.as_str() {
                "select_k" => cfg.select_k = as_usize(key, value)?,
                "start_k" => cfg.start_k = as_usize(key, value)?,
                "adjacent_k" => cfg.adjacent_k = as_usize(key, value)?,
                "max_traverse" => cfg.max_traverse = as_opt_usize(key, value)?,
                "max_depth" => cfg.max_depth = as_opt_usize(key, value)?,
                other => {
                    graphrag_core::warnings::emit(
                        sink,
                        WarningEvent::new(
                            WarningKind::UnknownStrategyOverride,
                            format!("unrecognized strategy override field {other:?}"),
                        ),
                    );
                }
            }
        }
    }
    Ok(strategy)
}

fn as_usize(key: &str, value: &serde_json::Value) -> Result<usize> {
    value.as_u64().map(|v| v as usize).ok_or_else(|| {
        graphrag_core::GraphRetrieverError::Configuration(format!("override {key:?} must be a non-negative integer"))
    })
}

fn as_opt_usize(key: &str, value: &serde_json::Value) -> Result<Option<usize>> {
    if value.is_null() {
        return Ok(None);
    }
    as_usize(key, value).map(Some)
}
