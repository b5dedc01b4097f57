pub mod deadline;
pub mod edge_function;
pub mod facade;
pub mod planner;
pub mod strategy;
pub mod top_k;
pub mod traversal;

pub use deadline::with_deadline;
pub use facade::{GraphRetriever, StrategyFactory};
pub use planner::{plan_adjacency_queries, QueryDescriptor, DEFAULT_ID_CHUNK_SIZE};
pub use strategy::{build_strategy, Eager, Mmr, NodeTracker, Scored, Strategy, StrategyConfig};
pub use top_k::{cosine_similarity, top_k};
pub use traversal::{Traversal, TraversalOutcome, TraversalSettings};
