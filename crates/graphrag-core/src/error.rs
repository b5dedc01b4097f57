use thiserror::Error;

/// Error taxonomy for the retrieval engine.
///
/// `Configuration`, `TraversalReuse`, and `Strategy` errors are raised before
/// or without any adapter call; `AdapterTransport` is retried with
/// exponential backoff before surfacing; `AdapterData` is logged and counted
/// but never aborts a traversal; `Cancelled` is always terminal.
#[derive(Error, Debug)]
pub enum GraphRetrieverError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("adapter transport error after retries exhausted: {0}")]
    AdapterTransport(String),

    #[error("adapter data error: {0}")]
    AdapterData(String),

    #[error("traversal already used; a Traversal is single-use")]
    TraversalReuse,

    #[error("traversal cancelled")]
    Cancelled,

    #[error("strategy error on node {node_id}: {message}")]
    Strategy { node_id: String, message: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GraphRetrieverError>;

/// Errors carried alongside a best-effort partial result.
#[derive(Debug)]
pub struct PartialFailure<T> {
    pub partial: T,
    pub error: GraphRetrieverError,
}
