//! Ambient tuning knobs for the engine: fan-out bound, retry policy, and
//! default strategy parameters. `serde`-derived structs with `Default`
//! impls and `schemars::JsonSchema` for documentation, loaded through the
//! `config` crate. This is ambient tuning only: environment loading and
//! credentials remain out of scope.

use config::{Config, ConfigError, Environment, File};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RetryConfig {
    /// Maximum retry attempts for a transient adapter transport error.
    #[serde(default = "RetryConfig::default_max_attempts")]
    pub max_attempts: u32,
    /// Initial backoff delay in milliseconds (doubled each attempt).
    #[serde(default = "RetryConfig::default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
}

impl RetryConfig {
    fn default_max_attempts() -> u32 {
        3
    }

    fn default_initial_backoff_ms() -> u64 {
        100
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: Self::default_max_attempts(),
            initial_backoff_ms: Self::default_initial_backoff_ms(),
        }
    }
}

/// Default `StrategyConfig` values a facade falls back to when the caller
/// hasn't supplied a custom base strategy.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StrategyDefaults {
    #[serde(default = "StrategyDefaults::default_select_k")]
    pub select_k: usize,
    #[serde(default = "StrategyDefaults::default_start_k")]
    pub start_k: usize,
    #[serde(default = "StrategyDefaults::default_adjacent_k")]
    pub adjacent_k: usize,
    #[serde(default)]
    pub max_traverse: Option<usize>,
    #[serde(default)]
    pub max_depth: Option<usize>,
}

impl StrategyDefaults {
    fn default_select_k() -> usize {
        10
    }

    fn default_start_k() -> usize {
        4
    }

    fn default_adjacent_k() -> usize {
        10
    }
}

impl Default for StrategyDefaults {
    fn default() -> Self {
        Self {
            select_k: Self::default_select_k(),
            start_k: Self::default_start_k(),
            adjacent_k: Self::default_adjacent_k(),
            max_traverse: None,
            max_depth: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RetrieverSettings {
    /// Bound on in-flight adjacency calls within a single traversal round.
    #[serde(default = "RetrieverSettings::default_adjacency_fanout")]
    pub adjacency_fanout: usize,
    /// Chunk size for `id IN {...}` adjacency queries.
    #[serde(default = "RetrieverSettings::default_id_chunk_size")]
    pub id_chunk_size: usize,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub strategy: StrategyDefaults,
}

impl RetrieverSettings {
    fn default_adjacency_fanout() -> usize {
        5
    }

    fn default_id_chunk_size() -> usize {
        100
    }

    /// Load settings from (in increasing priority) built-in defaults, an
    /// optional `graphrag.toml` file, and `GRAPHRAG_*` environment
    /// variables.
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(false));
        }
        builder = builder.add_source(Environment::with_prefix("GRAPHRAG").separator("__"));
        builder.build()?.try_deserialize()
    }
}

impl Default for RetrieverSettings {
    fn default() -> Self {
        Self {
            adjacency_fanout: Self::default_adjacency_fanout(),
            id_chunk_size: Self::default_id_chunk_size(),
            retry: RetryConfig::default(),
            strategy: StrategyDefaults::default(),
        }
    }
}
