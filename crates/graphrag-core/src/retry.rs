//! Retry-with-backoff wrapper for a [`StoreAdapter`]: `AdapterTransport`
//! failures are retried with exponential backoff before surfacing.
//!
//! `100ms * 2^attempt` backoff, bounded attempts, retrying only the one
//! error kind that's actually transient.

use crate::config::RetryConfig;
use crate::error::{GraphRetrieverError, Result};
use crate::node::Content;
use crate::traits::{MetadataFilter, StoreAdapter};
use crate::types::Edge;
use async_trait::async_trait;
use std::collections::HashSet;
use std::time::Duration;

/// Wraps a [`StoreAdapter`], retrying [`GraphRetrieverError::AdapterTransport`]
/// failures with exponential backoff. Every other error kind (including
/// `AdapterData`, which is a data-quality problem no retry will fix) passes
/// through on the first attempt.
pub struct RetryingStoreAdapter<A> {
    inner: A,
    retry: RetryConfig,
}

impl<A: StoreAdapter> RetryingStoreAdapter<A> {
    pub fn new(inner: A, retry: RetryConfig) -> Self {
        Self { inner, retry }
    }

    async fn with_retry<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut last_error = None;
        for attempt in 0..=self.retry.max_attempts {
            if attempt > 0 {
                let delay = Duration::from_millis(self.retry.initial_backoff_ms * 2u64.pow(attempt - 1));
                tokio::time::sleep(delay).await;
            }
            match op().await {
                Ok(value) => return Ok(value),
                Err(GraphRetrieverError::AdapterTransport(message)) => {
                    tracing::warn!(attempt, max_attempts = self.retry.max_attempts, %message, "adapter transport error, retrying");
                    last_error = Some(GraphRetrieverError::AdapterTransport(message));
                }
                Err(other) => return Err(other),
            }
        }
        Err(last_error.expect("loop runs at least once"))
    }
}

#[async_trait]
impl<A: StoreAdapter> StoreAdapter for RetryingStoreAdapter<A> {
    async fn search_with_embedding(
        &self,
        query: &str,
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<(Vec<f32>, Vec<Content>)> {
        self.with_retry(|| self.inner.search_with_embedding(query, k, filter)).await
    }

    async fn search(&self, embedding: &[f32], k: usize, filter: Option<&MetadataFilter>) -> Result<Vec<Content>> {
        self.with_retry(|| self.inner.search(embedding, k, filter)).await
    }

    async fn get(&self, ids: &[String], filter: Option<&MetadataFilter>) -> Result<Vec<Content>> {
        self.with_retry(|| self.inner.get(ids, filter)).await
    }

    async fn adjacent(
        &self,
        edges: &HashSet<Edge>,
        query_embedding: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<Content>> {
        self.with_retry(|| self.inner.adjacent(edges, query_embedding, k, filter)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Metadata;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyAdapter {
        failures_before_success: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl StoreAdapter for FlakyAdapter {
        async fn search_with_embedding(
            &self,
            _query: &str,
            _k: usize,
            _filter: Option<&MetadataFilter>,
        ) -> Result<(Vec<f32>, Vec<Content>)> {
            let attempt = self.calls.fetch_add(1, Ordering::SeqCst);
            if attempt < self.failures_before_success {
                return Err(GraphRetrieverError::AdapterTransport("connection reset".to_string()));
            }
            Ok((vec![1.0], Vec::new()))
        }

        async fn search(&self, _embedding: &[f32], _k: usize, _filter: Option<&MetadataFilter>) -> Result<Vec<Content>> {
            Ok(Vec::new())
        }

        async fn get(&self, _ids: &[String], _filter: Option<&MetadataFilter>) -> Result<Vec<Content>> {
            Ok(Vec::new())
        }

        async fn adjacent(
            &self,
            _edges: &HashSet<Edge>,
            _query_embedding: &[f32],
            _k: usize,
            _filter: Option<&MetadataFilter>,
        ) -> Result<Vec<Content>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let adapter = RetryingStoreAdapter::new(
            FlakyAdapter {
                failures_before_success: 2,
                calls: AtomicUsize::new(0),
            },
            RetryConfig {
                max_attempts: 3,
                initial_backoff_ms: 1,
            },
        );
        let (embedding, _) = adapter.search_with_embedding("q", 1, None).await.unwrap();
        assert_eq!(embedding, vec![1.0]);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let adapter = RetryingStoreAdapter::new(
            FlakyAdapter {
                failures_before_success: usize::MAX,
                calls: AtomicUsize::new(0),
            },
            RetryConfig {
                max_attempts: 2,
                initial_backoff_ms: 1,
            },
        );
        let err = adapter.search_with_embedding("q", 1, None).await.unwrap_err();
        assert!(matches!(err, GraphRetrieverError::AdapterTransport(_)));
    }

    #[tokio::test]
    async fn data_errors_are_never_retried() {
        struct AlwaysDataError;
        #[async_trait]
        impl StoreAdapter for AlwaysDataError {
            async fn search_with_embedding(
                &self,
                _query: &str,
                _k: usize,
                _filter: Option<&MetadataFilter>,
            ) -> Result<(Vec<f32>, Vec<Content>)> {
                Err(GraphRetrieverError::AdapterData("malformed record".to_string()))
            }
            async fn search(&self, _embedding: &[f32], _k: usize, _filter: Option<&MetadataFilter>) -> Result<Vec<Content>> {
                Ok(Vec::new())
            }
            async fn get(&self, _ids: &[String], _filter: Option<&MetadataFilter>) -> Result<Vec<Content>> {
                Ok(Vec::new())
            }
            async fn adjacent(
                &self,
                _edges: &HashSet<Edge>,
                _query_embedding: &[f32],
                _k: usize,
                _filter: Option<&MetadataFilter>,
            ) -> Result<Vec<Content>> {
                Ok(Vec::new())
            }
        }
        let adapter = RetryingStoreAdapter::new(AlwaysDataError, RetryConfig::default());
        let err = adapter.search_with_embedding("q", 1, None).await.unwrap_err();
        assert!(matches!(err, GraphRetrieverError::AdapterData(_)));
        let _ = Metadata::new();
    }
}
