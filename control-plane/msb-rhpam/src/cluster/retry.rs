//! Bounded exponential backoff with jitter for cluster calls.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::{error, warn};

use super::{
    ClusterClient, CustomKind, CustomResourceRecord, DesiredObject,
    ResourceKind,
};
use crate::errors::{ClusterError, ClusterResult};

#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Total attempts including the first; never below 1.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    pub fn with_max_attempts(attempts: u32) -> Self {
        Self {
            max_attempts: attempts,
            ..Default::default()
        }
    }
}

/// Run `operation` until it succeeds, fails with an error `retryable`
/// rejects, or `max_attempts` is used up. The last error is returned.
pub async fn retry_with_backoff<F, Fut, T, E, P>(
    config: &RetryConfig,
    operation_name: &str,
    retryable: P,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0u32;
    let mut delay = config.initial_delay;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if !retryable(&e) => return Err(e),
            Err(e) => {
                if attempt >= max_attempts {
                    error!(
                        operation = %operation_name,
                        attempt = attempt,
                        error = %e,
                        "cluster call failed after max retries"
                    );
                    return Err(e);
                }

                // 0.5x to 1.5x of the nominal delay
                let jitter = rand::rng().random_range(0.5..1.5);
                let jittered =
                    Duration::from_secs_f64(delay.as_secs_f64() * jitter);

                warn!(
                    operation = %operation_name,
                    attempt = attempt,
                    error = %e,
                    delay_ms = jittered.as_millis() as u64,
                    "cluster call failed, retrying"
                );

                tokio::time::sleep(jittered).await;

                delay = Duration::from_secs_f64(
                    (delay.as_secs_f64() * config.backoff_multiplier)
                        .min(config.max_delay.as_secs_f64()),
                );
            }
        }
    }
}

/// Decorator retrying transient failures of the wrapped client.
///
/// NotFound, AlreadyExists and other 4xx answers pass through on the first
/// attempt. Creates are only retried on 429/503: after a dropped connection
/// or a 500 the object may already exist, and a second POST would turn that
/// into a conflict or a duplicate `generateName` object.
pub struct RetryingClusterClient<C> {
    inner: C,
    config: RetryConfig,
}

impl<C: ClusterClient> RetryingClusterClient<C> {
    pub fn new(inner: C, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C: ClusterClient> ClusterClient for RetryingClusterClient<C> {
    async fn create(&self, object: &DesiredObject) -> ClusterResult<String> {
        retry_with_backoff(
            &self.config,
            "create",
            ClusterError::is_uncommitted,
            || self.inner.create(object),
        )
        .await
    }

    async fn exists(
        &self,
        kind: &ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> ClusterResult<bool> {
        retry_with_backoff(
            &self.config,
            "exists",
            ClusterError::is_transient,
            || self.inner.exists(kind, namespace, name),
        )
        .await
    }

    async fn list_custom(
        &self,
        kind: &CustomKind,
        namespace: &str,
    ) -> ClusterResult<Vec<CustomResourceRecord>> {
        retry_with_backoff(
            &self.config,
            "list",
            ClusterError::is_transient,
            || self.inner.list_custom(kind, namespace),
        )
        .await
    }

    async fn delete(
        &self,
        kind: &ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> ClusterResult<()> {
        retry_with_backoff(
            &self.config,
            "delete",
            ClusterError::is_transient,
            || self.inner.delete(kind, namespace, name),
        )
        .await
    }
}
