use super::traits::{EmbeddingProvider, Provider, ProviderFuture};
use crate::config::ReliabilityConfig;
use crate::error::ProviderError;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Retry, timeout and backoff settings shared by every collaborator call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub call_timeout: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &ReliabilityConfig) -> Self {
        Self {
            max_retries: config.provider_retries,
            base_backoff_ms: config.provider_backoff_ms.max(50),
            max_backoff_ms: config.max_backoff_ms.max(config.provider_backoff_ms),
            call_timeout: Duration::from_secs(config.request_timeout_secs.max(1)),
        }
    }

    /// Delay before the next attempt: the exponential step, or the provider's
    /// `Retry-After` hint when that is longer.
    fn delay_for(&self, backoff_ms: u64, err: &ProviderError) -> Duration {
        let hinted_ms = match err {
            ProviderError::RateLimited {
                retry_after_secs: Some(secs),
                ..
            } => secs.saturating_mul(1000),
            _ => 0,
        };
        Duration::from_millis(backoff_ms.max(hinted_ms))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&ReliabilityConfig::default())
    }
}

/// Run one collaborator call under the shared concurrency gate with per-call
/// timeout and exponential backoff between attempts.
pub(crate) async fn call_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    permits: &Semaphore,
    provider: &str,
    operation: &'static str,
    cancel: Option<&CancellationToken>,
    mut call: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut backoff_ms = policy.base_backoff_ms;
    let mut attempt = 0_u32;

    loop {
        let result = {
            let _permit = permits
                .acquire()
                .await
                .map_err(|_| ProviderError::provider_failure(provider, "request gate closed"))?;
            let started = Instant::now();
            match tokio::time::timeout(policy.call_timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout {
                    provider: provider.to_string(),
                    elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                }),
            }
        };

        let err = match result {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!(provider, operation, attempt, "Provider recovered after retries");
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        if attempt >= policy.max_retries {
            tracing::warn!(
                provider,
                operation,
                attempts = attempt + 1,
                error = %err,
                "Provider retries exhausted"
            );
            return Err(err);
        }

        if cancel.is_some_and(CancellationToken::is_cancelled) {
            tracing::warn!(provider, operation, "Cancelled, not retrying provider call");
            return Err(err);
        }

        let delay = policy.delay_for(backoff_ms, &err);
        tracing::warn!(
            provider,
            operation,
            attempt = attempt + 1,
            max_retries = policy.max_retries,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "Provider call failed, retrying"
        );

        match cancel {
            Some(token) => {
                tokio::select! {
                    () = token.cancelled() => {
                        tracing::warn!(provider, operation, "Cancelled during backoff");
                        return Err(err);
                    }
                    () = tokio::time::sleep(delay) => {}
                }
            }
            None => tokio::time::sleep(delay).await,
        }

        backoff_ms = backoff_ms.saturating_mul(2).min(policy.max_backoff_ms);
        attempt += 1;
    }
}

/// Generation provider wrapper with retry, timeout and a shared in-flight limit.
pub struct ReliableProvider {
    inner: Arc<dyn Provider>,
    policy: RetryPolicy,
    permits: Arc<Semaphore>,
}

impl ReliableProvider {
    pub fn new(inner: Arc<dyn Provider>, policy: RetryPolicy, permits: Arc<Semaphore>) -> Self {
        Self {
            inner,
            policy,
            permits,
        }
    }
}

impl Provider for ReliableProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn complete<'a>(&'a self, prompt: &'a str, temperature: f64) -> ProviderFuture<'a, String> {
        Box::pin(async move {
            call_with_retry(
                &self.policy,
                &self.permits,
                self.inner.name(),
                "complete",
                None,
                || self.inner.complete(prompt, temperature),
            )
            .await
        })
    }

    fn complete_cancellable<'a>(
        &'a self,
        prompt: &'a str,
        temperature: f64,
        cancel: &'a CancellationToken,
    ) -> ProviderFuture<'a, String> {
        Box::pin(async move {
            call_with_retry(
                &self.policy,
                &self.permits,
                self.inner.name(),
                "complete",
                Some(cancel),
                || self.inner.complete(prompt, temperature),
            )
            .await
        })
    }
}

/// Embedding provider wrapper sharing the generation provider's policy and gate.
pub struct ReliableEmbedding {
    inner: Arc<dyn EmbeddingProvider>,
    policy: RetryPolicy,
    permits: Arc<Semaphore>,
}

impl ReliableEmbedding {
    pub fn new(
        inner: Arc<dyn EmbeddingProvider>,
        policy: RetryPolicy,
        permits: Arc<Semaphore>,
    ) -> Self {
        Self {
            inner,
            policy,
            permits,
        }
    }
}

impl EmbeddingProvider for ReliableEmbedding {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn embed<'a>(&'a self, texts: &'a [&'a str]) -> ProviderFuture<'a, Vec<Vec<f32>>> {
        Box::pin(async move {
            call_with_retry(
                &self.policy,
                &self.permits,
                self.inner.name(),
                "embed",
                None,
                || self.inner.embed(texts),
            )
            .await
        })
    }
}
