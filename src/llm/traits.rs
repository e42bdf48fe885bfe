use crate::error::ProviderError;
use std::future::Future;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

/// Boxed future returned by collaborator calls.
pub type ProviderFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, ProviderError>> + Send + 'a>>;

/// Text generation collaborator.
pub trait Provider: Send + Sync {
    /// Provider identifier (e.g. "openai").
    fn name(&self) -> &str;

    /// Generate a completion for a single user prompt.
    fn complete<'a>(&'a self, prompt: &'a str, temperature: f64) -> ProviderFuture<'a, String>;

    /// Like [`Provider::complete`], but retry layers stop scheduling new
    /// attempts once `cancel` fires. The in-flight call still completes.
    fn complete_cancellable<'a>(
        &'a self,
        prompt: &'a str,
        temperature: f64,
        _cancel: &'a CancellationToken,
    ) -> ProviderFuture<'a, String> {
        self.complete(prompt, temperature)
    }
}

/// Embedding collaborator: text to vectors.
pub trait EmbeddingProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Embed a batch of texts, one vector per input in input order.
    fn embed<'a>(&'a self, texts: &'a [&'a str]) -> ProviderFuture<'a, Vec<Vec<f32>>>;

    fn embed_one<'a>(&'a self, text: &'a str) -> ProviderFuture<'a, Vec<f32>> {
        Box::pin(async move {
            let batch = [text];
            let mut results = self.embed(&batch).await?;
            results
                .pop()
                .ok_or_else(|| ProviderError::provider_failure(self.name(), "empty embedding result"))
        })
    }
}
