use super::scrub::sanitize_api_error;
use super::traits::{EmbeddingProvider, Provider, ProviderFuture};
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use reqwest::{Client, StatusCode, header};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

pub fn build_http_client(timeout_secs: u64) -> Client {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Client for any server speaking the OpenAI chat-completions and
/// embeddings wire format.
pub struct OpenAiCompatibleClient {
    name: String,
    client: Client,
    cached_chat_url: String,
    cached_embeddings_url: String,
    cached_auth_header: Option<String>,
    model: String,
    embedding_model: String,
}

impl OpenAiCompatibleClient {
    pub fn new(config: &ProviderConfig, timeout_secs: u64) -> Self {
        let base = config.base_url.trim_end_matches('/');
        let base = base.strip_suffix("/v1").unwrap_or(base);
        Self {
            name: config.name.clone(),
            client: build_http_client(timeout_secs),
            cached_chat_url: format!("{base}/v1/chat/completions"),
            cached_embeddings_url: format!("{base}/v1/embeddings"),
            cached_auth_header: config
                .api_key
                .as_deref()
                .filter(|key| !key.is_empty())
                .map(|key| format!("Bearer {key}")),
            model: config.model.clone(),
            embedding_model: config.embedding_model.clone(),
        }
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<reqwest::Response, ProviderError> {
        let mut request = self.client.post(url).json(body);
        if let Some(auth) = &self.cached_auth_header {
            request = request.header(header::AUTHORIZATION, auth);
        }

        let started = Instant::now();
        let response = request
            .send()
            .await
            .map_err(|err| self.transport_error(&err, started))?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(self.api_error(response).await)
        }
    }

    fn transport_error(&self, err: &reqwest::Error, started: Instant) -> ProviderError {
        if err.is_timeout() {
            ProviderError::Timeout {
                provider: self.name.clone(),
                elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            }
        } else {
            ProviderError::provider_failure(&self.name, sanitize_api_error(&err.to_string()))
        }
    }

    async fn api_error(&self, response: reqwest::Response) -> ProviderError {
        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return ProviderError::RateLimited {
                provider: self.name.clone(),
                retry_after_secs: retry_after_secs(response.headers()),
            };
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<failed to read provider error body>".to_string());
        ProviderError::provider_failure(
            &self.name,
            format!("API error ({status}): {}", sanitize_api_error(&body)),
        )
    }
}

/// Seconds from a `Retry-After` header given as delta-seconds.
fn retry_after_secs(headers: &header::HeaderMap) -> Option<u64> {
    headers
        .get(header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(|secs| {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let whole = secs.ceil() as u64;
            whole
        })
}

impl Provider for OpenAiCompatibleClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn complete<'a>(&'a self, prompt: &'a str, temperature: f64) -> ProviderFuture<'a, String> {
        Box::pin(async move {
            let body = ChatRequest {
                model: &self.model,
                messages: [ChatMessage {
                    role: "user",
                    content: prompt,
                }],
                temperature,
            };
            tracing::debug!(
                provider = self.name.as_str(),
                model = self.model.as_str(),
                prompt_chars = prompt.chars().count(),
                "Sending chat completion"
            );

            let response = self.post(&self.cached_chat_url, &body).await?;
            let parsed: ChatResponse = response.json().await.map_err(|err| {
                ProviderError::provider_failure(&self.name, format!("malformed response: {err}"))
            })?;

            parsed
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .ok_or_else(|| ProviderError::provider_failure(&self.name, "response had no content"))
        })
    }
}

impl EmbeddingProvider for OpenAiCompatibleClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn embed<'a>(&'a self, texts: &'a [&'a str]) -> ProviderFuture<'a, Vec<Vec<f32>>> {
        Box::pin(async move {
            if texts.is_empty() {
                return Ok(Vec::new());
            }
            let body = EmbeddingRequest {
                model: &self.embedding_model,
                input: texts,
            };

            let response = self.post(&self.cached_embeddings_url, &body).await?;
            let mut parsed: EmbeddingResponse = response.json().await.map_err(|err| {
                ProviderError::provider_failure(&self.name, format!("malformed embeddings: {err}"))
            })?;

            if parsed.data.len() != texts.len() {
                return Err(ProviderError::provider_failure(
                    &self.name,
                    format!(
                        "expected {} embeddings, got {}",
                        texts.len(),
                        parsed.data.len()
                    ),
                ));
            }
            parsed.data.sort_by_key(|item| item.index);
            Ok(parsed.data.into_iter().map(|item| item.embedding).collect())
        })
    }
}
