use std::sync::Arc;
use std::time::Duration;

use brandvoice::config::ProviderConfig;
use brandvoice::error::ProviderError;
use brandvoice::llm::{
    EmbeddingProvider, OpenAiCompatibleClient, Provider, ReliableEmbedding, ReliableProvider,
    RetryPolicy,
};
use serde_json::json;
use tokio::sync::Semaphore;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        base_backoff_ms: 5,
        max_backoff_ms: 20,
        call_timeout: Duration::from_secs(5),
    }
}

fn inner(server: &MockServer) -> Arc<OpenAiCompatibleClient> {
    let config = ProviderConfig {
        name: "mock".into(),
        base_url: server.uri(),
        api_key: None,
        ..ProviderConfig::default()
    };
    Arc::new(OpenAiCompatibleClient::new(&config, 5))
}

#[tokio::test]
async fn rate_limited_call_is_retried_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "recovered"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = ReliableProvider::new(inner(&server), policy(3), Arc::new(Semaphore::new(2)));
    assert_eq!(provider.complete("hi", 0.0).await.unwrap(), "recovered");
}

#[tokio::test]
async fn retries_stop_at_the_configured_limit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .expect(3)
        .mount(&server)
        .await;

    let provider = ReliableProvider::new(inner(&server), policy(2), Arc::new(Semaphore::new(2)));
    let err = provider.complete("hi", 0.0).await.unwrap_err();
    assert!(matches!(err, ProviderError::Provider { .. }));
}

#[tokio::test]
async fn slow_responses_time_out_per_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": [{"index": 0, "embedding": [1.0]}]}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let embedder = ReliableEmbedding::new(
        inner(&server),
        RetryPolicy {
            call_timeout: Duration::from_millis(100),
            ..policy(0)
        },
        Arc::new(Semaphore::new(1)),
    );
    let texts = ["slow"];
    let err = embedder.embed(&texts).await.unwrap_err();
    assert!(matches!(err, ProviderError::Timeout { .. }));
}
