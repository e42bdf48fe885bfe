use brandvoice::config::ProviderConfig;
use brandvoice::error::ProviderError;
use brandvoice::llm::{EmbeddingProvider, OpenAiCompatibleClient, Provider};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> OpenAiCompatibleClient {
    let config = ProviderConfig {
        name: "mock".into(),
        base_url: server.uri(),
        api_key: Some("sk-test-key".into()),
        model: "tone-model".into(),
        embedding_model: "tone-embed".into(),
    };
    OpenAiCompatibleClient::new(&config, 5)
}

#[tokio::test]
async fn chat_completion_returns_first_choice() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test-key"))
        .and(body_partial_json(json!({
            "model": "tone-model",
            "messages": [{"role": "user", "content": "Rewrite this."}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "We are pleased to help."}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let text = client(&server).complete("Rewrite this.", 0.7).await.unwrap();
    assert_eq!(text, "We are pleased to help.");
}

#[tokio::test]
async fn empty_choices_are_a_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let err = client(&server).complete("hi", 0.0).await.unwrap_err();
    assert!(matches!(err, ProviderError::Provider { ref provider, .. } if provider == "mock"));
}

#[tokio::test]
async fn embeddings_are_reordered_by_index() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(body_partial_json(json!({
            "model": "tone-embed",
            "input": ["first", "second"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"index": 1, "embedding": [0.0, 1.0]},
                {"index": 0, "embedding": [1.0, 0.0]}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let texts = ["first", "second"];
    let vectors = client(&server).embed(&texts).await.unwrap();
    assert_eq!(vectors, vec![vec![1.0_f32, 0.0], vec![0.0, 1.0]]);
}

#[tokio::test]
async fn embedding_count_mismatch_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"index": 0, "embedding": [1.0]}]
        })))
        .mount(&server)
        .await;

    let texts = ["a", "b"];
    let err = client(&server).embed(&texts).await.unwrap_err();
    assert!(err.to_string().contains("expected 2 embeddings, got 1"));
}

#[tokio::test]
async fn too_many_requests_maps_to_rate_limited_with_hint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
        .mount(&server)
        .await;

    let err = client(&server).complete("hi", 0.0).await.unwrap_err();
    assert!(matches!(
        err,
        ProviderError::RateLimited {
            retry_after_secs: Some(7),
            ..
        }
    ));
}

#[tokio::test]
async fn server_errors_carry_a_scrubbed_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_string("upstream exploded for api_key=raw-secret-123"),
        )
        .mount(&server)
        .await;

    let err = client(&server).complete("hi", 0.0).await.unwrap_err();
    let message = err.to_string();
    assert!(matches!(err, ProviderError::Provider { .. }));
    assert!(message.contains("500"));
    assert!(message.contains("upstream exploded"));
    assert!(!message.contains("raw-secret-123"));
}
