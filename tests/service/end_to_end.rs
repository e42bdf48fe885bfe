use std::sync::Arc;

use brandvoice::pipeline::{PipelineState, RewriteRequest, TargetSpec};
use brandvoice::evaluator::SubScore;
use brandvoice::signature::Dimension;
use brandvoice::{KeywordPreservation, ToneError, ToneService};

use super::tone_harness::{
    DeterministicEmbedding, FORMAL_ANALYSIS, RoutingProvider, ScriptedProvider, memory_config,
    service_builder, signature,
};

const SAMPLES: [&str; 2] = [
    "We are pleased to announce the general availability of our platform.",
    "Our team remains committed to delivering dependable service to every client.",
];

async fn routed_service(provider: Arc<RoutingProvider>) -> ToneService {
    let mut config = memory_config();
    config.pipeline.acceptance_threshold = 50;
    service_builder(config, provider, Arc::new(DeterministicEmbedding::new(16, 5)))
        .build()
        .await
        .unwrap()
}

#[tokio::test]
async fn learn_then_rewrite_toward_the_brand() {
    let provider = Arc::new(RoutingProvider::new(FORMAL_ANALYSIS, 95));
    let service = routed_service(provider.clone()).await;

    let learned = service
        .create_signature_from_text("acme", &SAMPLES)
        .await
        .unwrap();
    assert_eq!(learned.current_version(), 1);

    let profile = service.get_signature("acme").await.unwrap();
    assert_eq!(profile.current_signature().label(Dimension::Tone), "formal");
    assert_eq!(
        profile.current_signature().key_phrases(),
        ["we are pleased".to_string()]
    );

    let request = RewriteRequest::new(
        "hey folks, acme cloud is up again, go nuts!",
        TargetSpec::Brand("acme".into()),
    )
    .with_keywords(["Acme Cloud"]);
    let outcome = service.rewrite_and_evaluate(&request).await.unwrap();

    assert_eq!(outcome.final_state, PipelineState::Accepted);
    assert_eq!(outcome.best.iteration, 1);
    assert!(outcome.text().contains("ACME CLOUD"));
    assert!(!outcome.text().starts_with("Rewritten text"));
    assert_eq!(
        outcome.best.rewrite.keyword_preservation,
        KeywordPreservation::Complete
    );
    let evaluation = &outcome.best.evaluation;
    assert!(evaluation.degraded.is_empty());
    assert!((evaluation.tone_alignment - 100.0).abs() < 1e-9);
    assert!(
        evaluation
            .dimension_match
            .values()
            .all(|agreement| (agreement - 1.0).abs() < 1e-9)
    );
}

#[tokio::test]
async fn persisted_run_can_be_looked_up_by_id() {
    let provider = Arc::new(RoutingProvider::new(FORMAL_ANALYSIS, 95));
    let service = routed_service(provider).await;
    service
        .create_signature_from_text("acme", &SAMPLES)
        .await
        .unwrap();

    let plain = RewriteRequest::new("hey folks, acme cloud is up", TargetSpec::Brand("acme".into()));
    assert!(service.rewrite_and_evaluate(&plain).await.unwrap().evaluation_id.is_none());

    let outcome = service
        .rewrite_and_evaluate(&plain.clone().persisted())
        .await
        .unwrap();
    let evaluation_id = outcome.evaluation_id.clone().unwrap();
    let record = service.get_evaluation(&evaluation_id).await.unwrap();

    assert_eq!(record.brand_id.as_deref(), Some("acme"));
    assert_eq!(record.original, "hey folks, acme cloud is up");
    assert_eq!(record.rewritten, outcome.text());
    assert_eq!(record.evaluation, outcome.best.evaluation);

    assert!(matches!(
        service.get_evaluation("not-an-id").await.unwrap_err(),
        ToneError::EvaluationNotFound { .. }
    ));
}

#[tokio::test]
async fn rewrite_longer_than_input_bound_is_scored_not_rejected() {
    let provider = Arc::new(RoutingProvider::new(FORMAL_ANALYSIS, 95));
    let mut config = memory_config();
    config.analyzer.max_text_chars = 40;
    config.pipeline.max_iterations = 1;
    let service = service_builder(config, provider, Arc::new(DeterministicEmbedding::new(16, 5)))
        .build()
        .await
        .unwrap();

    let request = RewriteRequest::new(
        "hey folks, our app is up again",
        TargetSpec::Inline(signature("formal", 0.9)),
    );
    let outcome = service.rewrite_and_evaluate(&request).await.unwrap();

    let rewrite = &outcome.best.rewrite;
    assert!(rewrite.text.chars().count() > 40);
    assert!(!rewrite.length_deviation);
    assert_eq!(outcome.best.evaluation.degraded, [SubScore::ToneAlignment]);
    assert_eq!(outcome.best.evaluation.tone_alignment, 0.0);
    assert!(outcome.stopped_on_error.is_none());
}

#[tokio::test]
async fn standalone_rewrite_and_evaluate_agree_with_the_loop() {
    let provider = Arc::new(RoutingProvider::new(FORMAL_ANALYSIS, 95));
    let service = routed_service(provider).await;
    let target = TargetSpec::Inline(signature("formal", 0.9));

    let original = "hey folks, the new plan is live.";
    let rewrite = service
        .rewrite(&RewriteRequest::new(original, target.clone()))
        .await
        .unwrap();
    assert!(rewrite.keyword_preservation.is_complete());

    let standalone = service
        .evaluate(original, &rewrite.text, &target)
        .await
        .unwrap();
    let looped = service
        .rewrite_and_evaluate(&RewriteRequest::new(original, target))
        .await
        .unwrap();
    assert_eq!(looped.text(), rewrite.text);
    assert_eq!(looped.best.evaluation, standalone);
}

#[tokio::test]
async fn documents_are_analyzed_by_extension() {
    let service = routed_service(Arc::new(RoutingProvider::new(FORMAL_ANALYSIS, 95))).await;
    let dir = tempfile::tempdir().unwrap();

    let markdown = dir.path().join("voice.md");
    std::fs::write(&markdown, format!("# Announcement\n\n{}\n", SAMPLES[0])).unwrap();
    let signature = service.analyze_document(&markdown).await.unwrap();
    assert_eq!(signature.label(Dimension::Formality), "formal");
    assert!(!signature.is_degraded());

    let pdf = dir.path().join("voice.pdf");
    std::fs::write(&pdf, b"%PDF-1.7").unwrap();
    let err = service.analyze_document(&pdf).await.unwrap_err();
    assert!(matches!(err, ToneError::Document(_)));
    assert!(err.is_client_error());
}

#[tokio::test]
async fn similar_brands_rank_the_closest_voice_first() {
    let service = routed_service(Arc::new(RoutingProvider::new(FORMAL_ANALYSIS, 95))).await;
    service
        .create_signature_from_text("acme", &SAMPLES)
        .await
        .unwrap();
    service
        .put_signature("sunny", signature("warm", 0.9))
        .await
        .unwrap();

    let results = service
        .find_similar_brands(&TargetSpec::Brand("acme".into()), 2)
        .await
        .unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].brand_id, "acme");
    assert!((results[0].similarity - 1.0).abs() < 1e-5);
    assert!(results[1].similarity < results[0].similarity);
}

#[tokio::test]
async fn unparseable_analysis_is_never_stored() {
    let service = service_builder(
        memory_config(),
        Arc::new(ScriptedProvider::texts(["I would rather not say."])),
        Arc::new(DeterministicEmbedding::new(16, 5)),
    )
    .build()
    .await
    .unwrap();

    let err = service
        .create_signature_from_text("acme", &SAMPLES)
        .await
        .unwrap_err();
    assert!(matches!(err, ToneError::Parse(_)));
    assert!(matches!(
        service.get_signature("acme").await.unwrap_err(),
        ToneError::NotFound { .. }
    ));
}

#[tokio::test]
async fn invalid_brand_id_is_rejected_before_any_call() {
    let provider = Arc::new(RoutingProvider::new(FORMAL_ANALYSIS, 95));
    let service = routed_service(provider.clone()).await;

    let err = service
        .create_signature_from_text("not a valid id", &SAMPLES)
        .await
        .unwrap_err();
    assert!(matches!(err, ToneError::Validation(_)));
    assert_eq!(provider.calls(), 0);
}
