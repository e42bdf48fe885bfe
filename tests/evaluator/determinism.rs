use std::sync::Arc;

use brandvoice::analyzer::ToneAnalyzer;
use brandvoice::config::AnalyzerConfig;
use brandvoice::evaluator::{Evaluator, overall_score};
use brandvoice::prompt::PromptEngine;

use super::tone_harness::{
    DeterministicEmbedding, FORMAL_ANALYSIS, RoutingProvider, formal_target,
};

const ORIGINAL: &str = "Our product works for everyone. Try it today!";
const CANDIDATE: &str = "Our solution is designed to serve a broad range of users. We invite you to try it.";

fn evaluator(provider: Arc<RoutingProvider>) -> Evaluator {
    let prompts = Arc::new(PromptEngine::new().unwrap());
    let analyzer = Arc::new(ToneAnalyzer::new(
        provider.clone(),
        prompts.clone(),
        &AnalyzerConfig::default(),
    ));
    Evaluator::new(
        provider,
        Arc::new(DeterministicEmbedding::new(32, 11)),
        analyzer,
        prompts,
        3,
        0.0,
    )
}

#[tokio::test]
async fn identical_inputs_score_identically() {
    let target = formal_target();
    let first = evaluator(Arc::new(RoutingProvider::new(FORMAL_ANALYSIS, 88)))
        .evaluate(ORIGINAL, CANDIDATE, &target)
        .await
        .unwrap();
    let second = evaluator(Arc::new(RoutingProvider::new(FORMAL_ANALYSIS, 88)))
        .evaluate(ORIGINAL, CANDIDATE, &target)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert!(!first.is_degraded());
}

#[tokio::test]
async fn repeated_evaluation_on_one_instance_is_stable() {
    let evaluator = evaluator(Arc::new(RoutingProvider::new(FORMAL_ANALYSIS, 88)));
    let target = formal_target();
    let mut results = Vec::new();
    for _ in 0..3 {
        results.push(
            evaluator
                .evaluate(ORIGINAL, CANDIDATE, &target)
                .await
                .unwrap(),
        );
    }
    assert!(results.windows(2).all(|pair| pair[0] == pair[1]));
}

#[tokio::test]
#[allow(clippy::float_cmp)]
async fn overall_score_is_the_weighted_sub_scores() {
    let result = evaluator(Arc::new(RoutingProvider::new(FORMAL_ANALYSIS, 88)))
        .evaluate(ORIGINAL, CANDIDATE, &formal_target())
        .await
        .unwrap();

    assert_eq!(result.fluency, 88.0);
    for value in [
        result.fluency,
        result.authenticity,
        result.tone_alignment,
        result.readability,
    ] {
        assert!((0.0..=100.0).contains(&value), "{value}");
    }
    assert!(result.tone_alignment > 0.0);
    assert_eq!(result.dimension_match.len(), 5);
    assert_eq!(
        result.overall_score,
        overall_score(
            result.fluency,
            result.authenticity,
            result.tone_alignment,
            result.readability
        )
    );
}
