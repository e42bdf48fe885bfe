use std::collections::BTreeMap;
use std::sync::Arc;

use brandvoice::ToneError;
use brandvoice::evaluator::{EvaluationResult, SubScore};
use brandvoice::signature::Dimension;
use brandvoice::store::{InMemoryBackend, SignatureStore, SqliteBackend};

use super::tone_harness::{formal_target, signature};

#[tokio::test]
async fn get_returns_what_put_stored_in_memory() {
    let store = SignatureStore::new(Arc::new(InMemoryBackend::new()), 8);
    let stored = store.put("acme", formal_target()).await.unwrap();
    let loaded = store.get("acme").await.unwrap();

    assert_eq!(loaded, stored);
    assert_eq!(loaded.current_signature(), &formal_target());
    assert_eq!(loaded.embedding(), formal_target().embedding().as_slice());
}

#[tokio::test]
async fn get_returns_what_put_stored_in_sqlite() {
    let store = SignatureStore::new(Arc::new(SqliteBackend::in_memory().await.unwrap()), 8);
    store.put("acme", signature("warm", 0.4)).await.unwrap();
    store.put("acme", formal_target()).await.unwrap();

    let loaded = store.get("acme").await.unwrap();
    assert_eq!(loaded.current_version(), 2);
    assert_eq!(
        loaded.current_signature().source_fingerprint(),
        formal_target().source_fingerprint()
    );
    for dimension in Dimension::ALL {
        assert_eq!(
            loaded.current_signature().label(dimension),
            formal_target().label(dimension)
        );
    }
    assert_eq!(loaded.history()[0].signature.label(Dimension::Tone), "warm");
    assert_eq!(loaded.embedding(), formal_target().embedding().as_slice());
}

#[tokio::test]
async fn sqlite_history_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("profiles.db");
    {
        let store = SignatureStore::new(Arc::new(SqliteBackend::open(&path).await.unwrap()), 8);
        store.put("acme", signature("warm", 0.6)).await.unwrap();
        store.put("acme", formal_target()).await.unwrap();
    }

    let store = SignatureStore::new(Arc::new(SqliteBackend::open(&path).await.unwrap()), 8);
    let profile = store.get("acme").await.unwrap();
    assert_eq!(profile.current_version(), 2);
    assert_eq!(profile.current_signature().label(Dimension::Tone), "formal");

    let next = store.put("acme", signature("warm", 0.6)).await.unwrap();
    assert_eq!(next.current_version(), 3);
}

#[tokio::test]
async fn similarity_search_matches_across_backends() {
    let memory = SignatureStore::new(Arc::new(InMemoryBackend::new()), 8);
    let sqlite = SignatureStore::new(Arc::new(SqliteBackend::in_memory().await.unwrap()), 8);
    for store in [&memory, &sqlite] {
        store.put("formal-co", formal_target()).await.unwrap();
        store.put("warm-co", signature("warm", 0.9)).await.unwrap();
    }

    let from_memory = memory.find_similar(&formal_target(), 1).await.unwrap();
    let from_sqlite = sqlite.find_similar(&formal_target(), 1).await.unwrap();
    assert_eq!(from_memory[0].brand_id, "formal-co");
    assert_eq!(from_sqlite[0].brand_id, "formal-co");
    assert!((from_memory[0].similarity - from_sqlite[0].similarity).abs() < 1e-6);
}

fn scored_evaluation() -> EvaluationResult {
    EvaluationResult {
        fluency: 88.0,
        authenticity: 73.456,
        tone_alignment: 0.0,
        readability: 61.2,
        overall_score: 53,
        strengths: vec!["Fluent, natural phrasing.".into()],
        suggestions: vec!["Use shorter sentences.".into()],
        dimension_match: BTreeMap::from([(Dimension::Tone, 1.0), (Dimension::Formality, 0.0)]),
        degraded: vec![SubScore::ToneAlignment],
    }
}

#[tokio::test]
async fn sqlite_evaluations_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("evaluations.db");

    let record = {
        let store = SignatureStore::new(Arc::new(SqliteBackend::open(&path).await.unwrap()), 8);
        store
            .record_evaluation(Some("acme"), "hey folks", "Dear customers,", &scored_evaluation())
            .await
            .unwrap()
    };

    let reopened = SignatureStore::new(Arc::new(SqliteBackend::open(&path).await.unwrap()), 8);
    let loaded = reopened.get_evaluation(&record.evaluation_id).await.unwrap();
    assert_eq!(loaded.evaluation, scored_evaluation());
    assert_eq!(loaded.brand_id.as_deref(), Some("acme"));
    assert_eq!(loaded.original, "hey folks");
    assert_eq!(loaded.rewritten, "Dear customers,");
    assert_eq!(loaded.recorded_at.timestamp(), record.recorded_at.timestamp());

    assert!(matches!(
        reopened.get_evaluation("missing").await.unwrap_err(),
        ToneError::EvaluationNotFound { .. }
    ));
}

#[tokio::test]
async fn memory_evaluation_lookup_matches_sqlite() {
    let memory = SignatureStore::new(Arc::new(InMemoryBackend::new()), 8);
    let sqlite = SignatureStore::new(Arc::new(SqliteBackend::in_memory().await.unwrap()), 8);

    for store in [&memory, &sqlite] {
        let record = store
            .record_evaluation(None, "original", "rewritten", &scored_evaluation())
            .await
            .unwrap();
        let loaded = store.get_evaluation(&record.evaluation_id).await.unwrap();
        assert_eq!(loaded.evaluation, record.evaluation);
        assert_eq!(loaded.brand_id, None);
    }
}
