//! Versioned brand signature storage with similarity lookup.
//!
//! A brand's history only ever grows. Each `put` reads the latest version
//! `v` and compare-and-appends `v + 1`; losing a race re-reads and tries
//! again, so concurrent writers to one brand never drop a version.

pub mod factory;
pub mod memory;
pub mod sqlite;
pub mod traits;
pub mod vector;

use crate::error::{Result, StoreError, ToneError, ValidationError};
use crate::evaluator::EvaluationResult;
use crate::signature::ToneSignature;
use chrono::Utc;
use serde::Serialize;
use std::cmp::Ordering;
use std::sync::Arc;
use uuid::Uuid;

pub use factory::create_backend;
pub use memory::InMemoryBackend;
pub use sqlite::SqliteBackend;
pub use traits::{
    AppendOutcome, EvaluationRecord, HistoryEntry, ProfileBackend, ProfileVector, StoreFuture,
};

const MAX_BRAND_ID_CHARS: usize = 128;

/// Brand identifiers are 1-128 characters of `[A-Za-z0-9_.-]`.
pub fn validate_brand_id(brand_id: &str) -> std::result::Result<(), ValidationError> {
    let valid = !brand_id.is_empty()
        && brand_id.len() <= MAX_BRAND_ID_CHARS
        && brand_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidBrandId(brand_id.to_string()))
    }
}

/// A brand's signature history and its current signature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrandProfile {
    brand_id: String,
    current_signature: ToneSignature,
    history: Vec<HistoryEntry>,
    embedding: Vec<f32>,
}

impl BrandProfile {
    fn from_history(
        brand_id: &str,
        history: Vec<HistoryEntry>,
    ) -> std::result::Result<Self, StoreError> {
        let corrupt = |reason: &str| StoreError::Corrupt {
            brand_id: brand_id.to_string(),
            reason: reason.to_string(),
        };

        if history
            .windows(2)
            .any(|pair| pair[1].version <= pair[0].version)
        {
            return Err(corrupt("history versions are not strictly increasing"));
        }
        let current_signature = history
            .last()
            .map(|entry| entry.signature.clone())
            .ok_or_else(|| corrupt("history is empty"))?;

        Ok(Self {
            brand_id: brand_id.to_string(),
            embedding: current_signature.embedding(),
            current_signature,
            history,
        })
    }

    pub fn brand_id(&self) -> &str {
        &self.brand_id
    }

    pub fn current_signature(&self) -> &ToneSignature {
        &self.current_signature
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn embedding(&self) -> &[f32] {
        &self.embedding
    }

    pub fn current_version(&self) -> u64 {
        self.history.last().map_or(0, |entry| entry.version)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarBrand {
    pub brand_id: String,
    pub similarity: f32,
    pub version: u64,
}

pub struct SignatureStore {
    backend: Arc<dyn ProfileBackend>,
    max_conflict_retries: u32,
}

impl SignatureStore {
    pub fn new(backend: Arc<dyn ProfileBackend>, max_conflict_retries: u32) -> Self {
        Self {
            backend,
            max_conflict_retries: max_conflict_retries.max(1),
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub async fn get(&self, brand_id: &str) -> Result<BrandProfile> {
        validate_brand_id(brand_id)?;
        let history = self.backend.load_history(brand_id).await?;
        if history.is_empty() {
            return Err(ToneError::NotFound {
                brand_id: brand_id.to_string(),
            });
        }
        Ok(BrandProfile::from_history(brand_id, history)?)
    }

    /// Append `signature` as the brand's next version.
    pub async fn put(&self, brand_id: &str, signature: ToneSignature) -> Result<BrandProfile> {
        validate_brand_id(brand_id)?;

        for attempt in 1..=self.max_conflict_retries {
            let mut history = self.backend.load_history(brand_id).await?;
            let entry = HistoryEntry {
                version: history.last().map_or(0, |last| last.version) + 1,
                signature: signature.clone(),
                recorded_at: Utc::now(),
            };

            match self.backend.append(brand_id, &entry).await? {
                AppendOutcome::Appended => {
                    tracing::info!(
                        brand_id,
                        version = entry.version,
                        backend = self.backend.name(),
                        "Stored brand signature"
                    );
                    history.push(entry);
                    return Ok(BrandProfile::from_history(brand_id, history)?);
                }
                AppendOutcome::Conflict => {
                    tracing::debug!(
                        brand_id,
                        version = entry.version,
                        attempt,
                        "Signature version conflict, re-reading"
                    );
                    tokio::task::yield_now().await;
                }
            }
        }

        tracing::warn!(
            brand_id,
            attempts = self.max_conflict_retries,
            "Signature version conflicts exhausted"
        );
        Err(StoreError::Conflict {
            brand_id: brand_id.to_string(),
            attempts: self.max_conflict_retries,
        }
        .into())
    }

    /// Keep an evaluation under a fresh id.
    pub async fn record_evaluation(
        &self,
        brand_id: Option<&str>,
        original: &str,
        rewritten: &str,
        evaluation: &EvaluationResult,
    ) -> Result<EvaluationRecord> {
        if let Some(brand_id) = brand_id {
            validate_brand_id(brand_id)?;
        }
        let record = EvaluationRecord {
            evaluation_id: Uuid::new_v4().to_string(),
            brand_id: brand_id.map(str::to_string),
            original: original.to_string(),
            rewritten: rewritten.to_string(),
            evaluation: evaluation.clone(),
            recorded_at: Utc::now(),
        };
        self.backend.insert_evaluation(&record).await?;
        tracing::info!(
            evaluation_id = record.evaluation_id.as_str(),
            brand_id,
            overall_score = record.evaluation.overall_score,
            backend = self.backend.name(),
            "Stored evaluation"
        );
        Ok(record)
    }

    pub async fn get_evaluation(&self, evaluation_id: &str) -> Result<EvaluationRecord> {
        self.backend
            .load_evaluation(evaluation_id)
            .await?
            .ok_or_else(|| ToneError::EvaluationNotFound {
                evaluation_id: evaluation_id.to_string(),
            })
    }

    /// Brands whose current signature is closest to `signature`, most similar
    /// first. Ties go to the most recently recorded version, then the higher
    /// version, then brand id.
    pub async fn find_similar(
        &self,
        signature: &ToneSignature,
        top_k: usize,
    ) -> Result<Vec<SimilarBrand>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let query = signature.embedding();
        let mut scored: Vec<(f32, ProfileVector)> = self
            .backend
            .scan_vectors()
            .await?
            .into_iter()
            .map(|candidate| {
                (
                    vector::cosine_similarity(&query, &candidate.embedding),
                    candidate,
                )
            })
            .collect();

        scored.sort_by(|(score_a, a), (score_b, b)| {
            score_b
                .partial_cmp(score_a)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.recorded_at.cmp(&a.recorded_at))
                .then_with(|| b.version.cmp(&a.version))
                .then_with(|| a.brand_id.cmp(&b.brand_id))
        });
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(similarity, candidate)| SimilarBrand {
                brand_id: candidate.brand_id,
                similarity,
                version: candidate.version,
            })
            .collect())
    }
}
