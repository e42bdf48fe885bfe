use crate::error::StoreError;
use crate::evaluator::EvaluationResult;
use crate::signature::ToneSignature;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// One version in a brand's signature history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub version: u64,
    pub signature: ToneSignature,
    pub recorded_at: DateTime<Utc>,
}

/// Latest embedding of one brand, as returned by a vector scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileVector {
    pub brand_id: String,
    pub version: u64,
    pub recorded_at: DateTime<Utc>,
    pub embedding: Vec<f32>,
}

/// An evaluation the caller asked to keep, with the texts it scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub evaluation_id: String,
    /// Set when the target voice was a stored brand.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_id: Option<String>,
    pub original: String,
    pub rewritten: String,
    pub evaluation: EvaluationResult,
    pub recorded_at: DateTime<Utc>,
}

/// Result of a compare-and-append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Appended,
    /// Another writer already holds `entry.version`, or the entry does not
    /// directly follow the latest stored version.
    Conflict,
}

/// Persistent storage for brand signature histories.
pub trait ProfileBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Full history in ascending version order; empty for unknown brands.
    fn load_history<'a>(&'a self, brand_id: &'a str) -> StoreFuture<'a, Vec<HistoryEntry>>;

    /// Store `entry` only if its version is exactly one past the latest.
    fn append<'a>(
        &'a self,
        brand_id: &'a str,
        entry: &'a HistoryEntry,
    ) -> StoreFuture<'a, AppendOutcome>;

    /// Latest embedding for every brand.
    fn scan_vectors(&self) -> StoreFuture<'_, Vec<ProfileVector>>;

    /// Keep `record` under its `evaluation_id`. Ids are never reused.
    fn insert_evaluation<'a>(&'a self, record: &'a EvaluationRecord) -> StoreFuture<'a, ()>;

    fn load_evaluation<'a>(
        &'a self,
        evaluation_id: &'a str,
    ) -> StoreFuture<'a, Option<EvaluationRecord>>;
}
