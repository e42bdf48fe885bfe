use super::traits::{
    AppendOutcome, EvaluationRecord, HistoryEntry, ProfileBackend, ProfileVector, StoreFuture,
};
use crate::error::StoreError;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Process-local backend. Histories live only as long as the process.
#[derive(Default)]
pub struct InMemoryBackend {
    profiles: RwLock<HashMap<String, Vec<HistoryEntry>>>,
    evaluations: RwLock<HashMap<String, EvaluationRecord>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProfileBackend for InMemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    fn load_history<'a>(&'a self, brand_id: &'a str) -> StoreFuture<'a, Vec<HistoryEntry>> {
        Box::pin(async move {
            let profiles = self.profiles.read().unwrap_or_else(PoisonError::into_inner);
            Ok(profiles.get(brand_id).cloned().unwrap_or_default())
        })
    }

    fn append<'a>(
        &'a self,
        brand_id: &'a str,
        entry: &'a HistoryEntry,
    ) -> StoreFuture<'a, AppendOutcome> {
        Box::pin(async move {
            let mut profiles = self.profiles.write().unwrap_or_else(PoisonError::into_inner);
            let latest = profiles
                .get(brand_id)
                .and_then(|history| history.last())
                .map_or(0, |last| last.version);
            if entry.version != latest + 1 {
                return Ok(AppendOutcome::Conflict);
            }
            profiles
                .entry(brand_id.to_string())
                .or_default()
                .push(entry.clone());
            Ok(AppendOutcome::Appended)
        })
    }

    fn scan_vectors(&self) -> StoreFuture<'_, Vec<ProfileVector>> {
        Box::pin(async move {
            let profiles = self.profiles.read().unwrap_or_else(PoisonError::into_inner);
            Ok(profiles
                .iter()
                .filter_map(|(brand_id, history)| {
                    let latest = history.last()?;
                    Some(ProfileVector {
                        brand_id: brand_id.clone(),
                        version: latest.version,
                        recorded_at: latest.recorded_at,
                        embedding: latest.signature.embedding(),
                    })
                })
                .collect())
        })
    }

    fn insert_evaluation<'a>(&'a self, record: &'a EvaluationRecord) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut evaluations = self
                .evaluations
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if evaluations.contains_key(&record.evaluation_id) {
                return Err(StoreError::Backend(format!(
                    "evaluation {} already stored",
                    record.evaluation_id
                )));
            }
            evaluations.insert(record.evaluation_id.clone(), record.clone());
            Ok(())
        })
    }

    fn load_evaluation<'a>(
        &'a self,
        evaluation_id: &'a str,
    ) -> StoreFuture<'a, Option<EvaluationRecord>> {
        Box::pin(async move {
            let evaluations = self.evaluations.read().unwrap_or_else(PoisonError::into_inner);
            Ok(evaluations.get(evaluation_id).cloned())
        })
    }
}
