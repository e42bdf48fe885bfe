use crate::signature::ToneSignature;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

struct Entry {
    stored_at: Instant,
    signature: ToneSignature,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    order: VecDeque<String>,
}

/// Fingerprint-keyed memo of successful analyses with TTL and a size bound.
/// Oldest insertions are evicted first.
pub struct AnalysisCache {
    ttl: Duration,
    capacity: usize,
    inner: Mutex<Inner>,
}

impl AnalysisCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn get(&self, fingerprint: &str) -> Option<ToneSignature> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let expired = match inner.entries.get(fingerprint) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => {
                return Some(entry.signature.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            inner.entries.remove(fingerprint);
            inner.order.retain(|key| key != fingerprint);
        }
        None
    }

    /// Store a signature. Degraded signatures are never cached.
    pub fn insert(&self, signature: &ToneSignature) {
        if self.capacity == 0 || signature.is_degraded() {
            return;
        }
        let key = signature.source_fingerprint().to_string();
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if inner.entries.contains_key(&key) {
            inner.order.retain(|existing| *existing != key);
        }
        inner.order.push_back(key.clone());
        inner.entries.insert(
            key,
            Entry {
                stored_at: Instant::now(),
                signature: signature.clone(),
            },
        );
        while inner.entries.len() > self.capacity {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            inner.entries.remove(&oldest);
        }
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
