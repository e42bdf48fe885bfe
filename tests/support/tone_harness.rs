#![allow(dead_code, clippy::needless_lifetimes, clippy::cast_precision_loss)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use brandvoice::config::{Config, StoreBackendKind};
use brandvoice::error::{ProviderError, ToneFuture};
use brandvoice::evaluator::{EvaluationResult, RewriteScorer};
use brandvoice::llm::{EmbeddingProvider, Provider, ProviderFuture, RetryPolicy};
use brandvoice::signature::{RawDimension, RawSignature, ToneSignature, validate};
use brandvoice::store::InMemoryBackend;
use brandvoice::{ToneService, ToneServiceBuilder};
use tokio_util::sync::CancellationToken;

pub const FORMAL_ANALYSIS: &str = r#"{"tone": {"label": "formal", "score": 0.9}, "language_style": {"label": "professional", "score": 0.8}, "formality": {"label": "formal", "score": 0.9}, "address_style": {"label": "impersonal", "score": 0.7}, "emotional_appeal": {"label": "rational", "score": 0.8}, "key_phrases": ["we are pleased"], "confidence": 0.9}"#;

const KEYWORD_LINE: &str = "Keep each of these keywords exactly as written";

// ── Deterministic RNG ───────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            state: seed ^ 0x9E37_79B9_7F4A_7C15,
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    pub fn next_bounded(&mut self, upper_exclusive: u64) -> u64 {
        if upper_exclusive == 0 {
            return 0;
        }
        self.next_u64() % upper_exclusive
    }

    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        let index = usize::try_from(self.next_bounded(items.len() as u64)).unwrap_or(0);
        &items[index]
    }
}

// ── Scripted generation collaborator ────────────────────────────────────────

/// Replays queued responses in order; repeats the last one when drained.
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<String, ProviderError>>>,
    last: Mutex<Option<Result<String, ProviderError>>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(texts.into_iter().map(|t| Ok(t.into())).collect())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn complete<'a>(&'a self, _prompt: &'a str, _temperature: f64) -> ProviderFuture<'a, String> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.responses.lock().unwrap().pop_front();
            let mut last = self.last.lock().unwrap();
            match next {
                Some(next) => {
                    *last = Some(next.clone());
                    next
                }
                None => last.clone().unwrap_or_else(|| {
                    Err(ProviderError::Provider {
                        provider: "scripted".into(),
                        message: "no scripted response".into(),
                    })
                }),
            }
        })
    }
}

/// Answers by prompt kind: analysis, fluency rating or rewrite. Rewrites
/// echo every requested keyword in alternating case.
pub struct RoutingProvider {
    analysis: String,
    fluency: u32,
    calls: AtomicUsize,
}

impl RoutingProvider {
    pub fn new(analysis: impl Into<String>, fluency: u32) -> Self {
        Self {
            analysis: analysis.into(),
            fluency,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Provider for RoutingProvider {
    fn name(&self) -> &str {
        "routing"
    }

    fn complete<'a>(&'a self, prompt: &'a str, _temperature: f64) -> ProviderFuture<'a, String> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if prompt.starts_with("Analyze the tone") {
                Ok(self.analysis.clone())
            } else if prompt.starts_with("Rate the grammar") {
                Ok(format!("{{\"fluency\": {}}}", self.fluency))
            } else {
                Ok(keyword_echo(prompt))
            }
        })
    }
}

/// Keywords listed on the rewrite prompt's keyword line.
pub fn prompt_keywords(prompt: &str) -> Vec<String> {
    let Some(line) = prompt.lines().find(|line| line.contains(KEYWORD_LINE)) else {
        return Vec::new();
    };
    let Some((_, list)) = line.split_once("):") else {
        return Vec::new();
    };
    list.split('"')
        .skip(1)
        .step_by(2)
        .map(ToString::to_string)
        .collect()
}

/// A formal sentence mentioning every prompt keyword, wrapped the way
/// models like to wrap answers.
pub fn keyword_echo(prompt: &str) -> String {
    let keywords = prompt_keywords(prompt);
    if keywords.is_empty() {
        return "Rewritten text: \"We are pleased to share this update with all customers.\""
            .to_string();
    }
    let mentions: Vec<String> = keywords
        .iter()
        .enumerate()
        .map(|(i, keyword)| {
            if i % 2 == 0 {
                keyword.to_uppercase()
            } else {
                keyword.to_lowercase()
            }
        })
        .collect();
    format!(
        "Rewritten text: \"We are pleased to confirm that {} remain available to all customers.\"",
        mentions.join(", ")
    )
}

// ── Embedding collaborator ──────────────────────────────────────────────────

/// Hash-seeded vectors: identical texts embed identically.
pub struct DeterministicEmbedding {
    dims: usize,
    seed: u64,
}

impl DeterministicEmbedding {
    pub const fn new(dims: usize, seed: u64) -> Self {
        Self { dims, seed }
    }

    fn fnv1a64(seed: u64, bytes: &[u8]) -> u64 {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325 ^ seed;
        for &byte in bytes {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        hash
    }

    fn splitmix64(mut x: u64) -> u64 {
        x = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = x;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn unit_f32(x: u64) -> f32 {
        const U24_MAX: f32 = ((1u32 << 24) - 1) as f32;
        let top_u24: u32 = (x >> 40) as u32;
        top_u24 as f32 / U24_MAX
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let base = Self::fnv1a64(self.seed, text.as_bytes());
        (0..self.dims)
            .map(|index| Self::unit_f32(Self::splitmix64(base ^ index as u64)))
            .collect()
    }
}

impl EmbeddingProvider for DeterministicEmbedding {
    fn name(&self) -> &str {
        "deterministic_test"
    }

    fn embed<'a>(&'a self, texts: &'a [&'a str]) -> ProviderFuture<'a, Vec<Vec<f32>>> {
        Box::pin(async move { Ok(texts.iter().map(|text| self.vector(text)).collect()) })
    }
}

// ── Scripted evaluation step ────────────────────────────────────────────────

/// Returns queued overall scores in order; 0 once drained.
pub struct FixedScorer {
    scores: Mutex<VecDeque<u32>>,
    calls: AtomicUsize,
}

impl FixedScorer {
    pub fn new(scores: &[u32]) -> Self {
        Self {
            scores: Mutex::new(scores.iter().copied().collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RewriteScorer for FixedScorer {
    fn score<'a>(
        &'a self,
        _original: &'a str,
        _candidate: &'a str,
        target: &'a ToneSignature,
        _cancel: &'a CancellationToken,
    ) -> ToneFuture<'a, EvaluationResult> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let score = self.scores.lock().unwrap().pop_front().unwrap_or(0);
            let value = f64::from(score);
            Ok(EvaluationResult {
                fluency: value,
                authenticity: value,
                tone_alignment: value,
                readability: value,
                overall_score: score,
                strengths: Vec::new(),
                suggestions: vec![format!("Shift the voice toward {}.", target.describe())],
                dimension_match: BTreeMap::new(),
                degraded: Vec::new(),
            })
        })
    }
}

// ── Fixtures ────────────────────────────────────────────────────────────────

pub fn signature(tone: &str, score: f64) -> ToneSignature {
    let raw = RawSignature::default()
        .with_dimension("tone", RawDimension::scored(tone, score))
        .with_dimension("formality", RawDimension::scored("formal", 0.8))
        .with_dimension("address_style", RawDimension::scored("impersonal", 0.7));
    validate(&raw, format!("fixture-{tone}-{score}")).unwrap()
}

pub fn formal_target() -> ToneSignature {
    signature("formal", 0.9)
}

pub fn memory_config() -> Config {
    let mut config = Config::default();
    config.store.backend = StoreBackendKind::Memory;
    config
}

pub fn no_retry_policy() -> RetryPolicy {
    RetryPolicy {
        max_retries: 0,
        ..RetryPolicy::default()
    }
}

/// Service over in-memory storage with the given collaborators.
pub fn service_builder(
    config: Config,
    provider: Arc<dyn Provider>,
    embedder: Arc<dyn EmbeddingProvider>,
) -> ToneServiceBuilder {
    ToneService::builder(config)
        .provider(provider)
        .embedder(embedder)
        .backend(Arc::new(InMemoryBackend::new()))
        .retry_policy(no_retry_policy())
}
