//! Score a rewrite against its original text and target signature.
//!
//! Four sub-scores in [0, 100] combine into an integer `overall_score`
//! through [`WEIGHTS`]. A collaborator that stays down zeroes its sub-score
//! and lists it in `degraded` rather than failing the evaluation.

pub mod readability;

use crate::analyzer::{ToneAnalyzer, check_text_bounds, parse_fluency_response};
use crate::error::{Result, ToneFuture, ValidationError};
use crate::llm::{EmbeddingProvider, Provider};
use crate::prompt::PromptEngine;
use crate::signature::{Dimension, ToneSignature};
use crate::store::vector::cosine_similarity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub use readability::flesch_reading_ease;

const STRENGTH_ABOVE: f64 = 85.0;
const SUGGESTION_BELOW: f64 = 60.0;

/// Weights of the overall score. They sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreWeights {
    pub fluency: f64,
    pub authenticity: f64,
    pub tone_alignment: f64,
    pub readability: f64,
}

pub const WEIGHTS: ScoreWeights = ScoreWeights {
    fluency: 0.25,
    authenticity: 0.30,
    tone_alignment: 0.30,
    readability: 0.15,
};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SubScore {
    Fluency,
    Authenticity,
    ToneAlignment,
    Readability,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub fluency: f64,
    pub authenticity: f64,
    pub tone_alignment: f64,
    pub readability: f64,
    pub overall_score: u32,
    pub strengths: Vec<String>,
    pub suggestions: Vec<String>,
    /// Per-dimension agreement between the candidate's analyzed signature
    /// and the target. Empty when the candidate analysis degraded.
    pub dimension_match: BTreeMap<Dimension, f64>,
    pub degraded: Vec<SubScore>,
}

impl EvaluationResult {
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }

    /// Zero score for a rewrite with no text. No collaborator is consulted.
    pub(crate) fn empty_candidate() -> Self {
        Self {
            fluency: 0.0,
            authenticity: 0.0,
            tone_alignment: 0.0,
            readability: 0.0,
            overall_score: 0,
            strengths: Vec::new(),
            suggestions: vec!["Produce a complete rewrite of the original text.".to_string()],
            dimension_match: BTreeMap::new(),
            degraded: Vec::new(),
        }
    }
}

/// Weighted combination of the four sub-scores, rounded.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn overall_score(fluency: f64, authenticity: f64, tone_alignment: f64, readability: f64) -> u32 {
    let weighted = WEIGHTS.fluency * clamp_score(fluency)
        + WEIGHTS.authenticity * clamp_score(authenticity)
        + WEIGHTS.tone_alignment * clamp_score(tone_alignment)
        + WEIGHTS.readability * clamp_score(readability);
    weighted.round().clamp(0.0, 100.0) as u32
}

fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 100.0)
    }
}

/// Evaluation step of the pipeline.
pub trait RewriteScorer: Send + Sync {
    fn score<'a>(
        &'a self,
        original: &'a str,
        candidate: &'a str,
        target: &'a ToneSignature,
        cancel: &'a CancellationToken,
    ) -> ToneFuture<'a, EvaluationResult>;
}

pub struct Evaluator {
    provider: Arc<dyn Provider>,
    embedder: Arc<dyn EmbeddingProvider>,
    analyzer: Arc<ToneAnalyzer>,
    prompts: Arc<PromptEngine>,
    parse_attempts: u32,
    temperature: f64,
}

impl Evaluator {
    pub fn new(
        provider: Arc<dyn Provider>,
        embedder: Arc<dyn EmbeddingProvider>,
        analyzer: Arc<ToneAnalyzer>,
        prompts: Arc<PromptEngine>,
        parse_attempts: u32,
        temperature: f64,
    ) -> Self {
        Self {
            provider,
            embedder,
            analyzer,
            prompts,
            parse_attempts: parse_attempts.max(1),
            temperature,
        }
    }

    pub async fn evaluate(
        &self,
        original: &str,
        candidate: &str,
        target: &ToneSignature,
    ) -> Result<EvaluationResult> {
        self.evaluate_inner(original, candidate, target, None).await
    }

    async fn evaluate_inner(
        &self,
        original: &str,
        candidate: &str,
        target: &ToneSignature,
        cancel: Option<&CancellationToken>,
    ) -> Result<EvaluationResult> {
        let max_chars = self.analyzer.max_text_chars();
        check_text_bounds(original, max_chars)?;
        if candidate.trim().is_empty() {
            return Err(ValidationError::EmptyText.into());
        }
        // Candidates over the input bound skip tone analysis.
        let candidate_chars = candidate.chars().count();
        let analyzable = candidate_chars <= max_chars;

        let analysis = async {
            if !analyzable {
                return Ok(None);
            }
            let signature = match cancel {
                Some(token) => self.analyzer.analyze_cancellable(candidate, token).await,
                None => self.analyzer.analyze(candidate).await,
            };
            signature.map(Some)
        };
        let (fluency, authenticity, analysis) = tokio::join!(
            self.fluency(candidate, cancel),
            self.authenticity(original, candidate),
            analysis,
        );
        let analysis = analysis?;

        let mut degraded = Vec::new();
        let fluency = fluency.unwrap_or_else(|| {
            degraded.push(SubScore::Fluency);
            0.0
        });
        let authenticity = authenticity.unwrap_or_else(|| {
            degraded.push(SubScore::Authenticity);
            0.0
        });
        let (tone_alignment, dimension_match) = match analysis {
            Some(analysis) if !analysis.is_degraded() => (
                clamp_score(analysis.alignment_with(target) * 100.0),
                analysis.agreement_with(target),
            ),
            Some(analysis) => {
                tracing::warn!(
                    reason = ?analysis.degradation(),
                    "Candidate tone analysis degraded, zeroing tone alignment"
                );
                degraded.push(SubScore::ToneAlignment);
                (0.0, BTreeMap::new())
            }
            None => {
                tracing::warn!(
                    candidate_chars,
                    max_chars,
                    "Candidate exceeds analysis bound, zeroing tone alignment"
                );
                degraded.push(SubScore::ToneAlignment);
                (0.0, BTreeMap::new())
            }
        };
        let readability = flesch_reading_ease(candidate);

        let overall_score = overall_score(fluency, authenticity, tone_alignment, readability);
        let (strengths, suggestions) = feedback(
            &[
                (SubScore::Fluency, fluency),
                (SubScore::Authenticity, authenticity),
                (SubScore::ToneAlignment, tone_alignment),
                (SubScore::Readability, readability),
            ],
            &degraded,
            target,
        );

        tracing::info!(
            overall_score,
            fluency,
            authenticity,
            tone_alignment,
            readability,
            degraded = degraded.len(),
            "Evaluation complete"
        );

        Ok(EvaluationResult {
            fluency,
            authenticity,
            tone_alignment,
            readability,
            overall_score,
            strengths,
            suggestions,
            dimension_match,
            degraded,
        })
    }

    /// Collaborator-scored fluency. `None` once parse attempts are spent or
    /// the collaborator is unavailable.
    async fn fluency(&self, candidate: &str, cancel: Option<&CancellationToken>) -> Option<f64> {
        let prompt = match self.prompts.render_fluency(candidate) {
            Ok(prompt) => prompt,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to render fluency prompt");
                return None;
            }
        };

        for attempt in 1..=self.parse_attempts {
            if attempt > 1 && cancel.is_some_and(CancellationToken::is_cancelled) {
                break;
            }
            let response = match cancel {
                Some(token) => {
                    self.provider
                        .complete_cancellable(&prompt, self.temperature, token)
                        .await
                }
                None => self.provider.complete(&prompt, self.temperature).await,
            };
            match response {
                Ok(response) => match parse_fluency_response(&response) {
                    Ok(score) => return Some(score),
                    Err(err) => tracing::warn!(
                        attempt,
                        max_attempts = self.parse_attempts,
                        error = %err,
                        "Unparseable fluency response"
                    ),
                },
                Err(err) => {
                    tracing::warn!(
                        provider = err.provider(),
                        error = %err,
                        "Fluency collaborator unavailable"
                    );
                    return None;
                }
            }
        }
        None
    }

    /// Embedding cosine between original and candidate, scaled to [0, 100].
    async fn authenticity(&self, original: &str, candidate: &str) -> Option<f64> {
        let texts = [original, candidate];
        match self.embedder.embed(&texts).await {
            Ok(vectors) if vectors.len() == 2 => {
                Some(f64::from(cosine_similarity(&vectors[0], &vectors[1])) * 100.0)
            }
            Ok(vectors) => {
                tracing::warn!(
                    returned = vectors.len(),
                    "Embedding collaborator returned wrong vector count"
                );
                None
            }
            Err(err) => {
                tracing::warn!(
                    provider = err.provider(),
                    error = %err,
                    "Embedding collaborator unavailable"
                );
                None
            }
        }
    }
}

impl RewriteScorer for Evaluator {
    fn score<'a>(
        &'a self,
        original: &'a str,
        candidate: &'a str,
        target: &'a ToneSignature,
        cancel: &'a CancellationToken,
    ) -> ToneFuture<'a, EvaluationResult> {
        Box::pin(self.evaluate_inner(original, candidate, target, Some(cancel)))
    }
}

/// Fixed strength and suggestion sentences per sub-score. Degraded
/// sub-scores get neither.
fn feedback(
    scores: &[(SubScore, f64)],
    degraded: &[SubScore],
    target: &ToneSignature,
) -> (Vec<String>, Vec<String>) {
    let mut strengths = Vec::new();
    let mut suggestions = Vec::new();

    for &(sub_score, value) in scores {
        if degraded.contains(&sub_score) {
            continue;
        }
        if value > STRENGTH_ABOVE {
            strengths.push(strength_text(sub_score).to_string());
        } else if value < SUGGESTION_BELOW {
            suggestions.push(suggestion_text(sub_score, target));
        }
    }
    (strengths, suggestions)
}

fn strength_text(sub_score: SubScore) -> &'static str {
    match sub_score {
        SubScore::Fluency => "The rewrite reads fluently and is grammatically sound.",
        SubScore::Authenticity => "The rewrite preserves the meaning of the original closely.",
        SubScore::ToneAlignment => "The rewrite matches the target tone profile.",
        SubScore::Readability => "The rewrite is easy to read.",
    }
}

fn suggestion_text(sub_score: SubScore, target: &ToneSignature) -> String {
    match sub_score {
        SubScore::Fluency => "Improve grammar and sentence flow.".to_string(),
        SubScore::Authenticity => {
            "Stay closer to the original meaning and restore any facts, promises or requests \
             that were changed or dropped."
                .to_string()
        }
        SubScore::ToneAlignment => {
            format!("Shift the voice toward the target profile: {}.", target.describe())
        }
        SubScore::Readability => {
            "Use shorter sentences and simpler words to improve readability.".to_string()
        }
    }
}
