use crate::evaluator::{EvaluationResult, SubScore};
use crate::rewriter::{KeywordPreservation, RewriteOutcome};
use crate::signature::ToneSignature;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineState {
    Init,
    Rewriting,
    Evaluating,
    Retrying,
    Accepted,
    Exhausted,
}

/// Target voice of a rewrite: given inline or looked up by brand.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetSpec {
    Inline(ToneSignature),
    Brand(String),
}

impl TargetSpec {
    pub fn brand_id(&self) -> Option<&str> {
        match self {
            Self::Brand(brand_id) => Some(brand_id),
            Self::Inline(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RewriteRequest {
    pub text: String,
    pub target: TargetSpec,
    pub preserve_keywords: Vec<String>,
    /// Keep the winning evaluation in the store and report its id.
    pub persist: bool,
}

impl RewriteRequest {
    pub fn new(text: impl Into<String>, target: TargetSpec) -> Self {
        Self {
            text: text.into(),
            target,
            preserve_keywords: Vec::new(),
            persist: false,
        }
    }

    pub fn persisted(mut self) -> Self {
        self.persist = true;
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preserve_keywords = keywords.into_iter().map(Into::into).collect();
        self
    }
}

/// A rewrite together with its evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub iteration: u32,
    pub rewrite: RewriteOutcome,
    pub evaluation: EvaluationResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IterationSummary {
    pub iteration: u32,
    pub overall_score: u32,
    pub keyword_preservation: KeywordPreservation,
    pub length_deviation: bool,
    pub degraded: Vec<SubScore>,
    pub suggestions: Vec<String>,
}

impl IterationSummary {
    pub(super) fn of(candidate: &Candidate) -> Self {
        Self {
            iteration: candidate.iteration,
            overall_score: candidate.evaluation.overall_score,
            keyword_preservation: candidate.rewrite.keyword_preservation.clone(),
            length_deviation: candidate.rewrite.length_deviation,
            degraded: candidate.evaluation.degraded.clone(),
            suggestions: candidate.evaluation.suggestions.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineOutcome {
    pub final_state: PipelineState,
    /// Highest-scoring candidate observed, earliest on ties.
    pub best: Candidate,
    pub threshold_not_met: bool,
    pub cancelled: bool,
    /// Why the loop stopped early on a collaborator failure, if it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stopped_on_error: Option<String>,
    pub target: ToneSignature,
    pub state_trace: Vec<PipelineState>,
    pub iterations: Vec<IterationSummary>,
    /// Id of the stored evaluation when the request asked to persist it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation_id: Option<String>,
}

impl PipelineOutcome {
    pub fn text(&self) -> &str {
        &self.best.rewrite.text
    }

    pub fn overall_score(&self) -> u32 {
        self.best.evaluation.overall_score
    }
}
