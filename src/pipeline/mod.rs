//! Bounded rewrite-and-evaluate loop.
//!
//! `INIT → REWRITING → EVALUATING → {ACCEPTED | RETRYING → REWRITING | EXHAUSTED}`
//!
//! Every round either accepts, schedules one more round, or stops, and the
//! number of rounds never exceeds `max_iterations`, so the loop always
//! terminates.

pub mod types;

use crate::config::PipelineConfig;
use crate::error::{Result, ToneError};
use crate::evaluator::{EvaluationResult, RewriteScorer};
use crate::rewriter::TextRewriter;
use crate::signature::ToneSignature;
use crate::store::SignatureStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub use types::{
    Candidate, IterationSummary, PipelineOutcome, PipelineState, RewriteRequest, TargetSpec,
};

pub struct Orchestrator {
    rewriter: Arc<dyn TextRewriter>,
    scorer: Arc<dyn RewriteScorer>,
    store: Arc<SignatureStore>,
    acceptance_threshold: u32,
    max_iterations: u32,
}

impl Orchestrator {
    pub fn new(
        rewriter: Arc<dyn TextRewriter>,
        scorer: Arc<dyn RewriteScorer>,
        store: Arc<SignatureStore>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            rewriter,
            scorer,
            store,
            acceptance_threshold: config.acceptance_threshold,
            max_iterations: config.max_iterations.max(1),
        }
    }

    /// Inline targets pass through; brand targets load the brand's current
    /// signature.
    pub async fn resolve_target(&self, target: &TargetSpec) -> Result<ToneSignature> {
        match target {
            TargetSpec::Inline(signature) => Ok(signature.clone()),
            TargetSpec::Brand(brand_id) => Ok(self
                .store
                .get(brand_id)
                .await?
                .current_signature()
                .clone()),
        }
    }

    pub async fn run(
        &self,
        request: &RewriteRequest,
        cancel: &CancellationToken,
    ) -> Result<PipelineOutcome> {
        let mut trace = vec![PipelineState::Init];
        let target = self.resolve_target(&request.target).await?;

        let mut best: Option<Candidate> = None;
        let mut iterations = Vec::new();
        let mut feedback: Vec<String> = Vec::new();
        let mut cancelled = false;
        let mut stopped_on_error = None;
        let mut accepted = false;

        for iteration in 1..=self.max_iterations {
            if cancel.is_cancelled() {
                tracing::info!(iteration, "Pipeline cancelled, no further rounds");
                cancelled = true;
                break;
            }

            trace.push(PipelineState::Rewriting);
            tracing::debug!(iteration, feedback = feedback.len(), "Rewriting");
            let rewrite = match self
                .rewriter
                .rewrite(
                    &request.text,
                    &target,
                    &request.preserve_keywords,
                    &feedback,
                    cancel,
                )
                .await
            {
                Ok(rewrite) => rewrite,
                Err(ToneError::Cancelled) if best.is_some() => {
                    tracing::info!(iteration, "Rewrite cancelled, keeping best so far");
                    cancelled = true;
                    break;
                }
                Err(err) => {
                    stopped_on_error = Some(stop_or_fail(err, best.as_ref(), iteration)?);
                    break;
                }
            };

            trace.push(PipelineState::Evaluating);
            let evaluation = if rewrite.text.trim().is_empty() {
                tracing::warn!(iteration, "Rewrite came back empty, scoring it zero");
                EvaluationResult::empty_candidate()
            } else {
                match self
                    .scorer
                    .score(&request.text, &rewrite.text, &target, cancel)
                    .await
                {
                    Ok(evaluation) => evaluation,
                    Err(ToneError::Cancelled) if best.is_some() => {
                        tracing::info!(iteration, "Evaluation cancelled, keeping best so far");
                        cancelled = true;
                        break;
                    }
                    Err(err) => {
                        stopped_on_error = Some(stop_or_fail(err, best.as_ref(), iteration)?);
                        break;
                    }
                }
            };

            let candidate = Candidate {
                iteration,
                rewrite,
                evaluation,
            };
            let score = candidate.evaluation.overall_score;
            iterations.push(IterationSummary::of(&candidate));
            feedback.clone_from(&candidate.evaluation.suggestions);

            tracing::info!(
                iteration,
                overall_score = score,
                threshold = self.acceptance_threshold,
                "Rewrite round evaluated"
            );

            if best
                .as_ref()
                .is_none_or(|current| score > current.evaluation.overall_score)
            {
                best = Some(candidate);
            }

            if score >= self.acceptance_threshold {
                accepted = true;
                break;
            }
            if iteration < self.max_iterations {
                trace.push(PipelineState::Retrying);
            }
        }

        let Some(best) = best else {
            return Err(ToneError::Cancelled);
        };

        let final_state = if accepted {
            PipelineState::Accepted
        } else {
            PipelineState::Exhausted
        };
        trace.push(final_state);

        if accepted {
            tracing::info!(
                iteration = best.iteration,
                overall_score = best.evaluation.overall_score,
                "Rewrite accepted"
            );
        } else {
            tracing::warn!(
                rounds = iterations.len(),
                best_iteration = best.iteration,
                overall_score = best.evaluation.overall_score,
                threshold = self.acceptance_threshold,
                cancelled,
                "Rewrite threshold not met, returning best candidate"
            );
        }

        Ok(PipelineOutcome {
            final_state,
            best,
            threshold_not_met: !accepted,
            cancelled,
            stopped_on_error,
            target,
            state_trace: trace,
            iterations,
            evaluation_id: None,
        })
    }
}

/// A retryable failure after a candidate exists ends the loop; anything
/// else surfaces.
fn stop_or_fail(err: ToneError, best: Option<&Candidate>, iteration: u32) -> Result<String> {
    if best.is_some() && err.is_retryable() {
        tracing::warn!(iteration, error = %err, "Collaborator failed, stopping early");
        Ok(err.to_string())
    } else {
        Err(err)
    }
}
