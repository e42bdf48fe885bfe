//! Rewrite text toward a target signature while keeping required keywords.

pub mod keywords;

use crate::analyzer::check_text_bounds;
use crate::config::RewriterConfig;
use crate::error::{Result, ToneError, ToneFuture};
use crate::llm::Provider;
use crate::prompt::{PromptEngine, RewritePrompt};
use crate::signature::ToneSignature;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub use keywords::{clean_output, missing_keywords, normalize_keywords};

/// Whether every requested keyword survived the rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum KeywordPreservation {
    Complete,
    Partial { missing: Vec<String> },
}

impl KeywordPreservation {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RewriteOutcome {
    pub text: String,
    pub keyword_preservation: KeywordPreservation,
    /// Candidate length over original length, in characters.
    pub length_ratio: f64,
    pub length_deviation: bool,
    pub attempts: u32,
    /// Set when a later regeneration failed and an earlier candidate was kept.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_error: Option<String>,
}

/// Rewriting step of the pipeline.
pub trait TextRewriter: Send + Sync {
    fn rewrite<'a>(
        &'a self,
        text: &'a str,
        target: &'a ToneSignature,
        keywords: &'a [String],
        feedback: &'a [String],
        cancel: &'a CancellationToken,
    ) -> ToneFuture<'a, RewriteOutcome>;
}

pub struct Rewriter {
    provider: Arc<dyn Provider>,
    prompts: Arc<PromptEngine>,
    max_text_chars: usize,
    keyword_retries: u32,
    min_length_ratio: f64,
    max_length_ratio: f64,
    temperature: f64,
}

impl Rewriter {
    pub fn new(
        provider: Arc<dyn Provider>,
        prompts: Arc<PromptEngine>,
        config: &RewriterConfig,
        max_text_chars: usize,
    ) -> Self {
        Self {
            provider,
            prompts,
            max_text_chars,
            keyword_retries: config.keyword_retries,
            min_length_ratio: config.min_length_ratio,
            max_length_ratio: config.max_length_ratio,
            temperature: config.temperature,
        }
    }

    pub async fn rewrite_text(
        &self,
        text: &str,
        target: &ToneSignature,
        keywords: &[String],
        feedback: &[String],
    ) -> Result<RewriteOutcome> {
        self.rewrite_inner(text, target, keywords, feedback, None)
            .await
    }

    async fn rewrite_inner(
        &self,
        text: &str,
        target: &ToneSignature,
        keywords: &[String],
        feedback: &[String],
        cancel: Option<&CancellationToken>,
    ) -> Result<RewriteOutcome> {
        check_text_bounds(text, self.max_text_chars)?;
        let keywords = normalize_keywords(keywords);

        let mut best: Option<(String, Vec<String>)> = None;
        let mut missing_last: Vec<String> = Vec::new();
        let mut provider_error = None;
        let mut attempts = 0_u32;

        for attempt in 0..=self.keyword_retries {
            if attempt > 0 && cancel.is_some_and(CancellationToken::is_cancelled) {
                tracing::debug!(attempt, "Rewrite cancelled before regeneration");
                break;
            }

            let prompt = self.prompts.render_rewrite(&RewritePrompt {
                text,
                target,
                keywords: &keywords,
                missing: &missing_last,
                feedback,
            })?;

            let response = match cancel {
                Some(token) => {
                    self.provider
                        .complete_cancellable(&prompt, self.temperature, token)
                        .await
                }
                None => self.provider.complete(&prompt, self.temperature).await,
            };
            attempts += 1;

            let candidate = match response {
                Ok(raw) => clean_output(&raw),
                Err(err) if best.is_none() => return Err(err.into()),
                Err(err) => {
                    tracing::warn!(
                        provider = err.provider(),
                        error = %err,
                        "Rewrite regeneration failed, keeping best candidate"
                    );
                    provider_error = Some(err.to_string());
                    break;
                }
            };

            let missing = if candidate.is_empty() {
                keywords.clone()
            } else {
                missing_keywords(&candidate, &keywords)
            };

            let improved = best.as_ref().is_none_or(|(best_text, best_missing)| {
                (candidate.is_empty(), missing.len()) < (best_text.is_empty(), best_missing.len())
            });
            let done = !candidate.is_empty() && missing.is_empty();
            if candidate.is_empty() {
                tracing::warn!(attempt = attempts, "Rewrite came back empty");
            } else if !done {
                tracing::warn!(
                    attempt = attempts,
                    missing = ?missing,
                    "Rewrite dropped required keywords"
                );
            }
            if improved {
                best = Some((candidate, missing.clone()));
            }
            if done {
                break;
            }
            missing_last = missing;
        }

        let Some((candidate, missing)) = best else {
            return Err(ToneError::Cancelled);
        };

        let length_ratio = length_ratio(text, &candidate);
        let length_deviation =
            length_ratio < self.min_length_ratio || length_ratio > self.max_length_ratio;
        if length_deviation {
            tracing::warn!(
                ratio = length_ratio,
                min = self.min_length_ratio,
                max = self.max_length_ratio,
                "Rewrite length outside allowed band"
            );
        }

        let keyword_preservation = if missing.is_empty() {
            KeywordPreservation::Complete
        } else {
            KeywordPreservation::Partial { missing }
        };

        tracing::info!(
            attempts,
            keywords = keywords.len(),
            complete = keyword_preservation.is_complete(),
            length_ratio,
            "Rewrite complete"
        );

        Ok(RewriteOutcome {
            text: candidate,
            keyword_preservation,
            length_ratio,
            length_deviation,
            attempts,
            provider_error,
        })
    }
}

impl TextRewriter for Rewriter {
    fn rewrite<'a>(
        &'a self,
        text: &'a str,
        target: &'a ToneSignature,
        keywords: &'a [String],
        feedback: &'a [String],
        cancel: &'a CancellationToken,
    ) -> ToneFuture<'a, RewriteOutcome> {
        Box::pin(self.rewrite_inner(text, target, keywords, feedback, Some(cancel)))
    }
}

#[allow(clippy::cast_precision_loss)]
fn length_ratio(original: &str, candidate: &str) -> f64 {
    let original = original.chars().count().max(1);
    candidate.chars().count() as f64 / original as f64
}
