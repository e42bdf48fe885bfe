//! Text to tone signature, via the generation collaborator.
//!
//! The analyzer never fails because the model misbehaved: unparseable
//! output is retried, and a collaborator that stays down yields a degraded
//! signature instead of an error. Only caller input is rejected.

pub mod cache;
pub mod parse;

use crate::config::AnalyzerConfig;
use crate::error::{Result, ToneError, ValidationError};
use crate::llm::Provider;
use crate::prompt::PromptEngine;
use crate::signature::{DegradationReason, ToneSignature, fingerprint};
use cache::AnalysisCache;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub use parse::{extract_json_object, parse_fluency_response, parse_signature_response};

pub struct ToneAnalyzer {
    provider: Arc<dyn Provider>,
    prompts: Arc<PromptEngine>,
    cache: AnalysisCache,
    max_text_chars: usize,
    parse_attempts: u32,
    temperature: f64,
}

impl ToneAnalyzer {
    pub fn new(
        provider: Arc<dyn Provider>,
        prompts: Arc<PromptEngine>,
        config: &AnalyzerConfig,
    ) -> Self {
        Self {
            provider,
            prompts,
            cache: AnalysisCache::new(
                Duration::from_secs(config.cache_ttl_secs),
                config.cache_capacity,
            ),
            max_text_chars: config.max_text_chars,
            parse_attempts: config.parse_attempts.max(1),
            temperature: config.temperature,
        }
    }

    pub fn max_text_chars(&self) -> usize {
        self.max_text_chars
    }

    /// Reject blank or over-long input. Text is never truncated.
    pub fn check_text(&self, text: &str) -> std::result::Result<(), ValidationError> {
        check_text_bounds(text, self.max_text_chars)
    }

    pub async fn analyze(&self, text: &str) -> Result<ToneSignature> {
        self.analyze_inner(text, None).await
    }

    pub async fn analyze_cancellable(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<ToneSignature> {
        self.analyze_inner(text, Some(cancel)).await
    }

    /// Analyze several texts as one corpus, joined by blank lines.
    pub async fn analyze_corpus<S: AsRef<str>>(&self, texts: &[S]) -> Result<ToneSignature> {
        let corpus = texts
            .iter()
            .map(|text| text.as_ref().trim())
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");
        self.analyze(&corpus).await
    }

    async fn analyze_inner(
        &self,
        text: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<ToneSignature> {
        self.check_text(text)?;

        let source_fingerprint = fingerprint(text);
        if let Some(hit) = self.cache.get(&source_fingerprint) {
            tracing::debug!(fingerprint = source_fingerprint.as_str(), "Analysis cache hit");
            return Ok(hit);
        }

        let prompt = self.prompts.render_analysis(text)?;
        tracing::debug!(
            fingerprint = source_fingerprint.as_str(),
            prompt_chars = prompt.len(),
            "Analyzing text tone"
        );

        let mut reason = DegradationReason::ParseFailed;
        for attempt in 1..=self.parse_attempts {
            if attempt > 1 && cancel.is_some_and(CancellationToken::is_cancelled) {
                tracing::debug!(attempt, "Analysis cancelled before next parse attempt");
                return Err(ToneError::Cancelled);
            }

            let response = match cancel {
                Some(token) => {
                    self.provider
                        .complete_cancellable(&prompt, self.temperature, token)
                        .await
                }
                None => self.provider.complete(&prompt, self.temperature).await,
            };

            let response = match response {
                Ok(response) => response,
                Err(err) => {
                    tracing::warn!(
                        provider = err.provider(),
                        error = %err,
                        "Analysis collaborator unavailable"
                    );
                    reason = DegradationReason::ProviderUnavailable;
                    break;
                }
            };

            match parse_signature_response(&response, &source_fingerprint) {
                Ok(signature) => {
                    tracing::info!(
                        fingerprint = source_fingerprint.as_str(),
                        attempt,
                        confidence = signature.confidence(),
                        "Tone analysis complete"
                    );
                    self.cache.insert(&signature);
                    return Ok(signature);
                }
                Err(err) => {
                    tracing::warn!(
                        attempt,
                        max_attempts = self.parse_attempts,
                        error = %err,
                        "Unparseable analysis response"
                    );
                }
            }
        }

        tracing::warn!(
            fingerprint = source_fingerprint.as_str(),
            reason = %reason,
            "Returning degraded tone signature"
        );
        Ok(ToneSignature::degraded(source_fingerprint, reason))
    }
}

pub(crate) fn check_text_bounds(
    text: &str,
    max_chars: usize,
) -> std::result::Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::EmptyText);
    }
    let actual = text.chars().count();
    if actual > max_chars {
        return Err(ValidationError::TextTooLong {
            actual,
            max: max_chars,
        });
    }
    Ok(())
}
