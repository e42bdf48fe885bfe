//! Public facade over the analyzer, store, rewriter, evaluator and
//! rewrite-and-evaluate loop.

use crate::analyzer::ToneAnalyzer;
use crate::config::Config;
use crate::document::{DocumentExtractor, FileExtractor};
use crate::error::{ProviderError, Result, ToneError};
use crate::evaluator::{EvaluationResult, Evaluator, RewriteScorer};
use crate::llm::{
    EmbeddingProvider, OpenAiCompatibleClient, Provider, ReliableEmbedding, ReliableProvider,
    RetryPolicy,
};
use crate::pipeline::{Orchestrator, PipelineOutcome, RewriteRequest, TargetSpec};
use crate::prompt::PromptEngine;
use crate::rewriter::{RewriteOutcome, Rewriter, TextRewriter};
use crate::signature::{DegradationReason, ToneSignature};
use crate::store::{
    BrandProfile, EvaluationRecord, ProfileBackend, SignatureStore, SimilarBrand, create_backend,
    validate_brand_id,
};
use anyhow::Context;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

pub struct ToneService {
    provider_name: String,
    analyzer: Arc<ToneAnalyzer>,
    rewriter: Arc<dyn TextRewriter>,
    scorer: Arc<dyn RewriteScorer>,
    orchestrator: Orchestrator,
    store: Arc<SignatureStore>,
    extractor: Arc<dyn DocumentExtractor>,
}

impl ToneService {
    /// Wire every collaborator from configuration.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        ToneServiceBuilder::new(config.clone()).build().await
    }

    pub fn builder(config: Config) -> ToneServiceBuilder {
        ToneServiceBuilder::new(config)
    }

    pub fn store(&self) -> &SignatureStore {
        &self.store
    }

    pub async fn analyze_text(&self, text: &str) -> Result<ToneSignature> {
        self.analyzer.analyze(text).await
    }

    pub async fn analyze_document(&self, path: &Path) -> Result<ToneSignature> {
        let extractor = Arc::clone(&self.extractor);
        let owned: PathBuf = path.to_path_buf();
        let text = tokio::task::spawn_blocking(move || extractor.extract(&owned))
            .await
            .context("document extraction task failed")??;
        self.analyzer.analyze(&text).await
    }

    /// One rewrite toward the request's target, without evaluation.
    pub async fn rewrite(&self, request: &RewriteRequest) -> Result<RewriteOutcome> {
        let target = self.orchestrator.resolve_target(&request.target).await?;
        let cancel = CancellationToken::new();
        self.rewriter
            .rewrite(
                &request.text,
                &target,
                &request.preserve_keywords,
                &[],
                &cancel,
            )
            .await
    }

    pub async fn evaluate(
        &self,
        original: &str,
        candidate: &str,
        target: &TargetSpec,
    ) -> Result<EvaluationResult> {
        let target = self.orchestrator.resolve_target(target).await?;
        let cancel = CancellationToken::new();
        self.scorer.score(original, candidate, &target, &cancel).await
    }

    /// Evaluate and keep the result; the returned record carries its id.
    pub async fn evaluate_and_record(
        &self,
        original: &str,
        candidate: &str,
        target: &TargetSpec,
    ) -> Result<EvaluationRecord> {
        let evaluation = self.evaluate(original, candidate, target).await?;
        self.store
            .record_evaluation(target.brand_id(), original, candidate, &evaluation)
            .await
    }

    pub async fn rewrite_and_evaluate(&self, request: &RewriteRequest) -> Result<PipelineOutcome> {
        self.rewrite_and_evaluate_cancellable(request, &CancellationToken::new())
            .await
    }

    pub async fn rewrite_and_evaluate_cancellable(
        &self,
        request: &RewriteRequest,
        cancel: &CancellationToken,
    ) -> Result<PipelineOutcome> {
        let mut outcome = self.orchestrator.run(request, cancel).await?;
        if request.persist {
            let record = self
                .store
                .record_evaluation(
                    request.target.brand_id(),
                    &request.text,
                    outcome.text(),
                    &outcome.best.evaluation,
                )
                .await?;
            outcome.evaluation_id = Some(record.evaluation_id);
        }
        Ok(outcome)
    }

    pub async fn get_evaluation(&self, evaluation_id: &str) -> Result<EvaluationRecord> {
        self.store.get_evaluation(evaluation_id).await
    }

    pub async fn get_signature(&self, brand_id: &str) -> Result<BrandProfile> {
        self.store.get(brand_id).await
    }

    pub async fn put_signature(
        &self,
        brand_id: &str,
        signature: ToneSignature,
    ) -> Result<BrandProfile> {
        self.store.put(brand_id, signature).await
    }

    /// Analyze sample texts as one corpus and store the result as the
    /// brand's next version. A degraded analysis is never stored.
    pub async fn create_signature_from_text<S: AsRef<str>>(
        &self,
        brand_id: &str,
        texts: &[S],
    ) -> Result<BrandProfile> {
        validate_brand_id(brand_id)?;
        let signature = self.analyzer.analyze_corpus(texts).await?;
        match signature.degradation() {
            None => self.store.put(brand_id, signature).await,
            Some(DegradationReason::ParseFailed) => Err(ToneError::Parse(format!(
                "analysis for brand {brand_id} could not be parsed; signature not stored"
            ))),
            Some(DegradationReason::ProviderUnavailable) => Err(ToneError::ProviderTransient(
                ProviderError::provider_failure(
                    &self.provider_name,
                    format!("unavailable while analyzing brand {brand_id}"),
                ),
            )),
        }
    }

    pub async fn find_similar_brands(
        &self,
        target: &TargetSpec,
        top_k: usize,
    ) -> Result<Vec<SimilarBrand>> {
        let signature = self.orchestrator.resolve_target(target).await?;
        self.store.find_similar(&signature, top_k).await
    }
}

/// Builds a [`ToneService`]; any collaborator left unset comes from config.
pub struct ToneServiceBuilder {
    config: Config,
    provider: Option<Arc<dyn Provider>>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    backend: Option<Arc<dyn ProfileBackend>>,
    extractor: Option<Arc<dyn DocumentExtractor>>,
    rewriter: Option<Arc<dyn TextRewriter>>,
    scorer: Option<Arc<dyn RewriteScorer>>,
    retry_policy: Option<RetryPolicy>,
}

impl ToneServiceBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            provider: None,
            embedder: None,
            backend: None,
            extractor: None,
            rewriter: None,
            scorer: None,
            retry_policy: None,
        }
    }

    pub fn provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn backend(mut self, backend: Arc<dyn ProfileBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn DocumentExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn rewriter(mut self, rewriter: Arc<dyn TextRewriter>) -> Self {
        self.rewriter = Some(rewriter);
        self
    }

    pub fn scorer(mut self, scorer: Arc<dyn RewriteScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    pub async fn build(self) -> anyhow::Result<ToneService> {
        let config = self.config;
        config.validate()?;

        let policy = self
            .retry_policy
            .unwrap_or_else(|| RetryPolicy::from_config(&config.reliability));
        let permits = Arc::new(Semaphore::new(config.reliability.max_concurrent_requests));

        let client = (self.provider.is_none() || self.embedder.is_none()).then(|| {
            Arc::new(OpenAiCompatibleClient::new(
                &config.provider,
                config.reliability.request_timeout_secs,
            ))
        });
        let raw_provider: Arc<dyn Provider> = match (self.provider, &client) {
            (Some(provider), _) => provider,
            (None, Some(client)) => client.clone() as Arc<dyn Provider>,
            (None, None) => anyhow::bail!("no generation provider configured"),
        };
        let raw_embedder: Arc<dyn EmbeddingProvider> = match (self.embedder, &client) {
            (Some(embedder), _) => embedder,
            (None, Some(client)) => client.clone() as Arc<dyn EmbeddingProvider>,
            (None, None) => anyhow::bail!("no embedding provider configured"),
        };

        let provider_name = raw_provider.name().to_string();
        let provider: Arc<dyn Provider> = Arc::new(ReliableProvider::new(
            raw_provider,
            policy.clone(),
            permits.clone(),
        ));
        let embedder: Arc<dyn EmbeddingProvider> =
            Arc::new(ReliableEmbedding::new(raw_embedder, policy, permits));

        let backend = match self.backend {
            Some(backend) => backend,
            None => create_backend(&config.store)
                .await
                .context("Failed to open signature store")?,
        };
        let store = Arc::new(SignatureStore::new(
            backend,
            config.store.max_conflict_retries,
        ));

        let prompts = Arc::new(PromptEngine::new()?);
        let analyzer = Arc::new(ToneAnalyzer::new(
            provider.clone(),
            prompts.clone(),
            &config.analyzer,
        ));

        let rewriter = self.rewriter.unwrap_or_else(|| {
            Arc::new(Rewriter::new(
                provider.clone(),
                prompts.clone(),
                &config.rewriter,
                config.analyzer.max_text_chars,
            ))
        });
        let scorer = self.scorer.unwrap_or_else(|| {
            Arc::new(Evaluator::new(
                provider.clone(),
                embedder,
                analyzer.clone(),
                prompts,
                config.analyzer.parse_attempts,
                config.analyzer.temperature,
            ))
        });

        let orchestrator = Orchestrator::new(
            rewriter.clone(),
            scorer.clone(),
            store.clone(),
            &config.pipeline,
        );

        tracing::info!(
            provider = provider_name.as_str(),
            store = store.backend_name(),
            max_concurrent = config.reliability.max_concurrent_requests,
            "Tone service ready"
        );

        Ok(ToneService {
            provider_name,
            analyzer,
            rewriter,
            scorer,
            orchestrator,
            store,
            extractor: self.extractor.unwrap_or_else(|| Arc::new(FileExtractor)),
        })
    }
}
