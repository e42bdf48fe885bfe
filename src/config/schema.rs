use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ── Top-level config ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - computed at load time, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub reliability: ReliabilityConfig,

    #[serde(default)]
    pub analyzer: AnalyzerConfig,

    #[serde(default)]
    pub rewriter: RewriterConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            provider: ProviderConfig::default(),
            reliability: ReliabilityConfig::default(),
            analyzer: AnalyzerConfig::default(),
            rewriter: RewriterConfig::default(),
            pipeline: PipelineConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl Config {
    /// Reject combinations the components cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let rewriter = &self.rewriter;
        if !(rewriter.min_length_ratio > 0.0 && rewriter.min_length_ratio <= rewriter.max_length_ratio)
        {
            return Err(ConfigError::Validation(format!(
                "rewriter length band [{}, {}] is empty or inverted",
                rewriter.min_length_ratio, rewriter.max_length_ratio
            )));
        }
        if self.pipeline.acceptance_threshold > 100 {
            return Err(ConfigError::Validation(format!(
                "pipeline.acceptance_threshold {} exceeds 100",
                self.pipeline.acceptance_threshold
            )));
        }
        if self.pipeline.max_iterations == 0 {
            return Err(ConfigError::Validation(
                "pipeline.max_iterations must be at least 1".into(),
            ));
        }
        if self.reliability.max_concurrent_requests == 0 {
            return Err(ConfigError::Validation(
                "reliability.max_concurrent_requests must be at least 1".into(),
            ));
        }
        if self.analyzer.parse_attempts == 0 {
            return Err(ConfigError::Validation(
                "analyzer.parse_attempts must be at least 1".into(),
            ));
        }
        for (name, temperature) in [
            ("analyzer.temperature", self.analyzer.temperature),
            ("rewriter.temperature", self.rewriter.temperature),
        ] {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ConfigError::Validation(format!(
                    "{name} {temperature} is outside [0, 2]"
                )));
            }
        }
        Ok(())
    }
}

// ── Provider ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_name")]
    pub name: String,
    /// Root URL; `/v1/...` paths are appended.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
}

fn default_provider_name() -> String {
    "openai".into()
}

fn default_base_url() -> String {
    "https://api.openai.com".into()
}

fn default_model() -> String {
    "gpt-4o-mini".into()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: default_provider_name(),
            base_url: default_base_url(),
            api_key: None,
            model: default_model(),
            embedding_model: default_embedding_model(),
        }
    }
}

// ── Reliability ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReliabilityConfig {
    #[serde(default = "default_provider_retries")]
    pub provider_retries: u32,
    #[serde(default = "default_provider_backoff_ms")]
    pub provider_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
}

fn default_provider_retries() -> u32 {
    2
}

fn default_provider_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    10_000
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_max_concurrent_requests() -> usize {
    4
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            provider_retries: default_provider_retries(),
            provider_backoff_ms: default_provider_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            max_concurrent_requests: default_max_concurrent_requests(),
        }
    }
}

// ── Analyzer ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    #[serde(default = "default_max_text_chars")]
    pub max_text_chars: usize,
    #[serde(default = "default_parse_attempts")]
    pub parse_attempts: u32,
    #[serde(default)]
    pub temperature: f64,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

fn default_max_text_chars() -> usize {
    20_000
}

fn default_parse_attempts() -> u32 {
    3
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

fn default_cache_capacity() -> usize {
    1000
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            max_text_chars: default_max_text_chars(),
            parse_attempts: default_parse_attempts(),
            temperature: 0.0,
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

// ── Rewriter ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewriterConfig {
    #[serde(default = "default_keyword_retries")]
    pub keyword_retries: u32,
    #[serde(default = "default_min_length_ratio")]
    pub min_length_ratio: f64,
    #[serde(default = "default_max_length_ratio")]
    pub max_length_ratio: f64,
    #[serde(default = "default_rewrite_temperature")]
    pub temperature: f64,
}

fn default_keyword_retries() -> u32 {
    2
}

fn default_min_length_ratio() -> f64 {
    0.5
}

fn default_max_length_ratio() -> f64 {
    2.0
}

fn default_rewrite_temperature() -> f64 {
    0.7
}

impl Default for RewriterConfig {
    fn default() -> Self {
        Self {
            keyword_retries: default_keyword_retries(),
            min_length_ratio: default_min_length_ratio(),
            max_length_ratio: default_max_length_ratio(),
            temperature: default_rewrite_temperature(),
        }
    }
}

// ── Pipeline ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_acceptance_threshold")]
    pub acceptance_threshold: u32,
    /// Rewrite/evaluate rounds, first attempt included.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
}

fn default_acceptance_threshold() -> u32 {
    70
}

fn default_max_iterations() -> u32 {
    3
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            acceptance_threshold: default_acceptance_threshold(),
            max_iterations: default_max_iterations(),
        }
    }
}

// ── Store ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StoreBackendKind {
    Memory,
    Sqlite,
}

impl StoreBackendKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" | "in_memory" => Some(Self::Memory),
            "sqlite" => Some(Self::Sqlite),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_backend")]
    pub backend: StoreBackendKind,
    /// SQLite database file; `~` is expanded.
    #[serde(default = "default_store_path")]
    pub path: String,
    #[serde(default = "default_max_conflict_retries")]
    pub max_conflict_retries: u32,
}

fn default_store_backend() -> StoreBackendKind {
    StoreBackendKind::Sqlite
}

fn default_store_path() -> String {
    "~/.brandvoice/brandvoice.db".into()
}

fn default_max_conflict_retries() -> u32 {
    64
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            path: default_store_path(),
            max_conflict_retries: default_max_conflict_retries(),
        }
    }
}

impl StoreConfig {
    pub fn resolved_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.path).into_owned())
    }
}
