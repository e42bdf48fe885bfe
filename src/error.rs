use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `brandvoice`.
///
/// Only structurally invalid input and unknown identifiers are hard failures
/// for callers. Collaborator trouble is retried first and, wherever a partial
/// result exists, reported as a flag on that result instead of an error.
#[derive(Debug, Error)]
pub enum ToneError {
    // ── Caller input ────────────────────────────────────────────────────
    #[error("validation: {0}")]
    Validation(#[from] ValidationError),

    #[error("brand {brand_id} not found")]
    NotFound { brand_id: String },

    #[error("evaluation {evaluation_id} not found")]
    EvaluationNotFound { evaluation_id: String },

    // ── Collaborators ───────────────────────────────────────────────────
    #[error("provider: {0}")]
    ProviderTransient(#[from] ProviderError),

    #[error("unparseable collaborator output: {0}")]
    Parse(String),

    #[error("document: {0}")]
    Document(#[from] DocumentError),

    // ── Persistence ─────────────────────────────────────────────────────
    #[error("store: {0}")]
    Store(#[from] StoreError),

    // ── Config ──────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("request cancelled before a result was available")]
    Cancelled,

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ToneError {
    /// Whether the same call may succeed if repeated later.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ProviderTransient(_) | Self::Parse(_) => true,
            Self::Store(err) => matches!(err, StoreError::Conflict { .. }),
            _ => false,
        }
    }

    /// Whether the failure is the caller's fault (4xx-equivalent).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::NotFound { .. }
                | Self::EvaluationNotFound { .. }
                | Self::Document(_)
        )
    }
}

// ─── Validation errors ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("text is empty")]
    EmptyText,

    #[error("text is {actual} characters, maximum is {max}")]
    TextTooLong { actual: usize, max: usize },

    #[error("invalid brand id {0:?}: use 1-128 characters of [A-Za-z0-9_.-]")]
    InvalidBrandId(String),

    #[error("signature map has no recognized tone dimension")]
    NoDimensions,

    #[error("invalid signature: {0}")]
    Signature(String),
}

// ─── Collaborator errors ────────────────────────────────────────────────────

/// Failure of a generation or embedding call. Every variant is transient.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("provider {provider} rate-limited (retry after {retry_after_secs:?}s)")]
    RateLimited {
        provider: String,
        retry_after_secs: Option<u64>,
    },

    #[error("provider {provider} timed out after {elapsed_ms}ms")]
    Timeout { provider: String, elapsed_ms: u64 },

    #[error("provider {provider} request failed: {message}")]
    Provider { provider: String, message: String },
}

impl ProviderError {
    pub fn provider(&self) -> &str {
        match self {
            Self::RateLimited { provider, .. }
            | Self::Timeout { provider, .. }
            | Self::Provider { provider, .. } => provider,
        }
    }

    pub(crate) fn provider_failure(provider: &str, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.to_string(),
            message: message.into(),
        }
    }
}

// ─── Document extraction errors ─────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("corrupt document {path}: {reason}")]
    CorruptFile { path: String, reason: String },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Store errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("version conflict for brand {brand_id} persisted after {attempts} attempts")]
    Conflict { brand_id: String, attempts: u32 },

    #[error("stored profile for {brand_id} is inconsistent: {reason}")]
    Corrupt { brand_id: String, reason: String },

    #[error("backend: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Backend(err.to_string())
    }
}

// ─── Config errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, ToneError>;

/// Boxed future used at the pipeline's component seams.
pub type ToneFuture<'a, T> =
    std::pin::Pin<Box<dyn std::future::Future<Output = Result<T>> + Send + 'a>>;
