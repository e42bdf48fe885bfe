pub mod openai;
pub mod reliable;
pub mod scrub;
pub mod traits;

pub use openai::OpenAiCompatibleClient;
pub use reliable::{ReliableEmbedding, ReliableProvider, RetryPolicy};
pub use scrub::{sanitize_api_error, scrub_secret_patterns};
pub use traits::{EmbeddingProvider, Provider, ProviderFuture};
