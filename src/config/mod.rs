mod env_overrides;
mod loader;
pub mod schema;

pub use schema::{
    AnalyzerConfig, Config, PipelineConfig, ProviderConfig, ReliabilityConfig, RewriterConfig,
    StoreBackendKind, StoreConfig,
};
