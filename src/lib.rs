#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::unnecessary_literal_bound,
    clippy::module_name_repetitions,
    clippy::struct_field_names,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::return_self_not_must_use
)]

pub mod analyzer;
#[doc(hidden)]
pub mod app;
pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod evaluator;
pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod rewriter;
pub mod service;
pub mod signature;
pub mod store;

pub use config::Config;
pub use error::{Result, ToneError};
pub use evaluator::{EvaluationResult, WEIGHTS};
pub use pipeline::{PipelineOutcome, PipelineState, RewriteRequest, TargetSpec};
pub use rewriter::{KeywordPreservation, RewriteOutcome};
pub use service::{ToneService, ToneServiceBuilder};
pub use signature::{Dimension, ToneSignature};
pub use store::{BrandProfile, EvaluationRecord, SignatureStore};
