mod engine;
mod templates;

pub use engine::{PromptEngine, RewritePrompt};
