use super::templates;
use crate::signature::{Dimension, ToneSignature};
use serde::Serialize;
use tera::{Context, Tera};

const ANALYZE_TEMPLATE: &str = "analyze.txt";
const REWRITE_TEMPLATE: &str = "rewrite.txt";
const FLUENCY_TEMPLATE: &str = "fluency.txt";

#[derive(Serialize)]
struct DimensionLabels {
    key: &'static str,
    labels: &'static [&'static str],
}

#[derive(Serialize)]
struct TargetLabel<'a> {
    key: &'static str,
    label: &'a str,
}

/// Inputs for one rewrite prompt.
#[derive(Debug, Clone, Copy)]
pub struct RewritePrompt<'a> {
    pub text: &'a str,
    pub target: &'a ToneSignature,
    pub keywords: &'a [String],
    pub missing: &'a [String],
    pub feedback: &'a [String],
}

/// Tera-backed renderer for the analyze, rewrite and fluency prompts.
pub struct PromptEngine {
    tera: Tera,
}

impl PromptEngine {
    pub fn new() -> anyhow::Result<Self> {
        let mut engine = Self {
            tera: Tera::default(),
        };
        engine.add_template(ANALYZE_TEMPLATE, templates::ANALYZE)?;
        engine.add_template(REWRITE_TEMPLATE, templates::REWRITE)?;
        engine.add_template(FLUENCY_TEMPLATE, templates::FLUENCY)?;
        Ok(engine)
    }

    /// Register or replace a template.
    pub fn add_template(&mut self, name: &str, content: &str) -> anyhow::Result<()> {
        self.tera.add_raw_template(name, content)?;
        Ok(())
    }

    pub fn render(&self, template_name: &str, context: &Context) -> anyhow::Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }

    pub fn render_analysis(&self, text: &str) -> anyhow::Result<String> {
        let dimensions: Vec<DimensionLabels> = Dimension::ALL
            .into_iter()
            .map(|dimension| DimensionLabels {
                key: dimension.key(),
                labels: dimension.labels(),
            })
            .collect();

        let mut context = Context::new();
        context.insert("dimensions", &dimensions);
        context.insert("text", text);
        self.render(ANALYZE_TEMPLATE, &context)
    }

    pub fn render_rewrite(&self, prompt: &RewritePrompt<'_>) -> anyhow::Result<String> {
        let target: Vec<TargetLabel<'_>> = prompt
            .target
            .dimensions()
            .map(|(dimension, value)| TargetLabel {
                key: dimension.key(),
                label: &value.label,
            })
            .collect();

        let mut context = Context::new();
        context.insert("target", &target);
        context.insert("key_phrases", prompt.target.key_phrases());
        context.insert("keywords", prompt.keywords);
        context.insert("missing", prompt.missing);
        context.insert("feedback", prompt.feedback);
        context.insert("text", prompt.text);
        self.render(REWRITE_TEMPLATE, &context)
    }

    pub fn render_fluency(&self, text: &str) -> anyhow::Result<String> {
        let mut context = Context::new();
        context.insert("text", text);
        self.render(FLUENCY_TEMPLATE, &context)
    }
}
