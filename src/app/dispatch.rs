use crate::cli::{Cli, Commands, EvaluationCommands, SignatureCommands, TargetArgs, TextArgs};
use crate::config::Config;
use crate::document::{DocumentExtractor, FileExtractor};
use crate::error::ValidationError;
use crate::pipeline::{RewriteRequest, TargetSpec};
use crate::service::ToneService;
use crate::signature::{RawSignature, ToneSignature, fingerprint, validate};
use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::path::Path;

/// Run one CLI command and print its result as JSON on stdout.
pub async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    let service = ToneService::from_config(&config).await?;

    match cli.command {
        Commands::Analyze { input } => {
            let text = read_text(&input)?;
            print_json(&service.analyze_text(&text).await?)
        }
        Commands::AnalyzeDoc { path } => print_json(&service.analyze_document(&path).await?),
        Commands::Rewrite {
            input,
            target,
            keywords,
        } => {
            let request = RewriteRequest::new(read_text(&input)?, target_spec(&target)?)
                .with_keywords(keywords);
            print_json(&service.rewrite(&request).await?)
        }
        Commands::Evaluate {
            original,
            candidate,
            target,
            persist,
        } => {
            let target = target_spec(&target)?;
            if persist {
                print_json(
                    &service
                        .evaluate_and_record(&original, &candidate, &target)
                        .await?,
                )
            } else {
                print_json(&service.evaluate(&original, &candidate, &target).await?)
            }
        }
        Commands::Pipeline {
            input,
            target,
            keywords,
            persist,
        } => {
            let mut request = RewriteRequest::new(read_text(&input)?, target_spec(&target)?)
                .with_keywords(keywords);
            if persist {
                request = request.persisted();
            }
            print_json(&service.rewrite_and_evaluate(&request).await?)
        }
        Commands::Evaluation {
            evaluation_command: EvaluationCommands::Get { evaluation_id },
        } => print_json(&service.get_evaluation(&evaluation_id).await?),
        Commands::Signature { signature_command } => {
            handle_signature(&service, signature_command).await
        }
    }
}

async fn handle_signature(service: &ToneService, command: SignatureCommands) -> Result<()> {
    match command {
        SignatureCommands::Get { brand_id } => print_json(&service.get_signature(&brand_id).await?),
        SignatureCommands::Put { brand_id, file } => {
            let signature = load_signature(&file)?;
            print_json(&service.put_signature(&brand_id, signature).await?)
        }
        SignatureCommands::Learn { brand_id, files } => {
            let texts = files
                .iter()
                .map(|path| FileExtractor.extract(path))
                .collect::<Result<Vec<_>, _>>()?;
            tracing::info!(
                brand_id = brand_id.as_str(),
                samples = texts.len(),
                "Learning brand signature"
            );
            print_json(&service.create_signature_from_text(&brand_id, &texts).await?)
        }
        SignatureCommands::Similar { target, top_k } => print_json(
            &service
                .find_similar_brands(&target_spec(&target)?, top_k)
                .await?,
        ),
    }
}

fn read_text(input: &TextArgs) -> Result<String> {
    match (&input.text, &input.file) {
        (Some(text), _) => Ok(text.clone()),
        (None, Some(path)) => Ok(FileExtractor.extract(path)?),
        (None, None) => bail!("provide --text or --file"),
    }
}

fn target_spec(target: &TargetArgs) -> Result<TargetSpec> {
    match (&target.brand, &target.signature) {
        (Some(brand), _) => Ok(TargetSpec::Brand(brand.clone())),
        (None, Some(path)) => Ok(TargetSpec::Inline(load_signature(path)?)),
        (None, None) => bail!("provide --brand or --signature"),
    }
}

/// Accepts a full signature as printed by `analyze`, or any dimension map
/// the schema validator understands.
pub fn load_signature(path: &Path) -> Result<ToneSignature> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read signature file {}", path.display()))?;
    parse_signature(&contents)
        .with_context(|| format!("Invalid signature file {}", path.display()))
}

fn parse_signature(contents: &str) -> Result<ToneSignature> {
    let value: serde_json::Value =
        serde_json::from_str(contents).context("signature file is not JSON")?;
    if let Ok(signature) = serde_json::from_value::<ToneSignature>(value.clone()) {
        return Ok(signature);
    }
    let raw = RawSignature::from_json(&value).map_err(ValidationError::Signature)?;
    Ok(validate(&raw, fingerprint(contents))?)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
