use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// `brandvoice` - tone signatures, keyword-preserving rewrites and rewrite
/// evaluation for brand voice.
#[derive(Parser, Debug)]
#[command(name = "brandvoice")]
#[command(version = "0.1.0")]
#[command(about = "Analyze, store and rewrite toward a brand's tone of voice.", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.brandvoice/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at DEBUG instead of INFO
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Text given inline or read from a `.txt`, `.md` or `.docx` file.
#[derive(Args, Debug, Clone)]
pub struct TextArgs {
    /// Inline text
    #[arg(long, conflicts_with = "file", required_unless_present = "file")]
    pub text: Option<String>,

    /// Read the text from a file
    #[arg(long)]
    pub file: Option<PathBuf>,
}

/// Target voice: a stored brand or a signature JSON file.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Use the current signature of this brand
    #[arg(long, conflicts_with = "signature", required_unless_present = "signature")]
    pub brand: Option<String>,

    /// Signature JSON file (output of `analyze`, or a bare dimension map)
    #[arg(long)]
    pub signature: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze the tone of a text
    Analyze {
        #[command(flatten)]
        input: TextArgs,
    },

    /// Extract a document's text and analyze its tone
    AnalyzeDoc {
        /// Path to a .txt, .md or .docx file
        path: PathBuf,
    },

    /// Rewrite a text once toward a target voice
    Rewrite {
        #[command(flatten)]
        input: TextArgs,

        #[command(flatten)]
        target: TargetArgs,

        /// Keyword that must survive the rewrite (repeatable)
        #[arg(short = 'k', long = "keyword")]
        keywords: Vec<String>,
    },

    /// Score a rewrite against its original and a target voice
    Evaluate {
        /// Original text
        #[arg(long)]
        original: String,

        /// Rewritten text
        #[arg(long)]
        candidate: String,

        #[command(flatten)]
        target: TargetArgs,

        /// Store the evaluation and print its id
        #[arg(long)]
        persist: bool,
    },

    /// Rewrite and evaluate until the acceptance threshold is met
    Pipeline {
        #[command(flatten)]
        input: TextArgs,

        #[command(flatten)]
        target: TargetArgs,

        /// Keyword that must survive the rewrite (repeatable)
        #[arg(short = 'k', long = "keyword")]
        keywords: Vec<String>,

        /// Store the winning evaluation and print its id
        #[arg(long)]
        persist: bool,
    },

    /// Look up stored evaluations
    Evaluation {
        #[command(subcommand)]
        evaluation_command: EvaluationCommands,
    },

    /// Manage stored brand signatures
    Signature {
        #[command(subcommand)]
        signature_command: SignatureCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum EvaluationCommands {
    /// Show an evaluation stored with `--persist`
    Get { evaluation_id: String },
}

#[derive(Subcommand, Debug)]
pub enum SignatureCommands {
    /// Show a brand's profile and signature history
    Get { brand_id: String },

    /// Store a signature JSON file as the brand's next version
    Put { brand_id: String, file: PathBuf },

    /// Analyze sample documents and store the result for a brand
    Learn {
        brand_id: String,

        /// Sample .txt, .md or .docx files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Brands whose current signature is closest to a target
    Similar {
        #[command(flatten)]
        target: TargetArgs,

        /// Number of results
        #[arg(long, default_value_t = 5)]
        top_k: usize,
    },
}
