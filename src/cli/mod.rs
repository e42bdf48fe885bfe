pub mod commands;

pub use commands::{Cli, Commands, EvaluationCommands, SignatureCommands, TargetArgs, TextArgs};
