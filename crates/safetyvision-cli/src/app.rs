//! CLI argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "safetyvision")]
#[command(
    author,
    version,
    about = "Detect safety hazards in site photographs and cite the regulations they violate"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "cli")]
    pub format: OutputFormat,

    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a site photograph and print the safety report
    Analyze(AnalyzeArgs),

    /// Retrieve regulations for a hazard description
    Retrieve(RetrieveArgs),

    /// Show the effective configuration
    Config,
}

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Image file (PNG, JPEG, GIF, WebP or BMP)
    pub image: PathBuf,
}

#[derive(Args)]
pub struct RetrieveArgs {
    /// Hazard description
    #[arg(required = true)]
    pub query: Vec<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Cli,
    Json,
    Md,
}
