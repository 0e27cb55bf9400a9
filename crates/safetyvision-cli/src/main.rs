//! SafetyVision CLI
//!
//! Safety hazard detection grounded in a regulatory knowledge base.

use anyhow::Result;
use clap::Parser;
use safetyvision_core::error::exit_codes;
use safetyvision_core::{Config, SafetyVisionError};

mod app;
mod commands;
mod output;

use app::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        let code = e
            .downcast_ref::<SafetyVisionError>()
            .map(SafetyVisionError::exit_code)
            .unwrap_or(exit_codes::GENERAL_ERROR);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config = Config::load_from(&config_path)?;

    match cli.command {
        Commands::Analyze(args) => commands::analyze::run(args, &config, cli.format).await,
        Commands::Retrieve(args) => commands::retrieve::run(args, &config, cli.format).await,
        Commands::Config => commands::config::run(&config, &config_path, cli.format),
    }
}
