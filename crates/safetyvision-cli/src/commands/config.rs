//! Config command

use crate::app::OutputFormat;
use anyhow::Result;
use safetyvision_core::Config;
use std::path::Path;

const REDACTED: &str = "********";

pub fn run(config: &Config, path: &Path, format: OutputFormat) -> Result<()> {
    let config = redacted(config);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
        OutputFormat::Md => {
            println!("```yaml\n{}```", serde_yaml::to_string(&config)?);
        }
        OutputFormat::Cli => {
            let state = if path.exists() { "" } else { " (not found, using defaults)" };
            println!("Config file:     {}{}", path.display(), state);
            println!();
            print!("{}", serde_yaml::to_string(&config)?);
        }
    }
    Ok(())
}

fn redacted(config: &Config) -> Config {
    let mut config = config.clone();
    for key in [
        &mut config.llm.api_key,
        &mut config.rerank.api_key,
        &mut config.index.api_key,
    ] {
        if key.is_some() {
            *key = Some(REDACTED.to_string());
        }
    }
    config
}
