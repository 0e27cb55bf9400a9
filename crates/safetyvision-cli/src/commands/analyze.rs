//! Analyze command

use crate::app::{AnalyzeArgs, OutputFormat};
use crate::output;
use anyhow::Result;
use safetyvision_core::{validate_image, Config, SafetyAnalyzer};

pub async fn run(args: AnalyzeArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let image = std::fs::read(&args.image)?;

    // Reject bad input before any client is built
    validate_image(&image, config.settings.max_image_bytes)?;

    let analyzer = SafetyAnalyzer::from_config(config)?;
    let report = analyzer.analyze_report(&image).await?;

    print!("{}", output::format_report(&report, format));
    Ok(())
}
