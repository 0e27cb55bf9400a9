//! Retrieve command

use crate::app::{OutputFormat, RetrieveArgs};
use crate::output;
use anyhow::Result;
use safetyvision_core::{Config, SafetyAnalyzer};

pub async fn run(args: RetrieveArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let query = args.query.join(" ");
    let analyzer = SafetyAnalyzer::from_config(config)?;

    let chunks = analyzer.retriever().retrieve_for_hazard(&query).await;
    let context = analyzer.formatter().format(&chunks);

    print!(
        "{}",
        output::format_retrieval(&query, &context, analyzer.settings(), format)
    );
    Ok(())
}
