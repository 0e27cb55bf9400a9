//! Output formatters

pub mod json;
pub mod markdown;
pub mod terminal;

use crate::app::OutputFormat;
use safetyvision_core::{ConfidenceBand, FormattedContext, SafetyReport, Settings};

/// Format an analysis report
pub fn format_report(report: &SafetyReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => json::format_report(report),
        OutputFormat::Md => markdown::format_report(report),
        OutputFormat::Cli => terminal::format_report(report),
    }
}

/// Format the retrieval view for one hazard description
pub fn format_retrieval(
    query: &str,
    context: &FormattedContext,
    settings: &Settings,
    format: OutputFormat,
) -> String {
    let band = ConfidenceBand::classify(context.max_score, settings);
    match format {
        OutputFormat::Json => json::format_retrieval(query, context, band),
        OutputFormat::Md => markdown::format_retrieval(query, context, band),
        OutputFormat::Cli => terminal::format_retrieval(query, context, band),
    }
}
