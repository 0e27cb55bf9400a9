//! JSON output formatter

use safetyvision_core::{ConfidenceBand, FormattedContext, SafetyReport};

pub fn format_report(report: &SafetyReport) -> String {
    serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string()) + "\n"
}

pub fn format_retrieval(query: &str, context: &FormattedContext, band: ConfidenceBand) -> String {
    let output = serde_json::json!({
        "query": query,
        "max_score": context.max_score,
        "confidence": band.to_string(),
        "is_high_confidence": context.is_high_confidence,
        "sources": context.source_refs,
        "context": context.context,
    });
    serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string()) + "\n"
}
