//! Markdown output formatter

use safetyvision_core::{ConfidenceBand, FormattedContext, SafetyReport};

pub fn format_report(report: &SafetyReport) -> String {
    let mut output = format!("# Safety Report {}\n\n", report.report_id);
    output.push_str(&format!(
        "*Generated {}*\n\n",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    for v in &report.violations {
        output.push_str(&format!("## {}. {}\n\n", v.hazard_id, v.hazard_description));
        output.push_str(&format!("- **Category**: {}\n", v.hazard_category));
        output.push_str(&format!("- **Level**: {}\n", v.hazard_level));
        output.push_str(&format!("- **Regulation**: {}\n", v.rule_reference));
        output.push_str(&format!("- **Recommendations**: {}\n", v.recommendations));
        if !v.source_documents.is_empty() {
            output.push_str("- **Sources**:\n");
            for s in &v.source_documents {
                output.push_str(&format!("  - `{}` ({})\n", s.filename, s.location));
            }
        }
        output.push_str("\n---\n\n");
    }

    if report.violations.is_empty() {
        output.push_str("*No hazards detected*\n");
    }

    output
}

pub fn format_retrieval(query: &str, context: &FormattedContext, band: ConfidenceBand) -> String {
    let mut output = format!("# Retrieval: {}\n\n", query);
    output.push_str(&format!(
        "- **Max score**: {:.3}\n- **Confidence**: {}\n\n",
        context.max_score, band
    ));
    output.push_str("## Sources\n\n");
    output.push_str(&context.sources);
    output.push_str("\n\n## Context\n\n");
    output.push_str(&context.context);
    output.push('\n');
    output
}
