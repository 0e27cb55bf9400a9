//! Terminal output formatter

use safetyvision_core::{ConfidenceBand, FormattedContext, SafetyReport};

pub fn format_report(report: &SafetyReport) -> String {
    let mut output = format!(
        "Report {}  ({})\n\n",
        report.report_id,
        report.generated_at.format("%Y-%m-%d %H:%M:%S")
    );

    if report.violations.is_empty() {
        output.push_str("No hazards detected\n");
        return output;
    }

    for v in &report.violations {
        output.push_str(&format!(
            "#{} [{}] {} - {}\n",
            v.hazard_id, v.hazard_level, v.hazard_category, v.hazard_description
        ));
        output.push_str(&format!("  Regulation:      {}\n", v.rule_reference));
        output.push_str(&format!("  Recommendations: {}\n", v.recommendations));
        for s in &v.source_documents {
            output.push_str(&format!("  Source:          {} ({})\n", s.filename, s.location));
        }
        output.push('\n');
    }

    output
}

pub fn format_retrieval(query: &str, context: &FormattedContext, band: ConfidenceBand) -> String {
    let mut output = format!("Query:           {}\n", query);
    output.push_str(&format!("Max score:       {:.3} ({})\n\n", context.max_score, band));
    output.push_str("Sources:\n");
    for line in context.sources.lines() {
        output.push_str(&format!("  {}\n", line));
    }
    output.push('\n');
    output.push_str(&context.context);
    output.push('\n');
    output
}
