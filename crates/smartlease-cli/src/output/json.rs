//! JSON output formatter

use smartlease_core::SearchReport;

/// The re-ranking outcome as the API would return it, or the merged
/// candidates when re-ranking was skipped
pub fn format_report(report: &SearchReport) -> String {
    let rendered = match report.outcome {
        Some(ref outcome) => serde_json::to_string_pretty(outcome),
        None => serde_json::to_string_pretty(&serde_json::json!({
            "metadata": report.metadata,
            "filter": report.predicate.to_string(),
            "candidates": report.candidates,
        })),
    };

    rendered.unwrap_or_else(|_| "{}".to_string()) + "\n"
}
