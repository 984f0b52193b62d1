//! Minimal rendering of an aggregated result. Text for terminals, JSON for
//! machines; anything richer belongs in a downstream formatter.

use crate::orchestration::AggregatedResult;
use std::fmt::Write;

pub fn render_text(result: &AggregatedResult) -> String {
    let mut out = String::new();
    for violation in &result.violations {
        let _ = writeln!(
            out,
            "{}:{}:{}: [{}] {} ({}, via {})",
            violation.file_path,
            violation.line,
            violation.column,
            violation.severity.as_str(),
            if violation.message.is_empty() {
                &violation.rule_name
            } else {
                &violation.message
            },
            violation.rule_id,
            violation.engine
        );
        if let Some(snippet) = &violation.snippet {
            let _ = writeln!(out, "    {}", snippet.trim());
        }
    }
    let _ = writeln!(
        out,
        "\n{} violations across {} files, {} engines",
        result.total_violations, result.total_files, result.engines_used
    );
    if !result.skipped_rules.is_empty() {
        let _ = writeln!(
            out,
            "Skipped rules (unsupported by requested engine): {}",
            result.skipped_rules.join(", ")
        );
    }
    for failure in &result.failures {
        let _ = writeln!(
            out,
            "Batch failure: {} (batch {}): {}",
            failure.engine_id, failure.batch_number, failure.message
        );
    }
    out
}

pub fn render_json(result: &AggregatedResult) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(result)
}
