//! Result merger: folds per-batch outcomes into one aggregated result.
//!
//! A deterministic fold with no I/O and no failure path: an empty outcome
//! list produces a zero-valued result. Violations keep the order outcomes
//! were recorded in; the per-engine file count is what the engine reported
//! opening, taken once per engine rather than summed per batch, so
//! multi-batch engines are not double counted.

use crate::errors::FailureKind;
use crate::orchestration::optimizer::PerformanceMetrics;
use crate::types::{CountMap, EngineStats, Violation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What one (engine, batch) execution produced. Created per run, discarded
/// after merging.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub engine_id: String,
    /// 1-based and contiguous within the engine's group.
    pub batch_number: usize,
    pub rules_in_batch: usize,
    /// Files the engine reported opening for this batch. Zero for a failed
    /// batch.
    pub files_analyzed: usize,
    pub violations: Vec<Violation>,
    pub success: bool,
    pub failure: Option<BatchFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchFailure {
    pub engine_id: String,
    pub batch_number: usize,
    pub kind: FailureKind,
    pub message: String,
}

/// The terminal value of a run. Built once, never mutated after return.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregatedResult {
    pub violations: Vec<Violation>,
    pub engine_stats: HashMap<String, EngineStats>,
    pub by_severity: CountMap,
    pub by_category: CountMap,
    pub total_files: usize,
    /// Distinct engines that actually ran, not (engine, batch) executions.
    pub engines_used: usize,
    pub total_violations: usize,
    pub skipped_rules: Vec<String>,
    pub failures: Vec<BatchFailure>,
    pub metrics: PerformanceMetrics,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

pub struct ResultMerger;

impl ResultMerger {
    /// Fold outcomes in recording order. `filtered_file_count` is the shared
    /// file set handed to every engine this run.
    pub fn merge(
        outcomes: Vec<ExecutionOutcome>,
        filtered_file_count: usize,
        skipped_rules: Vec<String>,
        metrics: PerformanceMetrics,
    ) -> AggregatedResult {
        let mut result = AggregatedResult {
            total_files: filtered_file_count,
            skipped_rules,
            metrics,
            ..Default::default()
        };

        for outcome in outcomes {
            let stats = result
                .engine_stats
                .entry(outcome.engine_id.clone())
                .or_insert_with(EngineStats::default);
            // Every batch sees the same file set, so the per-run figure is
            // the largest per-batch figure, never the sum.
            stats.files_analyzed = stats.files_analyzed.max(outcome.files_analyzed);
            stats.rules_attempted += outcome.rules_in_batch;
            stats.violations_found += outcome.violations.len();
            stats.batches_run += 1;
            if !outcome.success {
                stats.batches_failed += 1;
            }
            if let Some(failure) = outcome.failure {
                result.failures.push(failure);
            }
            for violation in &outcome.violations {
                *result
                    .by_severity
                    .entry(violation.severity.as_str().to_string())
                    .or_insert(0) += 1;
                *result
                    .by_category
                    .entry(violation.category.as_str().to_string())
                    .or_insert(0) += 1;
            }
            result.violations.extend(outcome.violations);
        }

        result.engines_used = result.engine_stats.len();
        result.total_violations = result.violations.len();
        result.completed_at = Some(chrono::Utc::now());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RuleCategory, Severity};

    fn violation(rule: &str, severity: Severity, category: RuleCategory) -> Violation {
        Violation {
            rule_id: rule.to_string(),
            rule_name: rule.to_string(),
            file_path: "src/lib.rs".to_string(),
            line: 1,
            column: 1,
            severity,
            category,
            message: String::new(),
            snippet: None,
            engine: "pattern".to_string(),
        }
    }

    fn outcome(engine: &str, batch: usize, violations: Vec<Violation>) -> ExecutionOutcome {
        ExecutionOutcome {
            engine_id: engine.to_string(),
            batch_number: batch,
            rules_in_batch: 5,
            files_analyzed: 42,
            violations,
            success: true,
            failure: None,
        }
    }

    #[test]
    fn empty_fold_is_the_zero_result() {
        let result = ResultMerger::merge(Vec::new(), 0, Vec::new(), PerformanceMetrics::default());
        assert_eq!(result.total_violations, 0);
        assert_eq!(result.engines_used, 0);
        assert!(result.violations.is_empty());
        assert!(result.engine_stats.is_empty());
        assert!(result.failures.is_empty());
    }

    #[test]
    fn files_counted_once_per_engine_across_batches() {
        let mut partial = outcome("structural", 1, Vec::new());
        // An engine that opened fewer files than the shared set still
        // reports its own figure.
        partial.files_analyzed = 7;
        let outcomes = vec![
            outcome("pattern", 1, vec![violation("a", Severity::Error, RuleCategory::Security)]),
            outcome("pattern", 2, vec![violation("b", Severity::Info, RuleCategory::Style)]),
            partial,
        ];
        let result = ResultMerger::merge(outcomes, 42, Vec::new(), PerformanceMetrics::default());
        assert_eq!(result.engines_used, 2);
        let pattern = &result.engine_stats["pattern"];
        // Two batches over the same 42 files is still 42, never 84.
        assert_eq!(pattern.files_analyzed, 42);
        assert_eq!(pattern.batches_run, 2);
        assert_eq!(pattern.rules_attempted, 10);
        assert_eq!(pattern.violations_found, 2);
        assert_eq!(result.engine_stats["structural"].files_analyzed, 7);
    }

    #[test]
    fn violations_keep_recording_order_and_counters_agree() {
        let outcomes = vec![
            outcome("pattern", 1, vec![
                violation("a", Severity::Error, RuleCategory::Security),
                violation("b", Severity::Warning, RuleCategory::Bugs),
            ]),
            outcome("ai", 1, vec![violation("c", Severity::Error, RuleCategory::Security)]),
        ];
        let result = ResultMerger::merge(outcomes, 3, Vec::new(), PerformanceMetrics::default());
        let order: Vec<String> = result.violations.iter().map(|v| v.rule_id.clone()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
        assert_eq!(result.total_violations, 3);
        assert_eq!(result.by_severity["error"], 2);
        assert_eq!(result.by_category["security"], 2);
    }

    #[test]
    fn failed_batches_surface_without_blocking_stats() {
        let mut failed = outcome("pattern", 2, Vec::new());
        failed.success = false;
        failed.failure = Some(BatchFailure {
            engine_id: "pattern".to_string(),
            batch_number: 2,
            kind: crate::errors::FailureKind::Fatal,
            message: "boom".to_string(),
        });
        let outcomes = vec![
            outcome("pattern", 1, vec![violation("a", Severity::Info, RuleCategory::Style)]),
            failed,
        ];
        let result = ResultMerger::merge(outcomes, 1, Vec::new(), PerformanceMetrics::default());
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.engine_stats["pattern"].batches_failed, 1);
        assert_eq!(result.total_violations, 1);
    }
}
