//! Performance optimizer: file filtering, adaptive timeouts, rule batching.
//!
//! Each responsibility is a pure function of its inputs so runs stay
//! reproducible: same file list and config in, same filtered list, timeouts,
//! and batch layout out.

use crate::config::{PerformanceConfig, ScanConfig};
use crate::types::Rule;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Counters describing what optimization did to the workload. Built once per
/// run and attached to the aggregated result unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub original_file_count: usize,
    pub filtered_file_count: usize,
    pub original_rule_count: usize,
    pub routed_rule_count: usize,
    pub batch_count: usize,
    pub optimization_ms: u64,
}

#[derive(Debug)]
pub struct FileFilterOutcome {
    pub files: Vec<PathBuf>,
    pub removed: usize,
}

pub struct PerformanceOptimizer {
    scan: ScanConfig,
    performance: PerformanceConfig,
    exclusions: Vec<Regex>,
}

/// Translate a glob-style exclusion into a case-insensitive regex that
/// matches anywhere in the path: `*` spans path segments, `?` is one
/// character, everything else is literal.
fn glob_to_regex(pattern: &str) -> Option<Regex> {
    let mut translated = String::with_capacity(pattern.len() + 8);
    translated.push_str("(?i)");
    for ch in pattern.chars() {
        match ch {
            '*' => translated.push_str(".*"),
            '?' => translated.push('.'),
            c => translated.push_str(&regex::escape(&c.to_string())),
        }
    }
    match Regex::new(&translated) {
        Ok(regex) => Some(regex),
        Err(e) => {
            tracing::warn!("Ignoring unusable exclude pattern '{}': {}", pattern, e);
            None
        }
    }
}

impl PerformanceOptimizer {
    pub fn new(scan: ScanConfig, performance: PerformanceConfig) -> Self {
        let exclusions = scan
            .exclude_patterns
            .iter()
            .filter_map(|p| glob_to_regex(p))
            .collect();
        Self {
            scan,
            performance,
            exclusions,
        }
    }

    fn is_excluded(&self, path: &PathBuf) -> bool {
        let text = path.to_string_lossy();
        self.exclusions.iter().any(|r| r.is_match(&text))
    }

    /// Apply exclusion patterns and size/count caps, preserving input order.
    /// Caps of 0 or below mean unlimited.
    pub fn filter_files(&self, files: &[PathBuf]) -> FileFilterOutcome {
        let max_files = if self.scan.max_files > 0 {
            self.scan.max_files as usize
        } else {
            usize::MAX
        };
        let max_total = if self.scan.max_total_size_bytes > 0 {
            self.scan.max_total_size_bytes as u64
        } else {
            u64::MAX
        };

        let mut kept = Vec::new();
        let mut removed = 0usize;
        let mut cumulative: u64 = 0;
        let mut budget_exhausted = false;
        for path in files {
            // Once either collection cap is hit, everything left is dropped.
            if budget_exhausted || kept.len() >= max_files {
                removed += 1;
                continue;
            }
            if self.is_excluded(path) {
                removed += 1;
                continue;
            }
            let size = match std::fs::metadata(path) {
                Ok(meta) => meta.len(),
                Err(e) => {
                    tracing::debug!("Dropping unreadable file {}: {}", path.display(), e);
                    removed += 1;
                    continue;
                }
            };
            if size > self.scan.max_file_size_bytes {
                tracing::debug!(
                    "Dropping oversized file {} ({} bytes)",
                    path.display(),
                    size
                );
                removed += 1;
                continue;
            }
            if cumulative.saturating_add(size) > max_total {
                budget_exhausted = true;
                removed += 1;
                continue;
            }
            cumulative += size;
            kept.push(path.clone());
        }
        if removed > 0 {
            tracing::info!("File filter removed {} of {} files", removed, files.len());
        }
        FileFilterOutcome {
            files: kept,
            removed,
        }
    }

    /// Deadline for one batch, from that batch's own workload:
    /// `min(base + files*per_file + rules*per_rule, max)`.
    pub fn adaptive_timeout_ms(&self, file_count: usize, rule_count: usize) -> u64 {
        let p = &self.performance;
        let computed = p
            .base_timeout_ms
            .saturating_add(p.per_file_ms.saturating_mul(file_count as u64))
            .saturating_add(p.per_rule_ms.saturating_mul(rule_count as u64));
        computed.min(p.max_timeout_ms)
    }

    /// Rules per batch for a run of this size. Large file sets get smaller
    /// batches to bound per-invocation memory.
    pub fn batch_size_for(&self, file_count: usize) -> usize {
        let size = if file_count > self.performance.large_run_file_threshold {
            self.performance.large_run_batch_size
        } else {
            self.performance.batch_size
        };
        size.max(1)
    }

    /// Split a rule group into contiguous batches. The batches partition the
    /// input exactly: order preserved, nothing dropped or duplicated.
    pub fn batch_rules(&self, rules: &[Rule], file_count: usize) -> Vec<Vec<Rule>> {
        let size = self.batch_size_for(file_count);
        rules.chunks(size).map(|chunk| chunk.to_vec()).collect()
    }
}
