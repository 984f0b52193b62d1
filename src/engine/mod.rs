//! Analysis engine contract and the built-in engine families.
//!
//! Engines are pluggable analyzers. The orchestrator owns them through the
//! registry, initializes each once per run, and invokes `analyze` per batch
//! under a deadline. An engine's internal parse caches are its own business;
//! the scheduler never touches them.

pub mod ai;
pub mod pattern;
pub mod registry;
pub mod structural;

use crate::catalog::RuleCatalog;
use crate::config::AppConfig;
use crate::errors::EngineError;
use crate::types::{Rule, Violation};
use async_trait::async_trait;
use std::path::PathBuf;

pub use registry::EngineRegistry;

/// Per-invocation options handed to `analyze`.
#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    /// Deadline the scheduler enforces for this batch. Informational to the
    /// engine; the scheduler cancels regardless.
    pub timeout_ms: u64,
    /// 1-based batch number within the engine's group.
    pub batch_number: usize,
}

/// What one batch invocation produced.
#[derive(Debug, Clone, Default)]
pub struct EngineOutput {
    pub violations: Vec<Violation>,
    /// Files the engine actually opened (after its own language filtering).
    /// Folded into the per-engine stats by the merger.
    pub files_analyzed: usize,
}

/// Contract every analysis engine implements.
///
/// `initialize` must be called before `analyze`; a failed initialization
/// removes the engine from the registry. `analyze` may be cancelled by the
/// scheduler at any await point; a result that arrives after the deadline is
/// discarded, so engines must not rely on their output being observed.
#[async_trait]
pub trait AnalysisEngine: Send + Sync {
    fn id(&self) -> &str;

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn supported_languages(&self) -> Vec<String>;

    async fn initialize(
        &mut self,
        config: &AppConfig,
        catalog: &RuleCatalog,
    ) -> Result<(), EngineError>;

    async fn analyze(
        &self,
        files: &[PathBuf],
        rules: &[Rule],
        options: &AnalyzeOptions,
    ) -> Result<EngineOutput, EngineError>;

    fn is_rule_supported(&self, rule_id: &str) -> bool;

    fn supported_rules(&self) -> Vec<String>;

    /// Best-effort teardown. Failures are logged by the caller, never
    /// propagated.
    async fn cleanup(&self) -> Result<(), EngineError> {
        Ok(())
    }
}

/// Static id → factory table for the compiled-in engines. Replaces any
/// dynamic lookup-by-name loading: an unknown id is a warning, not a crash.
pub fn builtin_engines(enabled: &[String], config: &AppConfig) -> Vec<Box<dyn AnalysisEngine>> {
    let mut engines: Vec<Box<dyn AnalysisEngine>> = Vec::new();
    for id in enabled {
        match id.as_str() {
            "pattern" => engines.push(Box::new(pattern::PatternEngine::new())),
            "structural" => engines.push(Box::new(structural::StructuralEngine::new())),
            "ai" => engines.push(Box::new(ai::AiEngine::new(config.ai.clone()))),
            other => {
                tracing::warn!("Unknown engine id '{}' in enabled_engines, ignoring", other);
            }
        }
    }
    engines
}

/// Map a file extension to the language name used in rule metadata.
pub(crate) fn detect_language(path: &std::path::Path) -> Option<&'static str> {
    match path.extension().and_then(|e| e.to_str())?.to_lowercase().as_str() {
        "rs" => Some("rust"),
        "py" => Some("python"),
        "js" | "jsx" | "mjs" => Some("javascript"),
        "ts" | "tsx" => Some("typescript"),
        "java" => Some("java"),
        "go" => Some("go"),
        "c" | "h" => Some("c"),
        "cpp" | "cc" | "cxx" | "hpp" => Some("cpp"),
        "rb" => Some("ruby"),
        "php" => Some("php"),
        _ => None,
    }
}
