use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Rule category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleCategory {
    /// Code style
    Style,
    /// Security
    Security,
    /// Performance
    Performance,
    /// Code complexity
    Complexity,
    /// Best practices
    BestPractices,
    /// Potential bugs
    Bugs,
}

impl RuleCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleCategory::Style => "style",
            RuleCategory::Security => "security",
            RuleCategory::Performance => "performance",
            RuleCategory::Complexity => "complexity",
            RuleCategory::BestPractices => "best-practices",
            RuleCategory::Bugs => "bugs",
        }
    }
}

/// Severity of a violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Minor improvement suggestions
    Hint,
    /// Areas for improvement
    Info,
    /// Issues that should be fixed
    Warning,
    /// Critical issues that need immediate fixing
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Hint => "hint",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// Analyzer family a rule prefers, when it declares one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyzerFamily {
    /// Regex line matching
    Pattern,
    /// Tree-sitter syntax queries
    Structural,
    /// LLM-backed review
    Ai,
}

/// A single check from the rule catalog. Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub category: RuleCategory,
    pub severity: Severity,
    /// Principle tags ("owasp-a03", "clean-code", ...)
    #[serde(default)]
    pub principles: Vec<String>,
    /// Languages the rule applies to; empty means any.
    #[serde(default)]
    pub languages: Vec<String>,
    /// Declared analyzer-family hint.
    #[serde(default)]
    pub analyzer: Option<AnalyzerFamily>,
    /// Explicit engine override list declared by the rule itself.
    #[serde(default)]
    pub engines: Vec<String>,
    /// Regex for the pattern engine.
    #[serde(default)]
    pub pattern: Option<String>,
    /// Tree-sitter query for the structural engine.
    #[serde(default)]
    pub query: Option<String>,
    /// Reviewer guidance for the AI engine.
    #[serde(default)]
    pub guidance: Option<String>,
    /// Message attached to each violation.
    #[serde(default)]
    pub message: String,
}

impl Rule {
    /// Minimal rule used by tests and programmatic catalogs.
    pub fn basic(id: &str, category: RuleCategory, severity: Severity) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            category,
            severity,
            principles: Vec::new(),
            languages: Vec::new(),
            analyzer: None,
            engines: Vec::new(),
            pattern: None,
            query: None,
            guidance: None,
            message: String::new(),
        }
    }
}

/// One finding reported by an engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub rule_id: String,
    pub rule_name: String,
    pub file_path: String,
    pub line: usize,
    pub column: usize,
    pub severity: Severity,
    pub category: RuleCategory,
    pub message: String,
    pub snippet: Option<String>,
    /// Engine that produced the finding.
    pub engine: String,
}

/// Per-engine statistics in the aggregated result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineStats {
    pub rules_attempted: usize,
    pub violations_found: usize,
    /// Distinct files the engine reported opening, counted once per run.
    pub files_analyzed: usize,
    pub batches_run: usize,
    pub batches_failed: usize,
}

/// Summary counters keyed by severity and category strings.
pub type CountMap = HashMap<String, usize>;
