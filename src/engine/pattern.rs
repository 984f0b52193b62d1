//! Pattern engine: regex line matching.
//!
//! The most flexible of the local engines: any rule that declares a regex
//! `pattern` is supported, regardless of language. Patterns are compiled once
//! at initialization; a pattern that fails to compile drops only that rule.

use crate::catalog::RuleCatalog;
use crate::config::AppConfig;
use crate::engine::{detect_language, AnalysisEngine, AnalyzeOptions, EngineOutput};
use crate::errors::EngineError;
use crate::types::{Rule, Violation};
use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;
use std::path::PathBuf;

pub const ENGINE_ID: &str = "pattern";

#[derive(Default)]
pub struct PatternEngine {
    compiled: HashMap<String, Regex>,
}

impl PatternEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn scan_content(&self, content: &str, path: &PathBuf, rules: &[Rule]) -> Vec<Violation> {
        let language = detect_language(path);
        let mut violations = Vec::new();
        for rule in rules {
            let regex = match self.compiled.get(&rule.id) {
                Some(r) => r,
                None => continue,
            };
            if !rule.languages.is_empty() {
                match language {
                    Some(lang) if rule.languages.iter().any(|l| l == lang) => {}
                    _ => continue,
                }
            }
            for (line_idx, line) in content.lines().enumerate() {
                if let Some(m) = regex.find(line) {
                    violations.push(Violation {
                        rule_id: rule.id.clone(),
                        rule_name: rule.name.clone(),
                        file_path: path.to_string_lossy().to_string(),
                        line: line_idx + 1,
                        column: m.start() + 1,
                        severity: rule.severity,
                        category: rule.category,
                        message: rule.message.clone(),
                        snippet: Some(line.trim_end().to_string()),
                        engine: ENGINE_ID.to_string(),
                    });
                }
            }
        }
        violations
    }
}

#[async_trait]
impl AnalysisEngine for PatternEngine {
    fn id(&self) -> &str {
        ENGINE_ID
    }

    fn supported_languages(&self) -> Vec<String> {
        // Plain text matching applies to any language.
        vec!["*".to_string()]
    }

    async fn initialize(
        &mut self,
        _config: &AppConfig,
        catalog: &RuleCatalog,
    ) -> Result<(), EngineError> {
        self.compiled.clear();
        for rule in catalog.all_rules() {
            let Some(pattern) = &rule.pattern else {
                continue;
            };
            match Regex::new(pattern) {
                Ok(regex) => {
                    self.compiled.insert(rule.id.clone(), regex);
                }
                Err(e) => {
                    tracing::warn!("Rule '{}' has an invalid pattern, skipping: {}", rule.id, e);
                }
            }
        }
        tracing::debug!("Pattern engine compiled {} rules", self.compiled.len());
        Ok(())
    }

    async fn analyze(
        &self,
        files: &[PathBuf],
        rules: &[Rule],
        _options: &AnalyzeOptions,
    ) -> Result<EngineOutput, EngineError> {
        let mut output = EngineOutput::default();
        for path in files {
            let content = match std::fs::read_to_string(path) {
                Ok(c) => c,
                Err(e) => {
                    // Binary or unreadable file; not this batch's problem.
                    tracing::debug!("Skipping unreadable file {}: {}", path.display(), e);
                    continue;
                }
            };
            output.files_analyzed += 1;
            output.violations.extend(self.scan_content(&content, path, rules));
        }
        Ok(output)
    }

    fn is_rule_supported(&self, rule_id: &str) -> bool {
        self.compiled.contains_key(rule_id)
    }

    fn supported_rules(&self) -> Vec<String> {
        self.compiled.keys().cloned().collect()
    }
}
