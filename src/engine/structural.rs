//! Structural engine: tree-sitter syntax queries.
//!
//! Rules that declare a tree-sitter `query` run here. Queries are compiled
//! per (rule, language) at initialization against the grammars this build
//! carries; files whose language has no grammar are skipped. Parse trees are
//! engine-internal state and never leave this module.

use crate::catalog::RuleCatalog;
use crate::config::AppConfig;
use crate::engine::{detect_language, AnalysisEngine, AnalyzeOptions, EngineOutput};
use crate::errors::EngineError;
use crate::types::{Rule, Violation};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tree_sitter::{Language, Parser, Query, QueryCursor};

pub const ENGINE_ID: &str = "structural";

fn grammar_for(language: &str) -> Option<Language> {
    match language {
        #[cfg(feature = "rust")]
        "rust" => Some(tree_sitter_rust::language()),
        #[cfg(feature = "python")]
        "python" => Some(tree_sitter_python::language()),
        #[cfg(feature = "javascript")]
        "javascript" => Some(tree_sitter_javascript::language()),
        _ => None,
    }
}

fn available_languages() -> Vec<&'static str> {
    let mut languages = Vec::new();
    if cfg!(feature = "rust") {
        languages.push("rust");
    }
    if cfg!(feature = "python") {
        languages.push("python");
    }
    if cfg!(feature = "javascript") {
        languages.push("javascript");
    }
    languages
}

#[derive(Default)]
pub struct StructuralEngine {
    /// Compiled queries keyed by (rule id, language).
    queries: HashMap<(String, String), Query>,
    supported: Vec<String>,
}

impl StructuralEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Languages a rule can run under on this build: its declared list, or
    /// every available grammar when it declares none.
    fn rule_languages(rule: &Rule) -> Vec<String> {
        if rule.languages.is_empty() {
            available_languages().iter().map(|s| s.to_string()).collect()
        } else {
            rule.languages
                .iter()
                .filter(|l| grammar_for(l).is_some())
                .cloned()
                .collect()
        }
    }

    fn analyze_file(
        &self,
        path: &Path,
        language: &str,
        source: &str,
        rules: &[Rule],
    ) -> Result<Vec<Violation>, EngineError> {
        let Some(grammar) = grammar_for(language) else {
            return Ok(Vec::new());
        };
        let mut parser = Parser::new();
        parser.set_language(grammar).map_err(|e| {
            EngineError::MalformedResponse(format!("grammar rejected for {}: {}", language, e))
        })?;
        let Some(tree) = parser.parse(source, None) else {
            tracing::debug!("Parse produced no tree for {}", path.display());
            return Ok(Vec::new());
        };

        let mut violations = Vec::new();
        for rule in rules {
            let Some(query) = self.queries.get(&(rule.id.clone(), language.to_string())) else {
                continue;
            };
            let mut cursor = QueryCursor::new();
            for query_match in cursor.matches(query, tree.root_node(), source.as_bytes()) {
                let Some(capture) = query_match.captures.first() else {
                    continue;
                };
                let position = capture.node.start_position();
                let snippet = capture
                    .node
                    .utf8_text(source.as_bytes())
                    .ok()
                    .map(|text| text.lines().next().unwrap_or("").to_string());
                violations.push(Violation {
                    rule_id: rule.id.clone(),
                    rule_name: rule.name.clone(),
                    file_path: path.to_string_lossy().to_string(),
                    line: position.row + 1,
                    column: position.column + 1,
                    severity: rule.severity,
                    category: rule.category,
                    message: rule.message.clone(),
                    snippet,
                    engine: ENGINE_ID.to_string(),
                });
            }
        }
        Ok(violations)
    }
}

#[async_trait]
impl AnalysisEngine for StructuralEngine {
    fn id(&self) -> &str {
        ENGINE_ID
    }

    fn supported_languages(&self) -> Vec<String> {
        available_languages().iter().map(|s| s.to_string()).collect()
    }

    async fn initialize(
        &mut self,
        _config: &AppConfig,
        catalog: &RuleCatalog,
    ) -> Result<(), EngineError> {
        self.queries.clear();
        self.supported.clear();
        for rule in catalog.all_rules() {
            let Some(query_source) = &rule.query else {
                continue;
            };
            let mut compiled_any = false;
            for language in Self::rule_languages(rule) {
                let Some(grammar) = grammar_for(&language) else {
                    continue;
                };
                match Query::new(grammar, query_source) {
                    Ok(query) => {
                        self.queries.insert((rule.id.clone(), language), query);
                        compiled_any = true;
                    }
                    Err(e) => {
                        tracing::warn!(
                            "Rule '{}' query does not compile for {}: {}",
                            rule.id,
                            language,
                            e
                        );
                    }
                }
            }
            if compiled_any {
                self.supported.push(rule.id.clone());
            }
        }
        tracing::debug!(
            "Structural engine compiled queries for {} rules",
            self.supported.len()
        );
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
            let Some(language) = detect_language(path) else {
                continue;
            };
            if grammar_for(language).is_none() {
                continue;
            }
            let source = match std::fs::read_to_string(path) {
                Ok(s) => s,
                Err(e) => {
                    tracing::debug!("Skipping unreadable file {}: {}", path.display(), e);
                    continue;
                }
            };
            output.files_analyzed += 1;
            output
                .violations
                .extend(self.analyze_file(path, language, &source, rules)?);
        }
        Ok(output)
    }

    fn is_rule_supported(&self, rule_id: &str) -> bool {
        self.supported.iter().any(|r| r == rule_id)
    }

    fn supported_rules(&self) -> Vec<String> {
        self.supported.clone()
    }
}

#[cfg(test)]
#[cfg(feature = "rust")]
mod tests {
    use super::*;
    use crate::types::{RuleCategory, Severity};
    use std::fs;

    fn unsafe_block_rule() -> Rule {
        let mut rule = Rule::basic("unsafe-block", RuleCategory::Security, Severity::Warning);
        rule.languages = vec!["rust".to_string()];
        rule.query = Some("(unsafe_block) @block".to_string());
        rule.message = "unsafe block requires justification".to_string();
        rule
    }

    #[tokio::test]
    async fn finds_unsafe_block_in_rust_source() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("lib.rs");
        fs::write(
            &file,
            "pub fn read(ptr: *const u8) -> u8 {\n    unsafe { *ptr }\n}\n",
        )
        .unwrap();

        let catalog = RuleCatalog::from_rules(vec![unsafe_block_rule()]).unwrap();
        let mut engine = StructuralEngine::new();
        engine
            .initialize(&AppConfig::default(), &catalog)
            .await
            .unwrap();
        assert!(engine.is_rule_supported("unsafe-block"));

        let output = engine
            .analyze(&[file], catalog.all_rules(), &AnalyzeOptions::default())
            .await
            .unwrap();
        assert_eq!(output.violations.len(), 1);
        assert_eq!(output.violations[0].line, 2);
        assert_eq!(output.violations[0].engine, "structural");
    }

    #[tokio::test]
    async fn non_grammar_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        fs::write(&file, "unsafe { }").unwrap();

        let catalog = RuleCatalog::from_rules(vec![unsafe_block_rule()]).unwrap();
        let mut engine = StructuralEngine::new();
        engine
            .initialize(&AppConfig::default(), &catalog)
            .await
            .unwrap();
        let output = engine
            .analyze(&[file], catalog.all_rules(), &AnalyzeOptions::default())
            .await
            .unwrap();
        assert_eq!(output.files_analyzed, 0);
        assert!(output.violations.is_empty());
    }

    #[tokio::test]
    async fn bad_query_leaves_rule_unsupported() {
        let mut rule = Rule::basic("broken", RuleCategory::Bugs, Severity::Info);
        rule.languages = vec!["rust".to_string()];
        rule.query = Some("(((".to_string());
        let catalog = RuleCatalog::from_rules(vec![rule]).unwrap();
        let mut engine = StructuralEngine::new();
        engine
            .initialize(&AppConfig::default(), &catalog)
            .await
            .unwrap();
        assert!(!engine.is_rule_supported("broken"));
    }
}
