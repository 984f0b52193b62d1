//! Rule catalog adapter.
//!
//! Loads rule definitions from YAML packs (one rule or a list per file) and
//! resolves rule ids for the router. Rules are immutable after load; the
//! scheduler only ever reads them.

use crate::errors::CatalogError;
use crate::types::Rule;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use walkdir::WalkDir;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RulePack {
    Single(Rule),
    Many(Vec<Rule>),
}

#[derive(Debug, Default)]
pub struct RuleCatalog {
    rules: Vec<Rule>,
    by_id: HashMap<String, usize>,
}

impl RuleCatalog {
    /// Load every `*.yml`/`*.yaml` file under `dir`. A file that fails to
    /// read or parse is skipped with a warning; a duplicate rule id is an
    /// error.
    pub fn load_from_dir(dir: &Path) -> Result<Self, CatalogError> {
        if !dir.is_dir() {
            return Err(CatalogError::MissingRulesDir(dir.to_path_buf()));
        }
        let mut catalog = Self::default();
        let mut skipped = 0usize;
        for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            match path.extension().and_then(|e| e.to_str()) {
                Some("yml") | Some("yaml") => {}
                _ => continue,
            }
            let content = match std::fs::read_to_string(path) {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!("Skipping unreadable rule file {}: {}", path.display(), e);
                    skipped += 1;
                    continue;
                }
            };
            match serde_yaml::from_str::<RulePack>(&content) {
                Ok(RulePack::Single(rule)) => catalog.insert(rule)?,
                Ok(RulePack::Many(rules)) => {
                    for rule in rules {
                        catalog.insert(rule)?;
                    }
                }
                Err(e) => {
                    tracing::warn!("Skipping unparseable rule file {}: {}", path.display(), e);
                    skipped += 1;
                }
            }
        }
        tracing::info!(
            "Loaded {} rules from {} ({} files skipped)",
            catalog.rules.len(),
            dir.display(),
            skipped
        );
        Ok(catalog)
    }

    /// Build a catalog from already-constructed rules. Used by tests and by
    /// callers that assemble rules programmatically.
    pub fn from_rules(rules: Vec<Rule>) -> Result<Self, CatalogError> {
        let mut catalog = Self::default();
        for rule in rules {
            catalog.insert(rule)?;
        }
        Ok(catalog)
    }

    fn insert(&mut self, mut rule: Rule) -> Result<(), CatalogError> {
        if self.by_id.contains_key(&rule.id) {
            return Err(CatalogError::DuplicateRule(rule.id));
        }
        if rule.name.is_empty() {
            rule.name = rule.id.clone();
        }
        self.by_id.insert(rule.id.clone(), self.rules.len());
        self.rules.push(rule);
        Ok(())
    }

    pub fn get_rule(&self, id: &str) -> Option<&Rule> {
        self.by_id.get(id).map(|&i| &self.rules[i])
    }

    pub fn all_rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RuleCategory, Severity};
    use std::fs;

    #[test]
    fn loads_single_and_list_packs() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("single.yml"),
            "id: no-todo\ncategory: style\nseverity: info\npattern: 'TODO'\nmessage: found a TODO\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("pack.yaml"),
            concat!(
                "- id: hardcoded-secret\n",
                "  category: security\n",
                "  severity: error\n",
                "  pattern: '(password|secret)\\s*='\n",
                "  message: possible hardcoded credential\n",
                "- id: unwrap-in-lib\n",
                "  category: best-practices\n",
                "  severity: warning\n",
                "  languages: [rust]\n",
                "  message: avoid unwrap in library code\n",
            ),
        )
        .unwrap();
        let catalog = RuleCatalog::load_from_dir(dir.path()).unwrap();
        assert_eq!(catalog.len(), 3);
        let rule = catalog.get_rule("hardcoded-secret").unwrap();
        assert_eq!(rule.category, RuleCategory::Security);
        assert_eq!(rule.severity, Severity::Error);
    }

    #[test]
    fn bad_file_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.yml"), ":: not yaml ::{{{").unwrap();
        fs::write(
            dir.path().join("ok.yml"),
            "id: r1\ncategory: bugs\nseverity: warning\n",
        )
        .unwrap();
        let catalog = RuleCatalog::load_from_dir(dir.path()).unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.get_rule("r1").is_some());
    }

    #[test]
    fn unreadable_file_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        // Not valid UTF-8, so the read itself fails.
        fs::write(dir.path().join("binary.yml"), [0xFFu8, 0xFE, 0x00, 0x01]).unwrap();
        fs::write(
            dir.path().join("ok.yml"),
            "id: r1\ncategory: bugs\nseverity: warning\n",
        )
        .unwrap();
        let catalog = RuleCatalog::load_from_dir(dir.path()).unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.get_rule("r1").is_some());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let rule = Rule::basic("dup", RuleCategory::Bugs, Severity::Warning);
        let result = RuleCatalog::from_rules(vec![rule.clone(), rule]);
        assert!(matches!(result, Err(CatalogError::DuplicateRule(_))));
    }

    #[test]
    fn missing_dir_is_an_error() {
        let result = RuleCatalog::load_from_dir(Path::new("/no/such/rules"));
        assert!(matches!(result, Err(CatalogError::MissingRulesDir(_))));
    }
}
