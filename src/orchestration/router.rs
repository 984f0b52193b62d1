//! Rule router: decides which engine runs each rule.
//!
//! The candidate list for a rule is built from a strict precedence order
//! (explicit request, rule-declared override, per-rule config, integration
//! flag, analyzer hint, global default) and the first candidate that is both
//! registered and supports the rule wins. A rule is only ever skipped when
//! the caller pinned a single engine that cannot run it; in every other case
//! there is a fallback of last resort.

use crate::config::RoutingConfig;
use crate::engine::EngineRegistry;
use crate::types::{AnalyzerFamily, Rule};
use std::collections::BTreeMap;

/// What the caller asked for on this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineRequest {
    Auto,
    Specific(String),
}

impl EngineRequest {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "" | "auto" => EngineRequest::Auto,
            name => EngineRequest::Specific(name.to_string()),
        }
    }
}

/// One rule mapped to its engine, or explicitly skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingDecision {
    pub rule_id: String,
    /// `None` means skipped: the single requested engine cannot run it.
    pub engine: Option<String>,
}

/// The full routing outcome: rules grouped per engine (deterministic
/// iteration order) plus the skipped rule ids.
#[derive(Debug, Default)]
pub struct RoutingOutcome {
    pub groups: BTreeMap<String, Vec<Rule>>,
    pub skipped: Vec<String>,
    pub decisions: Vec<RoutingDecision>,
}

const DEFAULT_ORDER: [&str; 3] = ["structural", "pattern", "ai"];
const AI_FIRST_ORDER: [&str; 3] = ["ai", "structural", "pattern"];

fn family_order(family: AnalyzerFamily) -> [&'static str; 3] {
    match family {
        AnalyzerFamily::Pattern => ["pattern", "structural", "ai"],
        AnalyzerFamily::Structural => ["structural", "pattern", "ai"],
        AnalyzerFamily::Ai => AI_FIRST_ORDER,
    }
}

pub struct RuleRouter<'a> {
    registry: &'a EngineRegistry,
    config: &'a RoutingConfig,
    request: EngineRequest,
}

impl<'a> RuleRouter<'a> {
    pub fn new(
        registry: &'a EngineRegistry,
        config: &'a RoutingConfig,
        request: EngineRequest,
    ) -> Self {
        Self {
            registry,
            config,
            request,
        }
    }

    /// Candidate engine ids for a rule, in preference order. `single` is true
    /// only for an explicit caller request, which switches off all fallback.
    fn candidates(&self, rule: &Rule) -> (Vec<String>, bool) {
        if let EngineRequest::Specific(engine) = &self.request {
            return (vec![engine.clone()], true);
        }
        if !rule.engines.is_empty() {
            return (rule.engines.clone(), false);
        }
        if let Some(engines) = self.config.rule_engines.get(&rule.id) {
            if !engines.is_empty() {
                return (engines.clone(), false);
            }
        }
        if self.config.ai_first {
            return (AI_FIRST_ORDER.iter().map(|s| s.to_string()).collect(), false);
        }
        if let Some(family) = rule.analyzer {
            return (
                family_order(family).iter().map(|s| s.to_string()).collect(),
                false,
            );
        }
        (DEFAULT_ORDER.iter().map(|s| s.to_string()).collect(), false)
    }

    fn decide(&self, rule: &Rule) -> RoutingDecision {
        let (candidates, single) = self.candidates(rule);
        for engine in &candidates {
            if self.registry.is_rule_supported(engine, &rule.id) {
                return RoutingDecision {
                    rule_id: rule.id.clone(),
                    engine: Some(engine.clone()),
                };
            }
        }
        if single {
            // Pinned engine cannot run the rule: skip, never re-route.
            return RoutingDecision {
                rule_id: rule.id.clone(),
                engine: None,
            };
        }
        // Scan every registered engine in registration order.
        for engine in self.registry.engines() {
            if engine.is_rule_supported(&rule.id) {
                return RoutingDecision {
                    rule_id: rule.id.clone(),
                    engine: Some(engine.id().to_string()),
                };
            }
        }
        // Last resort: the designated most-flexible engine, or failing that
        // the first registered one. Routing never drops a rule on auto.
        let fallback = if self.registry.contains(&self.config.fallback_engine) {
            self.config.fallback_engine.clone()
        } else {
            self.registry
                .list_engines()
                .into_iter()
                .next()
                .unwrap_or_else(|| self.config.fallback_engine.clone())
        };
        tracing::debug!(
            "Rule '{}' has no supporting engine, falling back to '{}'",
            rule.id,
            fallback
        );
        RoutingDecision {
            rule_id: rule.id.clone(),
            engine: Some(fallback),
        }
    }

    /// Route every rule. Skips are collected and reported once, not per rule.
    pub fn route(&self, rules: &[Rule]) -> RoutingOutcome {
        let mut outcome = RoutingOutcome::default();
        for rule in rules {
            let decision = self.decide(rule);
            match &decision.engine {
                Some(engine) => {
                    outcome
                        .groups
                        .entry(engine.clone())
                        .or_default()
                        .push(rule.clone());
                }
                None => outcome.skipped.push(rule.id.clone()),
            }
            outcome.decisions.push(decision);
        }
        if !outcome.skipped.is_empty() {
            tracing::warn!(
                "{} rules skipped (requested engine does not support them): {}",
                outcome.skipped.len(),
                outcome.skipped.join(", ")
            );
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RuleCatalog;
    use crate::config::AppConfig;
    use crate::engine::{AnalysisEngine, AnalyzeOptions, EngineOutput};
    use crate::errors::EngineError;
    use crate::types::{RuleCategory, Severity};
    use async_trait::async_trait;
    use std::path::PathBuf;

    struct StubEngine {
        id: String,
        rules: Vec<String>,
    }

    #[async_trait]
    impl AnalysisEngine for StubEngine {
        fn id(&self) -> &str {
            &self.id
        }

        fn supported_languages(&self) -> Vec<String> {
            vec!["*".to_string()]
        }

        async fn initialize(
            &mut self,
            _config: &AppConfig,
            _catalog: &RuleCatalog,
        ) -> Result<(), EngineError> {
            Ok(())
        }

        async fn analyze(
            &self,
            _files: &[PathBuf],
            _rules: &[Rule],
            _options: &AnalyzeOptions,
        ) -> Result<EngineOutput, EngineError> {
            Ok(EngineOutput::default())
        }

        fn is_rule_supported(&self, rule_id: &str) -> bool {
            self.rules.iter().any(|r| r == rule_id)
        }

        fn supported_rules(&self) -> Vec<String> {
            self.rules.clone()
        }
    }

    async fn registry_with(engines: Vec<(&str, Vec<&str>)>) -> EngineRegistry {
        let mut registry = EngineRegistry::new();
        for (id, rules) in engines {
            registry.register(Box::new(StubEngine {
                id: id.to_string(),
                rules: rules.into_iter().map(|r| r.to_string()).collect(),
            }));
        }
        registry
            .initialize_all(&AppConfig::default(), &RuleCatalog::default())
            .await;
        registry
    }

    fn rule(id: &str) -> Rule {
        Rule::basic(id, RuleCategory::Bugs, Severity::Warning)
    }

    #[tokio::test]
    async fn explicit_engine_skips_unsupported_rules() {
        let registry = registry_with(vec![("x", vec!["a", "c"]), ("y", vec!["b"])]).await;
        let config = RoutingConfig::default();
        let router = RuleRouter::new(
            &registry,
            &config,
            EngineRequest::Specific("x".to_string()),
        );
        let outcome = router.route(&[rule("a"), rule("b"), rule("c")]);
        let group: Vec<String> = outcome.groups["x"].iter().map(|r| r.id.clone()).collect();
        assert_eq!(group, vec!["a", "c"]);
        assert_eq!(outcome.skipped, vec!["b"]);
        // Never rerouted to y, even though y supports b.
        assert!(!outcome.groups.contains_key("y"));
    }

    #[tokio::test]
    async fn auto_routing_assigns_every_rule() {
        let registry =
            registry_with(vec![("structural", vec!["a"]), ("pattern", vec!["b"])]).await;
        let config = RoutingConfig {
            fallback_engine: "pattern".to_string(),
            ..Default::default()
        };
        let router = RuleRouter::new(&registry, &config, EngineRequest::Auto);
        let outcome = router.route(&[rule("a"), rule("b"), rule("unclaimed")]);
        assert!(outcome.skipped.is_empty());
        let assigned: usize = outcome.groups.values().map(|g| g.len()).sum();
        assert_eq!(assigned, 3);
        // The unclaimed rule lands on the designated fallback.
        assert!(outcome.groups["pattern"].iter().any(|r| r.id == "unclaimed"));
    }

    #[tokio::test]
    async fn rule_declared_override_beats_hint_and_default() {
        let registry = registry_with(vec![
            ("structural", vec!["r"]),
            ("pattern", vec!["r"]),
        ])
        .await;
        let config = RoutingConfig::default();
        let router = RuleRouter::new(&registry, &config, EngineRequest::Auto);
        let mut r = rule("r");
        r.analyzer = Some(AnalyzerFamily::Structural);
        r.engines = vec!["pattern".to_string()];
        let outcome = router.route(&[r]);
        assert!(outcome.groups.contains_key("pattern"));
        assert!(!outcome.groups.contains_key("structural"));
    }

    #[tokio::test]
    async fn per_rule_config_beats_integration_flag() {
        let registry = registry_with(vec![("ai", vec!["r"]), ("pattern", vec!["r"])]).await;
        let mut config = RoutingConfig {
            ai_first: true,
            ..Default::default()
        };
        config
            .rule_engines
            .insert("r".to_string(), vec!["pattern".to_string()]);
        let router = RuleRouter::new(&registry, &config, EngineRequest::Auto);
        let outcome = router.route(&[rule("r")]);
        assert!(outcome.groups.contains_key("pattern"));
    }

    #[tokio::test]
    async fn ai_first_flag_prefers_the_ai_family() {
        let registry = registry_with(vec![("pattern", vec!["r"]), ("ai", vec!["r"])]).await;
        let config = RoutingConfig {
            ai_first: true,
            ..Default::default()
        };
        let router = RuleRouter::new(&registry, &config, EngineRequest::Auto);
        let outcome = router.route(&[rule("r")]);
        assert!(outcome.groups.contains_key("ai"));
    }

    #[tokio::test]
    async fn analyzer_hint_orders_candidates() {
        let registry = registry_with(vec![
            ("structural", vec!["r"]),
            ("pattern", vec!["r"]),
        ])
        .await;
        let config = RoutingConfig::default();
        let router = RuleRouter::new(&registry, &config, EngineRequest::Auto);
        let mut r = rule("r");
        r.analyzer = Some(AnalyzerFamily::Pattern);
        let outcome = router.route(&[r]);
        assert!(outcome.groups.contains_key("pattern"));
    }

    #[tokio::test]
    async fn registration_order_scan_precedes_fallback() {
        // Nothing in the preference order supports the rule, but a registered
        // engine outside the order does.
        let registry = registry_with(vec![("custom", vec!["r"]), ("pattern", vec![])]).await;
        let config = RoutingConfig {
            fallback_engine: "pattern".to_string(),
            ..Default::default()
        };
        let router = RuleRouter::new(&registry, &config, EngineRequest::Auto);
        let outcome = router.route(&[rule("r")]);
        assert!(outcome.groups.contains_key("custom"));
    }

    #[tokio::test]
    async fn missing_fallback_uses_first_registered_engine() {
        let registry = registry_with(vec![("pattern", vec![])]).await;
        let config = RoutingConfig {
            fallback_engine: "ai".to_string(),
            ..Default::default()
        };
        let router = RuleRouter::new(&registry, &config, EngineRequest::Auto);
        let outcome = router.route(&[rule("r")]);
        assert!(outcome.groups.contains_key("pattern"));
    }
}
