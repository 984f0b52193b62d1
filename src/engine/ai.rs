//! AI engine: LLM-backed review over an OpenAI-compatible chat endpoint.
//!
//! Any catalog rule is supported; the model is asked to apply each rule's
//! guidance to batched file excerpts and reply with a JSON findings array.
//! This is the designated engine of last resort for routing, so it must not
//! pretend to be available when unconfigured: initialization fails without an
//! API URL and model, which deregisters it cleanly.

use crate::catalog::RuleCatalog;
use crate::config::{AiConfig, AppConfig};
use crate::engine::{AnalysisEngine, AnalyzeOptions, EngineOutput};
use crate::errors::EngineError;
use crate::types::{Rule, Violation};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const ENGINE_ID: &str = "ai";

#[derive(Serialize)]
struct AiRequest {
    model: String,
    messages: Vec<AiMessage>,
    temperature: f32,
}

#[derive(Serialize, Deserialize)]
struct AiMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct AiResponse {
    choices: Vec<AiChoice>,
}

#[derive(Deserialize)]
struct AiChoice {
    message: AiMessage,
}

/// One finding as the model reports it.
#[derive(Deserialize)]
struct AiFinding {
    rule_id: String,
    file: String,
    #[serde(default)]
    line: usize,
    #[serde(default)]
    message: String,
    #[serde(default)]
    snippet: Option<String>,
}

pub struct AiEngine {
    config: AiConfig,
    client: reqwest::Client,
    rule_ids: Vec<String>,
}

impl AiEngine {
    pub fn new(config: AiConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            rule_ids: Vec::new(),
        }
    }

    fn build_prompt(&self, files: &[PathBuf], rules: &[Rule]) -> String {
        let mut prompt = String::from(
            "Apply the following review rules to the code below. Reply with a JSON \
             array only, one object per finding: \
             {\"rule_id\", \"file\", \"line\", \"message\", \"snippet\"}. \
             Reply with [] when nothing matches.\n\nRules:\n",
        );
        for rule in rules {
            prompt.push_str(&format!(
                "- {} [{} / {}]: {}\n",
                rule.id,
                rule.category.as_str(),
                rule.severity.as_str(),
                rule.guidance.as_deref().unwrap_or(&rule.message),
            ));
        }
        prompt.push_str("\nFiles:\n");
        for path in files {
            let Ok(content) = std::fs::read_to_string(path) else {
                continue;
            };
            let mut end = self.config.max_excerpt_bytes.min(content.len());
            while end > 0 && !content.is_char_boundary(end) {
                end -= 1;
            }
            let excerpt = &content[..end];
            prompt.push_str(&format!("--- {}\n{}\n", path.display(), excerpt));
        }
        prompt
    }

    fn parse_findings(&self, content: &str, rules: &[Rule]) -> Result<Vec<Violation>, EngineError> {
        // Models occasionally wrap the array in a code fence.
        let trimmed = content
            .trim()
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim();
        let findings: Vec<AiFinding> = serde_json::from_str(trimmed)
            .map_err(|e| EngineError::MalformedResponse(format!("findings are not JSON: {}", e)))?;
        let mut violations = Vec::new();
        for finding in findings {
            // Findings for rules outside this batch are hallucinations.
            let Some(rule) = rules.iter().find(|r| r.id == finding.rule_id) else {
                tracing::debug!("Dropping finding for unknown rule '{}'", finding.rule_id);
                continue;
            };
            violations.push(Violation {
                rule_id: rule.id.clone(),
                rule_name: rule.name.clone(),
                file_path: finding.file,
                line: finding.line.max(1),
                column: 1,
                severity: rule.severity,
                category: rule.category,
                message: if finding.message.is_empty() {
                    rule.message.clone()
                } else {
                    finding.message
                },
                snippet: finding.snippet,
                engine: ENGINE_ID.to_string(),
            });
        }
        Ok(violations)
    }
}

#[async_trait]
impl AnalysisEngine for AiEngine {
    fn id(&self) -> &str {
        ENGINE_ID
    }

    fn supported_languages(&self) -> Vec<String> {
        vec!["*".to_string()]
    }

    async fn initialize(
        &mut self,
        _config: &AppConfig,
        catalog: &RuleCatalog,
    ) -> Result<(), EngineError> {
        if self.config.api_url.is_empty() || self.config.model.is_empty() {
            return Err(EngineError::Initialization {
                engine: ENGINE_ID.to_string(),
                reason: "ai.api_url and ai.model must be configured".to_string(),
            });
        }
        self.rule_ids = catalog.all_rules().iter().map(|r| r.id.clone()).collect();
        Ok(())
    }

    async fn analyze(
        &self,
        files: &[PathBuf],
        rules: &[Rule],
        options: &AnalyzeOptions,
    ) -> Result<EngineOutput, EngineError> {
        let request = AiRequest {
            model: self.config.model.clone(),
            messages: vec![
                AiMessage {
                    role: "system".to_string(),
                    content: "You are a precise static-analysis assistant.".to_string(),
                },
                AiMessage {
                    role: "user".to_string(),
                    content: self.build_prompt(files, rules),
                },
            ],
            temperature: self.config.temperature,
        };

        tracing::debug!(
            "AI batch {}: {} files, {} rules, {} ms budget",
            options.batch_number,
            files.len(),
            rules.len(),
            options.timeout_ms
        );

        let mut builder = self.client.post(&self.config.api_url).json(&request);
        if let Some(key) = &self.config.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }
        let response: AiResponse = builder.send().await?.error_for_status()?.json().await?;
        let content = response
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| EngineError::MalformedResponse("no choices in reply".to_string()))?;

        let violations = self.parse_findings(&content, rules)?;
        Ok(EngineOutput {
            files_analyzed: files.len(),
            violations,
        })
    }

    /// Every catalog rule can at least be attempted by the model.
    fn is_rule_supported(&self, rule_id: &str) -> bool {
        self.rule_ids.iter().any(|r| r == rule_id)
    }

    fn supported_rules(&self) -> Vec<String> {
        self.rule_ids.clone()
    }
}
