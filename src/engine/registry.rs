//! Engine registry.
//!
//! Engines are registered in a staging area, initialized in one pass, and
//! promoted into the active set only when initialization succeeds. After that
//! pass the registry contains exactly the engines that are usable; an empty
//! registry is the caller's signal to fail the run.

use crate::catalog::RuleCatalog;
use crate::config::AppConfig;
use crate::engine::AnalysisEngine;
use std::sync::Arc;

#[derive(Default)]
pub struct EngineRegistry {
    staged: Vec<Box<dyn AnalysisEngine>>,
    /// Registration order is preserved; the router's last-resort scan relies
    /// on it.
    active: Vec<Arc<dyn AnalysisEngine>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage an engine for initialization. Re-registering an id replaces the
    /// prior engine with a warning.
    pub fn register(&mut self, engine: Box<dyn AnalysisEngine>) {
        let id = engine.id().to_string();
        if let Some(pos) = self.staged.iter().position(|e| e.id() == id) {
            tracing::warn!("Engine '{}' already staged, replacing it", id);
            self.staged.remove(pos);
        }
        if let Some(pos) = self.active.iter().position(|e| e.id() == id) {
            tracing::warn!("Engine '{}' already active, replacing it", id);
            self.active.remove(pos);
        }
        self.staged.push(engine);
    }

    /// Initialize every staged engine. Engines that fail are dropped so that
    /// later routing cannot select them; the failure is logged with its
    /// reason. Never fails itself: emptiness is checked by the caller.
    pub async fn initialize_all(&mut self, config: &AppConfig, catalog: &RuleCatalog) {
        for mut engine in std::mem::take(&mut self.staged) {
            let id = engine.id().to_string();
            match engine.initialize(config, catalog).await {
                Ok(()) => {
                    tracing::debug!("Engine '{}' initialized", id);
                    self.active.push(Arc::from(engine));
                }
                Err(e) => {
                    tracing::warn!("Engine '{}' failed to initialize, deregistering: {}", id, e);
                }
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn AnalysisEngine>> {
        self.active.iter().find(|e| e.id() == id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.active.iter().any(|e| e.id() == id)
    }

    /// Active engine ids in registration order.
    pub fn list_engines(&self) -> Vec<String> {
        self.active.iter().map(|e| e.id().to_string()).collect()
    }

    /// Active engines in registration order.
    pub fn engines(&self) -> &[Arc<dyn AnalysisEngine>] {
        &self.active
    }

    pub fn is_rule_supported(&self, engine_id: &str, rule_id: &str) -> bool {
        self.get(engine_id)
            .map(|e| e.is_rule_supported(rule_id))
            .unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Best-effort cleanup of every active engine; failures are logged only.
    pub async fn cleanup_all(&self) {
        for engine in &self.active {
            if let Err(e) = engine.cleanup().await {
                tracing::warn!("Cleanup of engine '{}' failed: {}", engine.id(), e);
            }
        }
    }

    /// True while at least one engine awaits initialization.
    pub fn has_staged(&self) -> bool {
        !self.staged.is_empty()
    }
}
