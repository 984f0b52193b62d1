//! Analysis orchestration: the top-level driver for a run.
//!
//! The orchestrator owns the engine registry, filters the file set once,
//! routes rules to engines, batches each group, and executes every batch
//! under its own adaptive deadline. A batch failure, timeout included, is
//! classified and recorded, never propagated: the only fatal condition is
//! an empty registry, which is detected before any filtering or routing.

pub mod merger;
pub mod optimizer;
pub mod router;

use crate::catalog::RuleCatalog;
use crate::config::AppConfig;
use crate::engine::{builtin_engines, AnalysisEngine, AnalyzeOptions, EngineRegistry};
use crate::errors::{AppError, EngineError};
use crate::types::Rule;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub use merger::{AggregatedResult, BatchFailure, ExecutionOutcome, ResultMerger};
pub use optimizer::{PerformanceMetrics, PerformanceOptimizer};
pub use router::{EngineRequest, RoutingDecision, RuleRouter};

/// Lifecycle of an orchestrator. `Running` covers every (engine, batch)
/// pair of the current run; `Done` still counts as initialized so the
/// orchestrator can be reused for further runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Uninitialized,
    Initializing,
    Ready,
    Running,
    Done,
}

pub struct Orchestrator {
    config: AppConfig,
    catalog: RuleCatalog,
    registry: EngineRegistry,
    optimizer: PerformanceOptimizer,
    state: RunState,
}

impl Orchestrator {
    pub fn new(config: AppConfig, catalog: RuleCatalog) -> Self {
        let optimizer =
            PerformanceOptimizer::new(config.scan.clone(), config.performance.clone());
        Self {
            config,
            catalog,
            registry: EngineRegistry::new(),
            optimizer,
            state: RunState::Uninitialized,
        }
    }

    /// Stage an engine explicitly. When none are staged before the first run,
    /// the configured built-in engines are loaded instead.
    pub fn register_engine(&mut self, engine: Box<dyn AnalysisEngine>) {
        self.registry.register(engine);
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn registry(&self) -> &EngineRegistry {
        &self.registry
    }

    /// One-time initialization, guarded: populate the registry (auto-loading
    /// the configured engines if none were registered), initialize every
    /// engine, and drop the ones that fail. Fatal if nothing survives.
    pub async fn ensure_initialized(&mut self) -> Result<(), AppError> {
        match self.state {
            RunState::Ready | RunState::Running | RunState::Done => return Ok(()),
            RunState::Uninitialized | RunState::Initializing => {}
        }
        self.state = RunState::Initializing;

        if self.registry.is_empty() && !self.registry.has_staged() {
            for engine in builtin_engines(&self.config.scan.enabled_engines, &self.config) {
                self.registry.register(engine);
            }
        }
        self.registry
            .initialize_all(&self.config, &self.catalog)
            .await;

        if self.registry.is_empty() {
            self.state = RunState::Uninitialized;
            return Err(EngineError::NoEnginesAvailable.into());
        }
        tracing::info!(
            "Orchestrator ready with engines: {}",
            self.registry.list_engines().join(", ")
        );
        self.state = RunState::Ready;
        Ok(())
    }

    /// Run the full pipeline over `files` and `rules`. Always returns an
    /// aggregated result, possibly with skipped rules and recorded batch
    /// failures, except when no engine is available at all.
    pub async fn run(
        &mut self,
        files: Vec<PathBuf>,
        rules: Vec<Rule>,
        request: EngineRequest,
    ) -> Result<AggregatedResult, AppError> {
        // The no-engines check happens before any filtering or routing.
        self.ensure_initialized().await?;
        self.state = RunState::Running;
        let optimization_start = Instant::now();

        let filter = self.optimizer.filter_files(&files);
        let shared_files = Arc::new(filter.files);
        tracing::info!(
            "Analyzing {} files ({} filtered out) against {} rules",
            shared_files.len(),
            filter.removed,
            rules.len()
        );

        let router = RuleRouter::new(&self.registry, &self.config.routing, request);
        let routing = router.route(&rules);

        let mut metrics = PerformanceMetrics {
            original_file_count: files.len(),
            filtered_file_count: shared_files.len(),
            original_rule_count: rules.len(),
            routed_rule_count: routing.groups.values().map(|g| g.len()).sum(),
            batch_count: 0,
            optimization_ms: 0,
        };

        let mut plan: Vec<(Arc<dyn AnalysisEngine>, Vec<Vec<Rule>>)> = Vec::new();
        for (engine_id, group) in &routing.groups {
            let Some(engine) = self.registry.get(engine_id) else {
                // Routing only emits registered engines; stale ids would mean
                // the registry changed mid-run.
                tracing::warn!("Engine '{}' vanished before execution", engine_id);
                continue;
            };
            let batches = self.optimizer.batch_rules(group, shared_files.len());
            metrics.batch_count += batches.len();
            plan.push((engine, batches));
        }
        metrics.optimization_ms = optimization_start.elapsed().as_millis() as u64;

        let mut outcomes = Vec::new();
        for (engine, batches) in plan {
            for (index, batch) in batches.into_iter().enumerate() {
                let batch_number = index + 1;
                let outcome = self
                    .execute_batch(engine.clone(), shared_files.clone(), batch, batch_number)
                    .await;
                outcomes.push(outcome);
            }
        }

        let result = ResultMerger::merge(
            outcomes,
            shared_files.len(),
            routing.skipped,
            metrics,
        );
        self.state = RunState::Done;
        Ok(result)
    }

    /// Execute one batch against one engine, racing its adaptive deadline.
    /// The timeout is computed from this batch's own workload, not the run's.
    /// When the deadline wins, the engine future is dropped and any late
    /// result is discarded with it.
    async fn execute_batch(
        &self,
        engine: Arc<dyn AnalysisEngine>,
        files: Arc<Vec<PathBuf>>,
        batch: Vec<Rule>,
        batch_number: usize,
    ) -> ExecutionOutcome {
        let timeout_ms = self
            .optimizer
            .adaptive_timeout_ms(files.len(), batch.len());
        let options = AnalyzeOptions {
            timeout_ms,
            batch_number,
        };
        tracing::debug!(
            "Running batch {} on '{}': {} rules, {} files, {} ms",
            batch_number,
            engine.id(),
            batch.len(),
            files.len(),
            timeout_ms
        );

        let analysis = engine.analyze(&files, &batch, &options);
        match tokio::time::timeout(Duration::from_millis(timeout_ms), analysis).await {
            Ok(Ok(output)) => ExecutionOutcome {
                engine_id: engine.id().to_string(),
                batch_number,
                rules_in_batch: batch.len(),
                files_analyzed: output.files_analyzed,
                violations: output.violations,
                success: true,
                failure: None,
            },
            Ok(Err(source)) => {
                let wrapped = EngineError::BatchExecution {
                    engine: engine.id().to_string(),
                    batch_number,
                    file_count: files.len(),
                    rule_count: batch.len(),
                    timeout_ms,
                    source: Box::new(source),
                };
                self.record_failure(wrapped, engine.id(), batch_number, batch.len())
            }
            Err(_elapsed) => {
                let timed_out = EngineError::BatchTimeout {
                    engine: engine.id().to_string(),
                    batch_number,
                    timeout_ms,
                    file_count: files.len(),
                    rule_count: batch.len(),
                };
                self.record_failure(timed_out, engine.id(), batch_number, batch.len())
            }
        }
    }

    /// Classify and log a batch failure, then convert it into a
    /// zero-violation outcome so merging proceeds uniformly. A retryable
    /// classification is a recommendation only; the run moves on to the next
    /// batch either way.
    fn record_failure(
        &self,
        error: EngineError,
        engine_id: &str,
        batch_number: usize,
        batch_rule_count: usize,
    ) -> ExecutionOutcome {
        let kind = error.classify(batch_rule_count);
        match kind {
            crate::errors::FailureKind::Retryable {
                suggested_batch_size,
            } => {
                tracing::warn!(
                    "{}; retry with batch size {} may succeed",
                    error,
                    suggested_batch_size
                );
            }
            crate::errors::FailureKind::Fatal => {
                tracing::warn!("{}; not retryable, continuing with next batch", error);
            }
        }
        ExecutionOutcome {
            engine_id: engine_id.to_string(),
            batch_number,
            rules_in_batch: batch_rule_count,
            files_analyzed: 0,
            violations: Vec::new(),
            success: false,
            failure: Some(BatchFailure {
                engine_id: engine_id.to_string(),
                batch_number,
                kind,
                message: error.to_string(),
            }),
        }
    }

    /// Best-effort engine teardown; failures are logged, never raised.
    pub async fn shutdown(&self) {
        self.registry.cleanup_all().await;
    }
}
