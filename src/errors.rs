use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Rule catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("I/O error while {0}: {1}")]
    IO(String, #[source] std::io::Error),
    #[error("Application error: {0}")]
    Generic(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{0}': {1}")]
    FileRead(PathBuf, #[source] std::io::Error),
    #[error("Failed to parse TOML from '{0}': {1}")]
    TomlParse(PathBuf, #[source] toml::de::Error),
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Rules directory '{0}' does not exist")]
    MissingRulesDir(PathBuf),
    #[error("Duplicate rule id '{0}'")]
    DuplicateRule(String),
}

/// Errors produced by analysis engines and by the batch scheduler around them.
///
/// `BatchTimeout` and `BatchExecution` carry the full execution context so a
/// failed batch can be logged and classified without re-deriving anything.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Engine '{engine}' failed to initialize: {reason}")]
    Initialization { engine: String, reason: String },

    #[error("I/O error while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Request to AI backend failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed engine response: {0}")]
    MalformedResponse(String),

    #[error("Engine exhausted its resource budget: {0}")]
    ResourceExhausted(String),

    #[error("Batch {batch_number} on engine '{engine}' timed out after {timeout_ms} ms ({file_count} files, {rule_count} rules)")]
    BatchTimeout {
        engine: String,
        batch_number: usize,
        timeout_ms: u64,
        file_count: usize,
        rule_count: usize,
    },

    #[error("Batch {batch_number} on engine '{engine}' failed ({file_count} files, {rule_count} rules, timeout {timeout_ms} ms): {source}")]
    BatchExecution {
        engine: String,
        batch_number: usize,
        file_count: usize,
        rule_count: usize,
        timeout_ms: u64,
        #[source]
        source: Box<EngineError>,
    },

    #[error("No analysis engines available: every configured engine failed to initialize or none are enabled")]
    NoEnginesAvailable,
}

/// Typed classification of a batch failure. Replaces matching on error
/// message text: the variant of the underlying [`EngineError`] decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FailureKind {
    /// Worth retrying with a smaller batch. The hint is the batch size the
    /// scheduler would use on a retry (half the failing batch, at least 1).
    Retryable { suggested_batch_size: usize },
    /// Not expected to succeed on retry. Fatal to the batch, never to the run.
    Fatal,
}

impl EngineError {
    /// Classify a batch-level failure. Timeouts and resource exhaustion are
    /// retryable with a reduced batch; everything else is fatal to the batch.
    pub fn classify(&self, batch_rule_count: usize) -> FailureKind {
        let suggested = (batch_rule_count / 2).max(1);
        match self {
            EngineError::BatchTimeout { .. } | EngineError::ResourceExhausted(_) => {
                FailureKind::Retryable {
                    suggested_batch_size: suggested,
                }
            }
            EngineError::BatchExecution { source, .. } => source.classify(batch_rule_count),
            _ => FailureKind::Fatal,
        }
    }
}
