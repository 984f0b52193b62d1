use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// File discovery and filtering limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Directory holding YAML rule packs.
    pub rules_dir: PathBuf,
    /// Engines the orchestrator auto-loads when none are registered
    /// explicitly.
    pub enabled_engines: Vec<String>,
    /// Glob-style path exclusions, matched case-insensitively anywhere in the
    /// path.
    pub exclude_patterns: Vec<String>,
    /// Per-file size cap in bytes.
    pub max_file_size_bytes: u64,
    /// Cumulative size cap in bytes; 0 or negative means unlimited.
    pub max_total_size_bytes: i64,
    /// File count cap; 0 or negative means unlimited.
    pub max_files: i64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            rules_dir: PathBuf::from("rules"),
            enabled_engines: vec![
                "pattern".to_string(),
                "structural".to_string(),
                "ai".to_string(),
            ],
            exclude_patterns: vec![
                "*/node_modules/*".to_string(),
                "*/target/*".to_string(),
                "*/.git/*".to_string(),
                "*/vendor/*".to_string(),
                "*/__pycache__/*".to_string(),
            ],
            max_file_size_bytes: 1_048_576,
            max_total_size_bytes: 0,
            max_files: 0,
        }
    }
}

/// Engine selection policy knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Prefer the AI engine family before the default order.
    pub ai_first: bool,
    /// Engine of last resort when nothing in the candidate list supports a
    /// rule. The AI engine can attempt any rule, so it is the default.
    pub fallback_engine: String,
    /// Per-rule explicit engine lists, keyed by rule id.
    pub rule_engines: HashMap<String, Vec<String>>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            ai_first: false,
            fallback_engine: "ai".to_string(),
            rule_engines: HashMap::new(),
        }
    }
}

/// Adaptive timeout and batching parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    pub base_timeout_ms: u64,
    pub per_file_ms: u64,
    pub per_rule_ms: u64,
    pub max_timeout_ms: u64,
    /// Rules per batch.
    pub batch_size: usize,
    /// Rules per batch once the filtered file count crosses
    /// `large_run_file_threshold`.
    pub large_run_batch_size: usize,
    pub large_run_file_threshold: usize,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            base_timeout_ms: 30_000,
            per_file_ms: 100,
            per_rule_ms: 1_000,
            max_timeout_ms: 120_000,
            batch_size: 20,
            large_run_batch_size: 10,
            large_run_file_threshold: 100,
        }
    }
}

/// AI backend settings (OpenAI-compatible chat endpoint).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub api_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    /// Per-file excerpt cap in bytes when building the prompt.
    pub max_excerpt_bytes: usize,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            model: String::new(),
            api_key: None,
            temperature: 0.1,
            max_excerpt_bytes: 8_192,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub scan: ScanConfig,
    pub routing: RoutingConfig,
    pub performance: PerformanceConfig,
    pub ai: AiConfig,
}

impl AppConfig {
    /// Load configuration from `polylint.toml` in the working directory.
    /// A missing file yields the defaults; a malformed file is an error.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new("polylint.toml"))
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        tracing::info!("Loading configuration from {:?}", path);
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_path_buf(), e))?;
        let config: AppConfig =
            toml::from_str(&content).map_err(|e| ConfigError::TomlParse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.performance.max_timeout_ms < self.performance.base_timeout_ms {
            return Err(ConfigError::InvalidValue {
                field: "performance.max_timeout_ms".to_string(),
                reason: "must be at least base_timeout_ms".to_string(),
            });
        }
        if self.performance.batch_size == 0 || self.performance.large_run_batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "performance.batch_size".to_string(),
                reason: "batch sizes must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
