pub mod args;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod errors;
pub mod orchestration;
pub mod report;
pub mod types;

pub use catalog::RuleCatalog;
pub use config::AppConfig;
pub use errors::{AppError, EngineError, FailureKind};
pub use orchestration::{AggregatedResult, EngineRequest, Orchestrator};
pub use types::{Rule, Severity, Violation};
