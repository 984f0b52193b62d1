use clap::Parser;
use polylint::args::{Args, Command};
use polylint::catalog::RuleCatalog;
use polylint::config::AppConfig;
use polylint::errors::AppError;
use polylint::orchestration::{EngineRequest, Orchestrator};
use polylint::report;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };

    match args.command {
        Command::Scan {
            paths,
            engine,
            rules,
            format,
            output,
        } => {
            let rules_dir = rules.unwrap_or_else(|| config.scan.rules_dir.clone());
            let catalog = RuleCatalog::load_from_dir(&rules_dir)?;
            if catalog.is_empty() {
                return Err(AppError::Generic(format!(
                    "no rules loaded from {}",
                    rules_dir.display()
                )));
            }

            let scan_paths = if paths.is_empty() {
                vec![PathBuf::from(".")]
            } else {
                paths
            };
            let files = discover_files(&scan_paths);
            let rule_list = catalog.all_rules().to_vec();

            let mut orchestrator = Orchestrator::new(config, catalog);
            let result = orchestrator
                .run(files, rule_list, EngineRequest::parse(&engine))
                .await?;
            orchestrator.shutdown().await;

            let rendered = match format.as_str() {
                "json" => report::render_json(&result)
                    .map_err(|e| AppError::Generic(format!("report serialization failed: {}", e)))?,
                _ => report::render_text(&result),
            };
            match output {
                Some(path) => std::fs::write(&path, rendered)
                    .map_err(|e| AppError::IO(format!("writing report to {}", path.display()), e))?,
                None => print!("{}", rendered),
            }
        }
        Command::Rules { rules } => {
            let rules_dir = rules.unwrap_or_else(|| config.scan.rules_dir.clone());
            let catalog = RuleCatalog::load_from_dir(&rules_dir)?;
            for rule in catalog.all_rules() {
                println!(
                    "{:<30} {:<14} {:<8} {}",
                    rule.id,
                    rule.category.as_str(),
                    rule.severity.as_str(),
                    rule.message
                );
            }
        }
    }
    Ok(())
}

/// Collect regular files under the given paths. Filtering (excludes, size
/// caps) is the optimizer's job; discovery only walks.
fn discover_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for root in paths {
        if root.is_file() {
            files.push(root.clone());
            continue;
        }
        for entry in WalkDir::new(root)
            .into_iter()
            .filter_entry(|e| !is_hidden(e.path()))
            .filter_map(|e| e.ok())
        {
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
    }
    files.sort();
    files
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.') && n.len() > 1)
        .unwrap_or(false)
}
