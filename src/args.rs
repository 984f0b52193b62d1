use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// polylint - multi-engine code quality and security analysis
#[derive(Parser, Debug)]
#[command(name = "polylint")]
#[command(about = "Analyze source trees with pattern, structural, and AI engines")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to polylint.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze files or directories
    Scan {
        /// Paths to analyze (defaults to the current directory)
        paths: Vec<PathBuf>,
        /// Engine to use, or "auto" for routed selection
        #[arg(long, default_value = "auto")]
        engine: String,
        /// Rules directory (overrides the configured one)
        #[arg(long)]
        rules: Option<PathBuf>,
        /// Output format
        #[arg(long, default_value = "text")]
        format: String,
        /// Write the report to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List the rules in the catalog
    Rules {
        /// Rules directory (overrides the configured one)
        #[arg(long)]
        rules: Option<PathBuf>,
    },
}
