//! CLI argument definitions.
//!
//! Only the flags in front of the task path belong to stagehand itself.
//! Everything from the first task word on is handed to the engine.

use clap::Parser;
use std::path::PathBuf;

/// Stagehand - declarative deployment and task orchestration.
#[derive(Debug, Parser)]
#[command(name = "stagehand")]
#[command(author, version, about, long_about = None)]
#[command(disable_help_flag = true)]
pub struct Cli {
    /// Path to the stagefile (defaults to the nearest stagehand.yml)
    #[arg(short, long, env = "STAGEHAND_FILE")]
    pub file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Task path followed by its flags and arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}
