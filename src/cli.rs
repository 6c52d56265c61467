use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// Top-level argument parser. All state lives in one flat store file,
/// `./tasks.csv` unless overridden with `--db`.
#[derive(Parser)]
#[command(name = "tk", version, about = "Task tracker with epics, subtasks and schedules")]
pub struct Cli {
    /// Path to the store file (default: tasks.csv).
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}
