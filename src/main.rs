//! # tk - Task Tracker CLI
//!
//! A small, file-backed task tracker with three kinds of work item:
//! standalone tasks, epics, and subtasks grouped under an epic. Epic
//! status and time span are derived from their subtasks, scheduled items
//! are kept from overlapping, and every viewed entity lands in a
//! de-duplicated history.
//!
//! ## Quick start
//!
//! ```bash
//! # Add an epic and two subtasks under it
//! tk add "v2 release" --kind epic
//! tk add "package build" --kind subtask --epic 1 --duration 30 --start 2025-10-28T09:00
//! tk add "announce" --kind subtask --epic 1
//!
//! # Inspect
//! tk list
//! tk view 1
//! tk prioritized
//! tk history
//! ```
//!
//! State lives in a single flat file (`tasks.csv` by default, `--db` to
//! override), rewritten in full after every change.

use std::path::PathBuf;

use clap::Parser;

pub mod cli;
pub mod cmd;
pub mod error;
pub mod fields;
pub mod history;
pub mod persist;
pub mod store;
pub mod task;

use cli::Cli;
use cmd::Commands;

fn main() {
    let cli = Cli::parse();
    let path = cli
        .db
        .clone()
        .unwrap_or_else(|| PathBuf::from("tasks.csv"));

    let result = match &cli.command {
        Commands::Add {
            title,
            kind,
            desc,
            duration,
            start,
            epic,
            status,
        } => cmd::cmd_add(
            &path,
            title,
            *kind,
            desc,
            *duration,
            start.as_deref(),
            *epic,
            *status,
        ),
        Commands::List { kind, json } => cmd::cmd_list(&path, *kind, *json),
        Commands::View { id, json } => cmd::cmd_view(&path, *id, *json),
        Commands::Update {
            id,
            title,
            desc,
            status,
            duration,
            start,
            clear_schedule,
            epic,
        } => cmd::cmd_update(
            &path,
            *id,
            title.as_deref(),
            desc.as_deref(),
            *status,
            *duration,
            start.as_deref(),
            *clear_schedule,
            *epic,
        ),
        Commands::Delete { id } => cmd::cmd_delete(&path, *id),
        Commands::Subtasks { epic_id } => cmd::cmd_subtasks(&path, *epic_id),
        Commands::Prioritized { json } => cmd::cmd_prioritized(&path, *json),
        Commands::History { clear, json } => cmd::cmd_history(&path, *clear, *json),
        Commands::Completions { shell } => {
            cmd::cmd_completions(*shell);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
