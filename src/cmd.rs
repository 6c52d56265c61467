//! Command implementations for the CLI interface.
//!
//! Every handler here is a thin adapter: load the store from disk, call
//! one store operation, save, print. All data rules live in the store;
//! a transport layer wired to the same operations would behave the same.

use std::io;
use std::path::Path;

use clap::{CommandFactory, Subcommand};
use clap_complete::{generate, Shell};

use crate::cli::Cli;
use crate::error::{Error, Result};
use crate::fields::{format_kind, format_status, Kind, Status};
use crate::persist;
use crate::store::TaskStore;
use crate::task::{Entity, Epic, Subtask, Task};

#[derive(Subcommand)]
pub enum Commands {
    /// Add a task, epic or subtask.
    Add {
        /// Short title for the entity.
        title: String,
        /// Entity kind: task | epic | subtask.
        #[arg(long, value_enum, default_value_t = Kind::Task)]
        kind: Kind,
        /// Optional longer description.
        #[arg(long, default_value = "")]
        desc: String,
        /// Planned duration in minutes.
        #[arg(long)]
        duration: Option<u32>,
        /// Planned start, ISO-8601 local date-time (e.g. 2025-10-28T10:00).
        #[arg(long)]
        start: Option<String>,
        /// Owning epic id. Required for subtasks, ignored otherwise.
        #[arg(long)]
        epic: Option<u64>,
        /// Initial status: new | in-progress | done. Ignored for epics.
        #[arg(long, value_enum, default_value_t = Status::New)]
        status: Status,
    },

    /// List entities.
    List {
        /// Only list one kind.
        #[arg(long, value_enum)]
        kind: Option<Kind>,
        /// Emit JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// View one entity by id, recording it in the viewing history.
    View {
        id: u64,
        #[arg(long)]
        json: bool,
    },

    /// Update fields on an entity.
    Update {
        id: u64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        desc: Option<String>,
        /// New status. Ignored for epics, whose status is derived.
        #[arg(long, value_enum)]
        status: Option<Status>,
        /// Planned duration in minutes.
        #[arg(long)]
        duration: Option<u32>,
        /// Planned start, ISO-8601 local date-time.
        #[arg(long)]
        start: Option<String>,
        /// Drop the planned duration and start.
        #[arg(long)]
        clear_schedule: bool,
        /// Move a subtask to another epic.
        #[arg(long)]
        epic: Option<u64>,
    },

    /// Delete an entity by id. Deleting an epic removes its subtasks too.
    Delete { id: u64 },

    /// List the subtasks of an epic.
    Subtasks { epic_id: u64 },

    /// List scheduled entities ordered by start time.
    Prioritized {
        #[arg(long)]
        json: bool,
    },

    /// Show the viewing history, oldest first.
    History {
        /// Clear the history instead of printing it.
        #[arg(long)]
        clear: bool,
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn cmd_add(
    path: &Path,
    title: &str,
    kind: Kind,
    desc: &str,
    duration: Option<u32>,
    start: Option<&str>,
    epic: Option<u64>,
    status: Status,
) -> Result<()> {
    let mut store = persist::load(path)?;
    let start = parse_start(start)?;
    match kind {
        Kind::Task => {
            let mut task = Task::new(title, desc);
            task.status = status;
            task.duration_min = duration;
            task.start = start;
            let task = store.create_task(task)?;
            persist::save(&store, path)?;
            println!("Added task #{}: {}", task.id, task.title);
        }
        Kind::Epic => {
            let epic = store.create_epic(Epic::new(title, desc));
            persist::save(&store, path)?;
            println!("Added epic #{}: {}", epic.id(), epic.base.title);
        }
        Kind::Subtask => {
            let Some(epic_id) = epic else {
                return Err(Error::MalformedRecord(
                    "subtasks need an owning epic; pass --epic <id>".into(),
                ));
            };
            let mut sub = Subtask::new(title, desc, epic_id);
            sub.base.status = status;
            sub.base.duration_min = duration;
            sub.base.start = start;
            let sub = store.create_subtask(sub)?;
            persist::save(&store, path)?;
            println!(
                "Added subtask #{} under epic #{}: {}",
                sub.id(),
                sub.epic_id,
                sub.base.title
            );
        }
    }
    Ok(())
}

pub fn cmd_list(path: &Path, kind: Option<Kind>, json: bool) -> Result<()> {
    let store = persist::load(path)?;
    let mut rows: Vec<Entity> = Vec::new();
    if kind.is_none() || kind == Some(Kind::Task) {
        rows.extend(store.tasks().into_iter().map(Entity::Task));
    }
    if kind.is_none() || kind == Some(Kind::Epic) {
        rows.extend(store.epics().into_iter().map(Entity::Epic));
    }
    if kind.is_none() || kind == Some(Kind::Subtask) {
        rows.extend(store.subtasks().into_iter().map(Entity::Subtask));
    }
    rows.sort_by_key(Entity::id);
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        print_table(&rows);
    }
    Ok(())
}

pub fn cmd_view(path: &Path, id: u64, json: bool) -> Result<()> {
    let mut store = persist::load(path)?;
    let found = store
        .task(id)
        .map(Entity::Task)
        .or_else(|| store.epic(id).map(Entity::Epic))
        .or_else(|| store.subtask(id).map(Entity::Subtask));
    let Some(entity) = found else {
        println!("No entity with id {id}");
        return Ok(());
    };
    // The view landed in the history, so the store changed.
    persist::save(&store, path)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&entity)?);
    } else {
        print_detail(&store, &entity);
    }
    Ok(())
}

pub fn cmd_update(
    path: &Path,
    id: u64,
    title: Option<&str>,
    desc: Option<&str>,
    status: Option<Status>,
    duration: Option<u32>,
    start: Option<&str>,
    clear_schedule: bool,
    epic: Option<u64>,
) -> Result<()> {
    let mut store = persist::load(path)?;
    let start = parse_start(start)?;

    let apply = |base: &mut Task| {
        if let Some(t) = title {
            base.title = t.to_string();
        }
        if let Some(d) = desc {
            base.description = d.to_string();
        }
        if let Some(s) = status {
            base.status = s;
        }
        if let Some(d) = duration {
            base.duration_min = Some(d);
        }
        if let Some(s) = start {
            base.start = Some(s);
        }
        if clear_schedule {
            base.duration_min = None;
            base.start = None;
        }
    };

    // Ids are unique across kinds, so at most one branch matches. Listing
    // accessors are used for the lookup so the update does not count as a
    // view in the history.
    if let Some(mut task) = store.tasks().into_iter().find(|t| t.id == id) {
        apply(&mut task);
        store.update_task(task)?;
    } else if let Some(mut epic_entity) = store.epics().into_iter().find(|e| e.id() == id) {
        apply(&mut epic_entity.base);
        store.update_epic(epic_entity);
    } else if let Some(mut sub) = store.subtasks().into_iter().find(|s| s.id() == id) {
        apply(&mut sub.base);
        if let Some(e) = epic {
            sub.set_epic_id(e);
        }
        store.update_subtask(sub)?;
    } else {
        println!("No entity with id {id}; nothing updated");
        return Ok(());
    }
    persist::save(&store, path)?;
    println!("Updated #{id}");
    Ok(())
}

pub fn cmd_delete(path: &Path, id: u64) -> Result<()> {
    let mut store = persist::load(path)?;
    if store.tasks().iter().any(|t| t.id == id) {
        store.delete_task(id);
        println!("Deleted task #{id}");
    } else if store.epics().iter().any(|e| e.id() == id) {
        store.delete_epic(id);
        println!("Deleted epic #{id} and its subtasks");
    } else if store.subtasks().iter().any(|s| s.id() == id) {
        store.delete_subtask(id);
        println!("Deleted subtask #{id}");
    } else {
        println!("No entity with id {id}; nothing deleted");
        return Ok(());
    }
    persist::save(&store, path)?;
    Ok(())
}

pub fn cmd_subtasks(path: &Path, epic_id: u64) -> Result<()> {
    let store = persist::load(path)?;
    if !store.epics().iter().any(|e| e.id() == epic_id) {
        println!("No epic with id {epic_id}");
        return Ok(());
    }
    let rows: Vec<Entity> = store
        .subtasks_of(epic_id)
        .into_iter()
        .map(Entity::Subtask)
        .collect();
    print_table(&rows);
    Ok(())
}

pub fn cmd_prioritized(path: &Path, json: bool) -> Result<()> {
    let store = persist::load(path)?;
    let rows = store.prioritized();
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        print_table(&rows);
    }
    Ok(())
}

pub fn cmd_history(path: &Path, clear: bool, json: bool) -> Result<()> {
    let mut store = persist::load(path)?;
    if clear {
        store.clear_history();
        persist::save(&store, path)?;
        println!("History cleared");
        return Ok(());
    }
    let rows = store.history();
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        print_table(&rows);
    }
    Ok(())
}

pub fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "tk", &mut io::stdout());
}

fn parse_start(start: Option<&str>) -> Result<Option<chrono::NaiveDateTime>> {
    start.map(persist::parse_datetime).transpose()
}

/// Print entities in a formatted table.
fn print_table(rows: &[Entity]) {
    println!(
        "{:<5} {:<8} {:<11} {:<6} {:<17} {:<17} {}",
        "ID", "Kind", "Status", "Dur", "Start", "End", "Title"
    );
    for e in rows {
        let base = e.base();
        let dur = base
            .duration_min
            .map(|m| format!("{m}m"))
            .unwrap_or_else(|| "-".into());
        println!(
            "{:<5} {:<8} {:<11} {:<6} {:<17} {:<17} {}",
            base.id,
            format_kind(e.kind()),
            format_status(base.status),
            dur,
            format_time(base.start),
            format_time(e.end_time()),
            base.title
        );
    }
}

fn print_detail(store: &TaskStore, entity: &Entity) {
    let base = entity.base();
    println!("#{} {} [{}]", base.id, base.title, format_kind(entity.kind()));
    println!("  status:   {}", format_status(base.status));
    if !base.description.is_empty() {
        println!("  desc:     {}", base.description);
    }
    if let Some(m) = base.duration_min {
        println!("  duration: {m}m");
    }
    println!("  start:    {}", format_time(base.start));
    println!("  end:      {}", format_time(entity.end_time()));
    match entity {
        Entity::Epic(epic) => {
            println!("  subtasks: {}", epic.subtask_ids.len());
            for sub in store.subtasks_of(epic.id()) {
                println!(
                    "    #{} {} ({})",
                    sub.id(),
                    sub.base.title,
                    format_status(sub.base.status)
                );
            }
        }
        Entity::Subtask(sub) => println!("  epic:     #{}", sub.epic_id),
        Entity::Task(_) => {}
    }
}

fn format_time(t: Option<chrono::NaiveDateTime>) -> String {
    t.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".into())
}
