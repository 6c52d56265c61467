//! Flat-file persistence for the task store.
//!
//! The store round-trips through a line-oriented text format: a header,
//! one comma-joined record per entity, a blank separator line, then a
//! single line of history ids in visit order. Field values are written
//! verbatim, so titles and descriptions must not contain the comma
//! delimiter.
//!
//! Loading rebuilds the store through the restore operations, which keep
//! the saved ids and skip overlap validation: the file was valid when it
//! was written, and records must not reject each other mid-batch.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use chrono::NaiveDateTime;

use crate::error::{Error, Result};
use crate::fields::{Kind, Status};
use crate::store::TaskStore;
use crate::task::{Entity, Epic, Subtask, Task};

const HEADER: &str = "id,type,name,status,description,epic,duration,startTime";

/// Write the store's full state to `path`, replacing any existing file.
/// The write goes through a temp file and rename; a failure surfaces as
/// `Error::Io` and must be treated as fatal for the call.
pub fn save(store: &TaskStore, path: &Path) -> Result<()> {
    let mut out = String::new();
    out.push_str(HEADER);
    out.push('\n');

    let mut tasks = store.tasks();
    tasks.sort_by_key(|t| t.id);
    for t in &tasks {
        out.push_str(&record(t, Kind::Task, None));
        out.push('\n');
    }
    let mut epics = store.epics();
    epics.sort_by_key(Epic::id);
    for e in &epics {
        out.push_str(&record(&e.base, Kind::Epic, None));
        out.push('\n');
    }
    let mut subtasks = store.subtasks();
    subtasks.sort_by_key(Subtask::id);
    for s in &subtasks {
        out.push_str(&record(&s.base, Kind::Subtask, Some(s.epic_id)));
        out.push('\n');
    }

    out.push('\n');
    let history: Vec<String> = store
        .history()
        .iter()
        .map(|e| e.id().to_string())
        .collect();
    out.push_str(&history.join(","));
    out.push('\n');

    // Atomic-ish write via temp + rename.
    let tmp = path.with_extension("csv.tmp");
    let mut f = File::create(&tmp)?;
    f.write_all(out.as_bytes())?;
    f.flush()?;
    fs::rename(tmp, path)?;
    Ok(())
}

/// Rebuild a store from `path`. A missing file yields an empty store; an
/// unreadable or unparseable one is an error, never silently discarded.
pub fn load(path: &Path) -> Result<TaskStore> {
    if !path.exists() {
        return Ok(TaskStore::new());
    }
    let text = fs::read_to_string(path)?;
    let mut store = TaskStore::new();

    let mut lines = text.lines();
    match lines.next() {
        Some(HEADER) => {}
        Some(other) => {
            return Err(Error::MalformedRecord(format!(
                "unexpected header: {other}"
            )))
        }
        None => return Ok(store),
    }

    let mut parsed: Vec<Entity> = Vec::new();
    let mut history_line = None;
    while let Some(line) = lines.next() {
        if line.trim().is_empty() {
            // Entity block done; the next line (if any) is the history.
            history_line = lines.next();
            break;
        }
        parsed.push(parse_record(line)?);
    }

    // Epics must exist before any subtask links to them.
    for e in &parsed {
        if let Entity::Epic(epic) = e {
            store.restore_epic(epic.clone());
        }
    }
    for e in &parsed {
        if let Entity::Task(task) = e {
            store.restore_task(task.clone());
        }
    }
    for e in &parsed {
        if let Entity::Subtask(sub) = e {
            store.restore_subtask(sub.clone())?;
        }
    }

    if let Some(line) = history_line {
        replay_history(&mut store, line)?;
    }
    Ok(store)
}

/// One comma-joined entity line. The epic column is only filled for
/// subtasks; duration and start are empty when unscheduled.
fn record(base: &Task, kind: Kind, epic_id: Option<u64>) -> String {
    let epic = epic_id.map(|id| id.to_string()).unwrap_or_default();
    let duration = base
        .duration_min
        .map(|m| m.to_string())
        .unwrap_or_default();
    let start = base
        .start
        .map(|s| s.format("%Y-%m-%dT%H:%M:%S").to_string())
        .unwrap_or_default();
    [
        base.id.to_string(),
        kind.tag().to_string(),
        base.title.clone(),
        base.status.tag().to_string(),
        base.description.clone(),
        epic,
        duration,
        start,
    ]
    .join(",")
}

fn parse_record(line: &str) -> Result<Entity> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() != 8 {
        return Err(Error::MalformedRecord(format!(
            "expected 8 fields, got {}: {line}",
            fields.len()
        )));
    }
    let id: u64 = fields[0]
        .parse()
        .map_err(|_| Error::MalformedRecord(format!("bad id: {}", fields[0])))?;
    let kind = Kind::from_tag(fields[1])?;
    let status = Status::from_tag(fields[3])?;
    let duration_min = parse_optional(fields[6], "duration")?;
    let start = match fields[7] {
        "" => None,
        s => Some(parse_datetime(s)?),
    };

    let base = Task {
        id,
        title: fields[2].to_string(),
        description: fields[4].to_string(),
        status,
        duration_min,
        start,
    };
    match kind {
        Kind::Task => Ok(Entity::Task(base)),
        Kind::Epic => Ok(Entity::Epic(Epic {
            base,
            subtask_ids: Vec::new(),
            end: None,
        })),
        Kind::Subtask => {
            let epic_id: u64 = fields[5]
                .parse()
                .map_err(|_| Error::MalformedRecord(format!("bad epic id: {}", fields[5])))?;
            Ok(Entity::Subtask(Subtask { base, epic_id }))
        }
    }
}

fn parse_optional(field: &str, what: &str) -> Result<Option<u32>> {
    if field.is_empty() {
        return Ok(None);
    }
    field
        .parse()
        .map(Some)
        .map_err(|_| Error::MalformedRecord(format!("bad {what}: {field}")))
}

/// ISO-8601 local date-time, with or without a seconds component.
pub(crate) fn parse_datetime(s: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M"))
        .map_err(|_| Error::MalformedRecord(format!("bad startTime: {s}")))
}

/// Replay the saved visit sequence, looking each id up across all three
/// kinds and skipping ids that are no longer present.
fn replay_history(store: &mut TaskStore, line: &str) -> Result<()> {
    let mut by_id: HashMap<u64, Entity> = HashMap::new();
    for t in store.tasks() {
        by_id.insert(t.id, Entity::Task(t));
    }
    for e in store.epics() {
        by_id.insert(e.id(), Entity::Epic(e));
    }
    for s in store.subtasks() {
        by_id.insert(s.id(), Entity::Subtask(s));
    }
    for part in line.split(',').filter(|p| !p.trim().is_empty()) {
        let id: u64 = part
            .trim()
            .parse()
            .map_err(|_| Error::MalformedRecord(format!("bad history id: {part}")))?;
        if let Some(entity) = by_id.get(&id) {
            store.record_visit(entity.clone());
        }
    }
    Ok(())
}
