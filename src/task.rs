//! Entity model for the tracker.
//!
//! Three kinds of work item share one set of base fields: a plain `Task`,
//! an `Epic` that groups subtasks and derives its status and time span from
//! them, and a `Subtask` owned by exactly one epic. Identity is the store
//! assigned id; equality and hashing consider nothing else, so a stale copy
//! and a fresh copy of the same entity compare equal.

use std::hash::{Hash, Hasher};

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::fields::{Kind, Status};

/// A standalone work item, and the base record embedded by the other kinds.
///
/// `id` 0 means the entity has not been inserted into a store yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub status: Status,
    /// Planned duration in whole minutes, if scheduled.
    pub duration_min: Option<u32>,
    /// Planned start, if scheduled.
    pub start: Option<NaiveDateTime>,
}

impl Task {
    /// Create an unscheduled task with status `New` and no id.
    pub fn new(title: &str, description: &str) -> Self {
        Task {
            id: 0,
            title: title.to_string(),
            description: description.to_string(),
            status: Status::New,
            duration_min: None,
            start: None,
        }
    }

    /// Attach a schedule, consuming and returning self for chained setup.
    pub fn scheduled(mut self, duration_min: u32, start: NaiveDateTime) -> Self {
        self.duration_min = Some(duration_min);
        self.start = Some(start);
        self
    }

    /// End of the planned interval: start plus duration, or `None` unless
    /// both are present.
    pub fn end_time(&self) -> Option<NaiveDateTime> {
        Some(self.start? + Duration::minutes(i64::from(self.duration_min?)))
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Task {}

impl Hash for Task {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Whether two items' planned intervals share at least one instant.
///
/// Intervals are closed, so touching endpoints count as an overlap. Items
/// missing a start or a duration never overlap anything.
pub fn overlaps(a: &Task, b: &Task) -> bool {
    match (a.start, a.end_time(), b.start, b.end_time()) {
        (Some(start_a), Some(end_a), Some(start_b), Some(end_b)) => {
            !(end_a < start_b) && !(start_a > end_b)
        }
        _ => false,
    }
}

/// A grouping work item. Status, duration, start and end all mirror its
/// current subtasks and are rewritten by the store after every mutation
/// that touches one of them; callers never set them directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Epic {
    #[serde(flatten)]
    pub base: Task,
    /// Ids of owned subtasks, insertion order, no duplicates.
    pub subtask_ids: Vec<u64>,
    /// Latest subtask end. Kept separately because an epic's subtasks may
    /// leave gaps, so start + duration is not the right endpoint.
    pub end: Option<NaiveDateTime>,
}

impl Epic {
    pub fn new(title: &str, description: &str) -> Self {
        Epic {
            base: Task::new(title, description),
            subtask_ids: Vec::new(),
            end: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.base.id
    }

    /// Link a subtask id, ignoring duplicates.
    pub fn add_subtask(&mut self, subtask_id: u64) {
        if !self.subtask_ids.contains(&subtask_id) {
            self.subtask_ids.push(subtask_id);
        }
    }

    /// Unlink a subtask id if present.
    pub fn remove_subtask(&mut self, subtask_id: u64) {
        self.subtask_ids.retain(|&id| id != subtask_id);
    }
}

impl PartialEq for Epic {
    fn eq(&self, other: &Self) -> bool {
        self.base.id == other.base.id
    }
}

impl Eq for Epic {}

impl Hash for Epic {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.base.id.hash(state);
    }
}

/// A work item owned by exactly one epic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subtask {
    #[serde(flatten)]
    pub base: Task,
    pub epic_id: u64,
}

impl Subtask {
    pub fn new(title: &str, description: &str, epic_id: u64) -> Self {
        Subtask {
            base: Task::new(title, description),
            epic_id,
        }
    }

    pub fn id(&self) -> u64 {
        self.base.id
    }

    /// Repoint at another epic. A subtask may never own itself, so passing
    /// its own id keeps the previous value.
    pub fn set_epic_id(&mut self, epic_id: u64) {
        if epic_id != self.base.id {
            self.epic_id = epic_id;
        }
    }
}

impl PartialEq for Subtask {
    fn eq(&self, other: &Self) -> bool {
        self.base.id == other.base.id
    }
}

impl Eq for Subtask {}

impl Hash for Subtask {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.base.id.hash(state);
    }
}

/// Any of the three entity kinds, as handed to the history tracker, the
/// prioritised view and the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Entity {
    Task(Task),
    Epic(Epic),
    Subtask(Subtask),
}

impl Entity {
    pub fn kind(&self) -> Kind {
        match self {
            Entity::Task(_) => Kind::Task,
            Entity::Epic(_) => Kind::Epic,
            Entity::Subtask(_) => Kind::Subtask,
        }
    }

    /// The shared base record of whichever kind this is.
    pub fn base(&self) -> &Task {
        match self {
            Entity::Task(t) => t,
            Entity::Epic(e) => &e.base,
            Entity::Subtask(s) => &s.base,
        }
    }

    pub fn id(&self) -> u64 {
        self.base().id
    }

    /// End of the planned interval. Epics report their stored aggregate
    /// endpoint rather than start + duration.
    pub fn end_time(&self) -> Option<NaiveDateTime> {
        match self {
            Entity::Epic(e) => e.end,
            other => other.base().end_time(),
        }
    }
}
