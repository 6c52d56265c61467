//! Enumerations shared across the tracker.
//!
//! Defines the entity kind discriminator and the task status values, along
//! with the tag strings used by the persisted file format.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Discriminator for the three entity kinds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Kind {
    Task,
    Epic,
    Subtask,
}

impl Kind {
    /// Tag used in the persisted file (`TASK` / `EPIC` / `SUBTASK`).
    pub fn tag(self) -> &'static str {
        match self {
            Kind::Task => "TASK",
            Kind::Epic => "EPIC",
            Kind::Subtask => "SUBTASK",
        }
    }

    /// Parse a file tag back into a kind.
    pub fn from_tag(s: &str) -> Result<Self, Error> {
        match s {
            "TASK" => Ok(Kind::Task),
            "EPIC" => Ok(Kind::Epic),
            "SUBTASK" => Ok(Kind::Subtask),
            other => Err(Error::UnknownKind(other.to_string())),
        }
    }
}

/// Task completion status.
///
/// Epics never have their status set directly; the store derives it from
/// the statuses of their subtasks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    New,
    InProgress,
    Done,
}

impl Status {
    /// Tag used in the persisted file (`NEW` / `IN_PROGRESS` / `DONE`).
    pub fn tag(self) -> &'static str {
        match self {
            Status::New => "NEW",
            Status::InProgress => "IN_PROGRESS",
            Status::Done => "DONE",
        }
    }

    /// Parse a file tag back into a status.
    pub fn from_tag(s: &str) -> Result<Self, Error> {
        match s {
            "NEW" => Ok(Status::New),
            "IN_PROGRESS" => Ok(Status::InProgress),
            "DONE" => Ok(Status::Done),
            other => Err(Error::MalformedRecord(format!("unknown status: {other}"))),
        }
    }
}

/// Format a status for table display.
pub fn format_status(s: Status) -> &'static str {
    match s {
        Status::New => "New",
        Status::InProgress => "InProgress",
        Status::Done => "Done",
    }
}

/// Format a kind for table display.
pub fn format_kind(k: Kind) -> &'static str {
    match k {
        Kind::Task => "Task",
        Kind::Epic => "Epic",
        Kind::Subtask => "Subtask",
    }
}
