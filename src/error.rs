//! Error types for the tracker core.

use std::io;

/// Result type alias for tracker operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the store and the persistence layer.
///
/// Lookups that find nothing are not errors; they return `Option::None`
/// from the store instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A subtask referenced an epic that is not in the store.
    #[error("Epic #{0} does not exist")]
    UnknownEpic(u64),

    /// A subtask tried to name itself as its owning epic.
    #[error("Subtask #{0} cannot be its own epic")]
    SelfReference(u64),

    /// A scheduled entity would overlap another scheduled entity.
    #[error("Planned interval overlaps existing entity #{0}")]
    Overlap(u64),

    /// A persisted record could not be parsed.
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// A persisted record carried an unrecognised type tag.
    #[error("Unknown entity type: {0}")]
    UnknownKind(String),

    /// Reading or writing the store file failed.
    #[error("Storage error: {0}")]
    Io(#[from] io::Error),

    /// JSON output could not be produced.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
