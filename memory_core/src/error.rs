//! Error types for hypergraph memory operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for memory operations.
pub type MemoryResult<T> = Result<T, MemoryError>;

/// Main error type for all memory operations.
///
/// Lookups that merely miss return `Option`; `NotFound` is reserved for
/// operations that cannot proceed without the target.
#[derive(Error, Debug)]
pub enum MemoryError {
    /// Lookup target does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// An item with the same ID is already stored.
    #[error("{kind} with ID {id} already exists")]
    DuplicateId { kind: &'static str, id: String },

    /// An event must reference at least one concept.
    #[error("event {id} does not reference any concept")]
    EmptyEvent { id: String },

    /// JSON has no encoding for NaN or infinity, so such values never enter the graph.
    #[error("{kind} {id} has a non-finite {field}")]
    NonFiniteValue {
        kind: &'static str,
        id: String,
        field: String,
    },

    /// The persisted snapshot is missing or unreadable.
    #[error("persisted graph unavailable at {}: {source}", .path.display())]
    PersistenceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MemoryError {
    pub(crate) fn concept_not_found(id: impl ToString) -> Self {
        MemoryError::NotFound {
            kind: "concept",
            id: id.to_string(),
        }
    }

    pub(crate) fn duplicate_event(id: impl ToString) -> Self {
        MemoryError::DuplicateId {
            kind: "event",
            id: id.to_string(),
        }
    }

    pub(crate) fn non_finite(kind: &'static str, id: impl ToString, field: impl ToString) -> Self {
        MemoryError::NonFiniteValue {
            kind,
            id: id.to_string(),
            field: field.to_string(),
        }
    }

    /// Whether the error is a lookup miss.
    pub fn is_not_found(&self) -> bool {
        matches!(self, MemoryError::NotFound { .. })
    }
}
