//! Concept and event definitions.

mod concept;
mod event;
mod properties;

pub use concept::*;
pub use event::*;
pub use properties::*;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of a concept. Assigned at creation, never reassigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConceptId(pub String);

impl ConceptId {
    /// Create a new random concept ID.
    pub fn new() -> Self {
        Self(format!("concept_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConceptId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for ConceptId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ConceptId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ConceptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identifier of an event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub String);

impl EventId {
    /// Create a new random event ID.
    pub fn new() -> Self {
        Self(format!("event_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for EventId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for EventId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
