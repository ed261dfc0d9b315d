//! Event definitions - hyperedges linking one or more concepts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{ConceptId, EventId, PropertyValue};

/// Property key conventionally used for the magnitude of a state change.
pub const DELTA_PROPERTY: &str = "delta";

/// A timestamped hyperedge over concepts.
///
/// Concepts are referenced by ID only. Before insertion the list is tentative;
/// after insertion the store rewrites it to the IDs that resolved to its own
/// concepts, so every entry points at a stored instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: DateTime<Utc>,
    pub concepts: Vec<ConceptId>,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
}

impl Event {
    /// Create an event over the given concepts, stamped now.
    pub fn new(concepts: impl IntoIterator<Item = ConceptId>) -> Self {
        Self {
            id: EventId::new(),
            timestamp: Utc::now(),
            concepts: concepts.into_iter().collect(),
            properties: BTreeMap::new(),
        }
    }

    /// Set the event ID.
    pub fn with_id(mut self, id: impl Into<EventId>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the timestamp.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Reference one more concept.
    pub fn with_concept(mut self, concept: impl Into<ConceptId>) -> Self {
        self.concepts.push(concept.into());
        self
    }

    /// Set a property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Set the state-change magnitude.
    pub fn with_delta(self, delta: f64) -> Self {
        self.with_property(DELTA_PROPERTY, delta)
    }

    /// The state-change magnitude, if the event carries one.
    pub fn delta(&self) -> Option<f64> {
        self.properties.get(DELTA_PROPERTY).and_then(PropertyValue::as_f64)
    }

    /// Check whether this event references a concept.
    pub fn involves(&self, concept: &ConceptId) -> bool {
        self.concepts.contains(concept)
    }
}
