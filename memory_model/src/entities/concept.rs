//! Concept definitions - named nodes of the hypergraph.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::ConceptId;

/// A named entity or idea with a mutable scalar state.
///
/// `normalized_name` is filled in by the store when the concept is inserted;
/// a candidate built by a caller usually leaves it empty. The events that
/// mention a concept are tracked by the store, not by the concept itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    pub id: ConceptId,

    /// Surface form as given.
    pub name: String,

    /// Lowercase, lemmatized form used as the secondary identity key.
    #[serde(default)]
    pub normalized_name: String,

    pub state: f64,

    /// Free-form annotations (source, confidence, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Concept {
    /// Create a new concept with a generated ID and a zero state.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(ConceptId::new(), name)
    }

    /// Create a new concept with an explicit ID.
    pub fn with_id(id: impl Into<ConceptId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            normalized_name: String::new(),
            state: 0.0,
            metadata: BTreeMap::new(),
        }
    }

    /// Set the initial state.
    pub fn with_state(mut self, state: f64) -> Self {
        self.state = state;
        self
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Replace the state, returning the signed change (`new - old`).
    pub fn update_state(&mut self, new_state: f64) -> f64 {
        let delta = new_state - self.state;
        self.state = new_state;
        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concept_creation() {
        let concept = Concept::with_id("c1", "Paris").with_state(1.5);
        assert_eq!(concept.id, ConceptId::from("c1"));
        assert_eq!(concept.name, "Paris");
        assert!(concept.normalized_name.is_empty());
        assert_eq!(concept.state, 1.5);
    }

    #[test]
    fn test_update_state_returns_delta() {
        let mut concept = Concept::new("light").with_state(1.0);
        let delta = concept.update_state(0.25);
        assert!((delta + 0.75).abs() < 1e-9);
        assert_eq!(concept.state, 0.25);
    }

    #[test]
    fn test_metadata_is_omitted_when_empty() {
        let concept = Concept::with_id("c1", "Paris");
        let json = serde_json::to_value(&concept).unwrap();
        assert!(json.get("metadata").is_none());

        let tagged = concept.with_metadata("source", serde_json::json!("chat"));
        let json = serde_json::to_value(&tagged).unwrap();
        assert_eq!(json["metadata"]["source"], "chat");
    }
}
