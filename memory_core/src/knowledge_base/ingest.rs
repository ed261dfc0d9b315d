//! Integration of extracted concepts and events into the hypergraph.
//!
//! An extraction step hands over candidates whose IDs are tentative: a
//! candidate concept may collapse onto an already stored concept, so event
//! references are remapped to canonical IDs before the events are linked.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use memory_model::{Concept, ConceptId, Event, EventId, PropertyValue};

use super::graph::{HyperGraph, LinkWarning};
use crate::error::MemoryError;

/// A concept proposed by an extraction step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedConcept {
    #[serde(default)]
    pub id: Option<ConceptId>,
    pub name: String,
    #[serde(default)]
    pub state: f64,
}

impl ExtractedConcept {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            state: 0.0,
        }
    }

    pub fn with_id(mut self, id: impl Into<ConceptId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_state(mut self, state: f64) -> Self {
        self.state = state;
        self
    }
}

/// An event proposed by an extraction step.
///
/// `concept_ids` may hold candidate IDs from the same batch, stored concept
/// IDs, or concept names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEvent {
    #[serde(default)]
    pub id: Option<EventId>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    pub concept_ids: Vec<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
}

impl ExtractedEvent {
    pub fn new<I, S>(concept_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: None,
            timestamp: None,
            concept_ids: concept_ids.into_iter().map(Into::into).collect(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<EventId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// Candidates produced by one extraction pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionBatch {
    #[serde(default)]
    pub concepts: Vec<ExtractedConcept>,
    #[serde(default)]
    pub events: Vec<ExtractedEvent>,
}

/// What happened to a batch.
#[derive(Debug, Default)]
pub struct IngestReport {
    /// Concepts stored as new instances.
    pub concepts_added: usize,
    /// Candidates that resolved to an already stored concept.
    pub concepts_merged: usize,
    pub events_added: usize,
    pub warnings: Vec<LinkWarning>,
    /// Candidate concepts that could not be stored, by name, with the reason.
    pub rejected_concepts: Vec<(String, MemoryError)>,
    /// Events that could not be stored, with the reason.
    pub rejected: Vec<(EventId, MemoryError)>,
}

impl IngestReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty() && self.rejected.is_empty() && self.rejected_concepts.is_empty()
    }
}

/// Insert a batch into `graph`: concepts first, then events.
///
/// A rejected event does not stop the rest of the batch.
pub fn integrate(graph: &mut HyperGraph, batch: ExtractionBatch) -> IngestReport {
    let mut report = IngestReport::default();
    // Candidate ID -> canonical ID, for candidates that carried an ID.
    let mut remap: HashMap<ConceptId, ConceptId> = HashMap::new();

    for extracted in batch.concepts {
        let candidate_id = extracted.id.clone();
        let name = extracted.name.clone();
        let mut candidate = Concept::new(extracted.name).with_state(extracted.state);
        if let Some(id) = &candidate_id {
            candidate.id = id.clone();
        }
        let proposed = candidate.id.clone();
        let already_stored = graph.contains_concept(&proposed);

        let stored = match graph.insert_concept(candidate) {
            Ok(concept) => concept.id.clone(),
            Err(e) => {
                tracing::warn!("Could not integrate concept '{}': {}", name, e);
                report.rejected_concepts.push((name, e));
                continue;
            }
        };
        if !already_stored && stored == proposed {
            report.concepts_added += 1;
        } else {
            report.concepts_merged += 1;
        }
        if let Some(id) = candidate_id {
            remap.insert(id, stored);
        }
    }

    for extracted in batch.events {
        let concepts: Vec<ConceptId> = extracted
            .concept_ids
            .iter()
            .map(|reference| resolve_reference(graph, &remap, reference))
            .collect();

        let mut event = Event::new(concepts);
        if let Some(id) = extracted.id {
            event.id = id;
        }
        if let Some(timestamp) = extracted.timestamp {
            event.timestamp = timestamp;
        }
        event.properties = extracted.properties;

        let event_id = event.id.clone();
        match graph.insert_event(event) {
            Ok(outcome) => {
                report.events_added += 1;
                report.warnings.extend(outcome.warnings);
            }
            Err(e) => {
                tracing::warn!("Could not integrate event {}: {}", event_id, e);
                report.rejected.push((event_id, e));
            }
        }
    }

    tracing::info!(
        "Integrated batch: {} concepts added, {} merged, {} rejected; {} events added, {} rejected",
        report.concepts_added,
        report.concepts_merged,
        report.rejected_concepts.len(),
        report.events_added,
        report.rejected.len()
    );

    report
}

/// Map an event reference to a stored concept ID when possible. Unresolved
/// references pass through unchanged so insertion reports them as dangling.
fn resolve_reference(
    graph: &HyperGraph,
    remap: &HashMap<ConceptId, ConceptId>,
    reference: &str,
) -> ConceptId {
    let as_id = ConceptId::from(reference);
    if let Some(canonical) = remap.get(&as_id) {
        return canonical.clone();
    }
    if graph.contains_concept(&as_id) {
        return as_id;
    }
    graph
        .get_concept_by_name(reference)
        .map(|concept| concept.id.clone())
        .unwrap_or(as_id)
}
