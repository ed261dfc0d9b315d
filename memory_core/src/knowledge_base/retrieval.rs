//! Keyword retrieval over the hypergraph.

use std::collections::BTreeMap;

use memory_model::{Concept, ConceptId, Event, EventId};

use super::graph::{sort_concepts, sort_events, HyperGraph};

/// Longest run of query tokens probed as a single multi-word concept name.
pub const MAX_NAME_TOKENS: usize = 3;

/// Concepts matched by a query and the events that mention them.
#[derive(Debug, Clone, Default)]
pub struct RetrievedKnowledge<'a> {
    /// Ordered by normalized name, then ID.
    pub concepts: Vec<&'a Concept>,
    /// Ordered newest first, then ID.
    pub events: Vec<&'a Event>,
}

impl<'a> RetrievedKnowledge<'a> {
    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty() && self.events.is_empty()
    }

    pub fn concept_ids(&self) -> Vec<&'a ConceptId> {
        self.concepts.iter().map(|c| &c.id).collect()
    }

    pub fn event_ids(&self) -> Vec<&'a EventId> {
        self.events.iter().map(|e| &e.id).collect()
    }
}

impl HyperGraph {
    /// Normalized lookup keys for a query: every token, plus every contiguous
    /// run of up to `MAX_NAME_TOKENS` tokens joined by a space.
    pub fn query_keys(&self, query: &str) -> Vec<String> {
        let tokens = self.lemmatizer().normalize(query);
        let mut keys = Vec::new();

        for width in 1..=MAX_NAME_TOKENS.min(tokens.len()) {
            for window in tokens.windows(width) {
                let key = window.join(" ");
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }

        keys
    }

    /// Find concepts named in `query` and every event linked to them.
    ///
    /// The query is normalized with the same lemmatizer used for indexing.
    /// An empty query, or one naming nothing stored, yields an empty result.
    pub fn retrieve_knowledge(&self, query: &str) -> RetrievedKnowledge<'_> {
        let mut concepts: BTreeMap<&ConceptId, &Concept> = BTreeMap::new();
        for key in self.query_keys(query) {
            if let Some(concept) = self.concept_by_normalized_name(&key) {
                concepts.insert(&concept.id, concept);
            }
        }

        let mut events: BTreeMap<&EventId, &Event> = BTreeMap::new();
        for concept in concepts.values() {
            for event in self.events_for_concept(&concept.id) {
                events.insert(&event.id, event);
            }
        }

        let mut concepts: Vec<_> = concepts.into_values().collect();
        let mut events: Vec<_> = events.into_values().collect();
        sort_concepts(&mut concepts);
        sort_events(&mut events);

        tracing::debug!(
            "Query '{}' matched {} concepts and {} events",
            query,
            concepts.len(),
            events.len()
        );

        RetrievedKnowledge { concepts, events }
    }
}
