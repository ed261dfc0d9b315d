//! Context Assembler - builds the knowledge block handed to the prompt layer.
//!
//! Assembly merges two views of the hypergraph:
//! 1. **Query**: concepts named in the query and the events linked to them
//! 2. **Recency**: events inside the recent window and the concepts they link
//! 3. **Merge**: union both views, deduplicated by ID
//! 4. **Bound**: keep at most `max_concepts` / `max_events`, query matches first
//! 5. **Label**: the heading reflects where the surviving concepts came from
//! 6. **Format**: heading, concept list, event list, always in that order
//!
//! Recent events that link no stored concept are left out, and a context
//! with no concepts left is returned as `AssembledContext::empty()`.

mod injector;
mod provenance;

pub use injector::*;
pub use provenance::*;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use memory_model::{Concept, ConceptId, Event, EventId, PropertyValue};

use crate::knowledge_base::{sort_concepts, sort_events, HyperGraph};

/// Configuration for context assembly.
#[derive(Debug, Clone)]
pub struct AssemblerConfig {
    /// Events this recent count as recently touched. `None` disables recency.
    pub recent_window: Option<Duration>,

    /// Maximum number of concepts in the context.
    pub max_concepts: usize,

    /// Maximum number of events in the context.
    pub max_events: usize,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            recent_window: Some(Duration::minutes(10)),
            max_concepts: 50,
            max_events: 20,
        }
    }
}

/// The context assembler reads the graph and produces an `AssembledContext`.
pub struct ContextAssembler {
    config: AssemblerConfig,
}

impl ContextAssembler {
    /// Create a new context assembler with the given configuration.
    pub fn new(config: AssemblerConfig) -> Self {
        Self { config }
    }

    /// Create a context assembler with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(AssemblerConfig::default())
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    /// Assemble context for `query` using the configured window and the current time.
    pub fn assemble(&self, graph: &HyperGraph, query: &str) -> AssembledContext {
        self.assemble_at(graph, query, self.config.recent_window, Utc::now())
    }

    /// Assemble context for `query`, treating events within `recent_window`
    /// of `now` as recently touched.
    pub fn assemble_at(
        &self,
        graph: &HyperGraph,
        query: &str,
        recent_window: Option<Duration>,
        now: DateTime<Utc>,
    ) -> AssembledContext {
        let knowledge = graph.retrieve_knowledge(query);
        // A recent event linked to no stored concept has nothing to show.
        let recent_events: Vec<&Event> = recent_window
            .map(|window| graph.recent_events(window, now))
            .unwrap_or_default()
            .into_iter()
            .filter(|event| !event.concepts.is_empty())
            .collect();

        let query_concepts: BTreeMap<&ConceptId, &Concept> = knowledge
            .concepts
            .iter()
            .map(|concept| (&concept.id, *concept))
            .collect();
        let mut recent_concepts: BTreeMap<&ConceptId, &Concept> = BTreeMap::new();
        for event in &recent_events {
            for concept in graph.event_concepts(&event.id) {
                recent_concepts.insert(&concept.id, concept);
            }
        }

        // Query matches take precedence when the list has to be cut.
        let mut selected: Vec<&Concept> = sorted(query_concepts.values().copied().collect());
        let recent_only: Vec<&Concept> = recent_concepts
            .iter()
            .filter(|(id, _)| !query_concepts.contains_key(*id))
            .map(|(_, concept)| *concept)
            .collect();
        selected.extend(sorted(recent_only));
        selected.truncate(self.config.max_concepts);
        sort_concepts(&mut selected);

        let concepts: Vec<ConceptSummary> = selected
            .into_iter()
            .map(|concept| ConceptSummary {
                id: concept.id.clone(),
                name: concept.name.clone(),
                state: concept.state,
                from_query: query_concepts.contains_key(&concept.id),
                from_recent: recent_concepts.contains_key(&concept.id),
            })
            .collect();

        // The heading describes the list as cut, not the candidates.
        let provenance = ContextProvenance::from_sources(
            concepts.iter().any(|concept| concept.from_query),
            concepts.iter().any(|concept| concept.from_recent),
        );
        if provenance == ContextProvenance::Neither {
            return AssembledContext::empty();
        }

        // Same precedence for events: query matches, then recent ones.
        let query_event_ids: BTreeSet<&EventId> =
            knowledge.events.iter().map(|event| &event.id).collect();
        let mut chosen: Vec<&Event> = knowledge.events.clone();
        chosen.extend(
            recent_events
                .iter()
                .copied()
                .filter(|event| !query_event_ids.contains(&event.id)),
        );
        chosen.truncate(self.config.max_events);
        sort_events(&mut chosen);

        let events = chosen
            .into_iter()
            .map(|event| EventSummary::describe(graph, event))
            .collect();

        AssembledContext {
            provenance,
            concepts,
            events,
        }
    }
}

fn sorted(mut concepts: Vec<&Concept>) -> Vec<&Concept> {
    sort_concepts(&mut concepts);
    concepts
}

/// A concept as it appears in the context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptSummary {
    pub id: ConceptId,
    pub name: String,
    pub state: f64,
    pub from_query: bool,
    pub from_recent: bool,
}

/// An event as it appears in the context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSummary {
    pub id: EventId,
    pub timestamp: DateTime<Utc>,
    /// Names of the linked concepts, sorted.
    pub concept_names: Vec<String>,
    pub properties: BTreeMap<String, PropertyValue>,
}

impl EventSummary {
    fn describe(graph: &HyperGraph, event: &Event) -> Self {
        let mut concept_names: Vec<String> = graph
            .event_concepts(&event.id)
            .into_iter()
            .map(|concept| concept.name.clone())
            .collect();
        concept_names.sort();

        Self {
            id: event.id.clone(),
            timestamp: event.timestamp,
            concept_names,
            properties: event.properties.clone(),
        }
    }
}

/// The assembled context ready for prompt generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssembledContext {
    pub provenance: ContextProvenance,

    /// Ordered by normalized name, then ID.
    pub concepts: Vec<ConceptSummary>,

    /// Ordered newest first, then ID.
    pub events: Vec<EventSummary>,
}

impl AssembledContext {
    /// An explicitly empty context.
    pub fn empty() -> Self {
        Self {
            provenance: ContextProvenance::Neither,
            concepts: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty() && self.events.is_empty()
    }

    /// Format the context as a prompt string.
    pub fn to_prompt_string(&self) -> String {
        let mut prompt = String::new();

        prompt.push_str("## Known Concepts\n");
        prompt.push_str(self.provenance.heading());
        prompt.push('\n');
        for concept in &self.concepts {
            prompt.push_str(&format!("- {} (state {:.2})\n", concept.name, concept.state));
        }
        prompt.push('\n');

        prompt.push_str("## Relevant Events\n");
        if self.events.is_empty() {
            prompt.push_str("None.\n");
        }
        for event in &self.events {
            prompt.push_str(&format!(
                "- Event {} at {}: Concepts [{}]",
                event.id,
                event.timestamp.to_rfc3339(),
                event.concept_names.join(", ")
            ));
            if !event.properties.is_empty() {
                let properties: Vec<String> = event
                    .properties
                    .iter()
                    .map(|(key, value)| format!("{}={}", key, value))
                    .collect();
                prompt.push_str(&format!(", {}", properties.join(", ")));
            }
            prompt.push('\n');
        }

        prompt
    }

    /// Combine this context with the user's message.
    pub fn inject(&self, user_query: &str) -> String {
        inject_context(&self.to_prompt_string(), user_query)
    }
}
