//! Hypergraph - the authoritative store of concepts and events.

use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use memory_model::{Concept, ConceptId, Event, EventId, Lemmatizer, SimpleLemmatizer};

use crate::error::{MemoryError, MemoryResult};

/// Recoverable condition found while linking an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkWarning {
    /// The event referenced a concept that is not in the graph; the link was skipped.
    DanglingReference {
        event_id: EventId,
        concept_id: ConceptId,
    },
}

impl std::fmt::Display for LinkWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkWarning::DanglingReference {
                event_id,
                concept_id,
            } => write!(
                f,
                "event {} references concept {} which was not found",
                event_id, concept_id
            ),
        }
    }
}

/// Result of a successful event insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertOutcome {
    pub event_id: EventId,
    /// Concepts the event was linked to, in reference order.
    pub linked: Vec<ConceptId>,
    pub warnings: Vec<LinkWarning>,
}

impl InsertOutcome {
    /// True when every reference resolved.
    pub fn is_fully_linked(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// The hypergraph store.
///
/// Concepts are indexed by ID and by normalized name; the two maps are updated
/// together and never diverge. Events reference concepts by ID, and the
/// concept -> events back-reference lives in a separate adjacency index so
/// neither side owns the other.
#[derive(Debug, Clone)]
pub struct HyperGraph {
    /// All concepts stored by ID.
    concepts: HashMap<ConceptId, Concept>,

    /// Index: normalized name -> concept ID.
    concepts_by_name: HashMap<String, ConceptId>,

    /// All events stored by ID.
    events: HashMap<EventId, Event>,

    /// Index: concept ID -> events mentioning it.
    concept_events: HashMap<ConceptId, BTreeSet<EventId>>,

    lemmatizer: Arc<dyn Lemmatizer>,
}

impl HyperGraph {
    /// Create an empty graph using the default English lemmatizer.
    pub fn new() -> Self {
        Self::with_lemmatizer(Arc::new(SimpleLemmatizer::new()))
    }

    /// Create an empty graph that normalizes names and queries with `lemmatizer`.
    pub fn with_lemmatizer(lemmatizer: Arc<dyn Lemmatizer>) -> Self {
        Self {
            concepts: HashMap::new(),
            concepts_by_name: HashMap::new(),
            events: HashMap::new(),
            concept_events: HashMap::new(),
            lemmatizer,
        }
    }

    /// The normalization capability shared by indexing and querying.
    pub fn lemmatizer(&self) -> &Arc<dyn Lemmatizer> {
        &self.lemmatizer
    }

    /// Insert a concept unless an equivalent one is already stored.
    ///
    /// A stored concept with the candidate's ID wins first, then one with the
    /// same normalized name; only when neither exists is the candidate stored.
    /// Fields of a losing candidate are ignored. Returns the stored instance.
    /// A candidate with a non-finite state is rejected.
    pub fn insert_concept(&mut self, candidate: Concept) -> MemoryResult<&Concept> {
        if !candidate.state.is_finite() {
            return Err(MemoryError::non_finite("concept", &candidate.id, "state"));
        }
        Ok(self.store_concept(candidate))
    }

    fn store_concept(&mut self, mut candidate: Concept) -> &Concept {
        if self.concepts.contains_key(&candidate.id) {
            return &self.concepts[&candidate.id];
        }

        let key = self.lemmatizer.normalize_name(&candidate.name);
        if let Some(existing_id) = self.concepts_by_name.get(&key).cloned() {
            tracing::debug!(
                "Concept '{}' ({}) matches stored concept {} by name '{}'",
                candidate.name,
                candidate.id,
                existing_id,
                key
            );
            return &self.concepts[&existing_id];
        }

        candidate.normalized_name = key.clone();
        let id = candidate.id.clone();
        self.concepts_by_name.insert(key, id.clone());
        self.concepts.entry(id).or_insert(candidate)
    }

    /// Get or create the concept for a bare name.
    pub fn insert_concept_named(&mut self, name: &str) -> &Concept {
        self.store_concept(Concept::new(name))
    }

    /// Get concept by ID.
    pub fn get_concept_by_id(&self, id: &ConceptId) -> Option<&Concept> {
        self.concepts.get(id)
    }

    /// Get concept by name, after normalization.
    pub fn get_concept_by_name(&self, name: &str) -> Option<&Concept> {
        let key = self.lemmatizer.normalize_name(name);
        self.concept_by_normalized_name(&key)
    }

    pub(crate) fn concept_by_normalized_name(&self, key: &str) -> Option<&Concept> {
        self.concepts_by_name
            .get(key)
            .and_then(|id| self.concepts.get(id))
    }

    /// Check if a concept ID exists in the graph.
    pub fn contains_concept(&self, id: &ConceptId) -> bool {
        self.concepts.contains_key(id)
    }

    /// Replace a concept's state, returning the signed change.
    pub fn update_concept_state(&mut self, id: &ConceptId, new_state: f64) -> MemoryResult<f64> {
        if !new_state.is_finite() {
            return Err(MemoryError::non_finite("concept", id, "state"));
        }
        self.concepts
            .get_mut(id)
            .map(|concept| concept.update_state(new_state))
            .ok_or_else(|| MemoryError::concept_not_found(id))
    }

    /// Add an event and link it to the stored concepts it references.
    ///
    /// References that do not resolve are dropped from the event and reported
    /// as warnings; the event is still stored. Fails without touching the
    /// graph when the ID is already taken, the event references nothing, or a
    /// numeric property is not finite.
    pub fn insert_event(&mut self, event: Event) -> MemoryResult<InsertOutcome> {
        self.link_event(event, false)
    }

    /// Re-link an event read back from a snapshot. Unlike `insert_event`, an
    /// event whose references all dangled when it was first stored is accepted.
    pub(crate) fn restore_event(&mut self, event: Event) -> MemoryResult<InsertOutcome> {
        self.link_event(event, true)
    }

    fn link_event(&mut self, mut event: Event, allow_empty: bool) -> MemoryResult<InsertOutcome> {
        if event.concepts.is_empty() && !allow_empty {
            return Err(MemoryError::EmptyEvent {
                id: event.id.to_string(),
            });
        }
        if self.events.contains_key(&event.id) {
            return Err(MemoryError::duplicate_event(&event.id));
        }
        if let Some((key, _)) = event
            .properties
            .iter()
            .find(|(_, value)| value.as_f64().is_some_and(|n| !n.is_finite()))
        {
            return Err(MemoryError::non_finite("event", &event.id, key));
        }

        let mut seen = HashSet::new();
        let mut linked = Vec::with_capacity(event.concepts.len());
        let mut warnings = Vec::new();

        for concept_id in std::mem::take(&mut event.concepts) {
            if !seen.insert(concept_id.clone()) {
                continue;
            }
            if self.concepts.contains_key(&concept_id) {
                linked.push(concept_id);
            } else {
                tracing::warn!(
                    "Event {} references concept {} which was not found; link skipped",
                    event.id,
                    concept_id
                );
                warnings.push(LinkWarning::DanglingReference {
                    event_id: event.id.clone(),
                    concept_id,
                });
            }
        }

        for concept_id in &linked {
            self.concept_events
                .entry(concept_id.clone())
                .or_default()
                .insert(event.id.clone());
        }

        event.concepts = linked.clone();
        let event_id = event.id.clone();
        self.events.insert(event_id.clone(), event);

        Ok(InsertOutcome {
            event_id,
            linked,
            warnings,
        })
    }

    /// Get event by ID.
    pub fn get_event(&self, id: &EventId) -> Option<&Event> {
        self.events.get(id)
    }

    /// All events mentioning a concept, ordered by event ID.
    pub fn events_for_concept(&self, id: &ConceptId) -> Vec<&Event> {
        self.concept_events
            .get(id)
            .map(|ids| ids.iter().filter_map(|id| self.events.get(id)).collect())
            .unwrap_or_default()
    }

    /// The stored concepts an event is linked to, in reference order.
    pub fn event_concepts(&self, id: &EventId) -> Vec<&Concept> {
        self.events
            .get(id)
            .map(|event| {
                event
                    .concepts
                    .iter()
                    .filter_map(|cid| self.concepts.get(cid))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Concepts sharing at least one event with `id`, excluding itself.
    pub fn find_related_concepts(&self, id: &ConceptId) -> Vec<&Concept> {
        let related: BTreeSet<&ConceptId> = self
            .events_for_concept(id)
            .into_iter()
            .flat_map(|event| event.concepts.iter())
            .filter(|cid| *cid != id)
            .collect();

        let mut concepts: Vec<_> = related
            .into_iter()
            .filter_map(|cid| self.concepts.get(cid))
            .collect();
        sort_concepts(&mut concepts);
        concepts
    }

    /// Events linked to exactly the given set of concepts.
    pub fn events_by_concept_set(&self, ids: &[ConceptId]) -> Vec<&Event> {
        if ids.is_empty() || ids.iter().any(|id| !self.concepts.contains_key(id)) {
            return Vec::new();
        }

        let target: BTreeSet<&ConceptId> = ids.iter().collect();
        let mut events: Vec<_> = self
            .events
            .values()
            .filter(|event| event.concepts.iter().collect::<BTreeSet<_>>() == target)
            .collect();
        sort_events(&mut events);
        events
    }

    /// Concepts whose surface name contains `keyword`, case-insensitively.
    pub fn search_concepts_by_name(&self, keyword: &str) -> Vec<&Concept> {
        let keyword = keyword.to_lowercase();
        let mut concepts: Vec<_> = self
            .concepts
            .values()
            .filter(|concept| concept.name.to_lowercase().contains(&keyword))
            .collect();
        sort_concepts(&mut concepts);
        concepts
    }

    /// Events no older than `window` relative to `now`, newest first.
    pub fn recent_events(&self, window: Duration, now: DateTime<Utc>) -> Vec<&Event> {
        let mut events: Vec<_> = self
            .events
            .values()
            .filter(|event| now - event.timestamp <= window)
            .collect();
        sort_events(&mut events);
        events
    }

    /// Iterate over all concepts.
    pub fn concepts(&self) -> impl Iterator<Item = &Concept> {
        self.concepts.values()
    }

    /// Iterate over all events.
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.events.values()
    }

    pub fn concept_count(&self) -> usize {
        self.concepts.len()
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty() && self.events.is_empty()
    }
}

impl Default for HyperGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Order concepts by normalized name, then ID.
pub(crate) fn sort_concepts(concepts: &mut [&Concept]) {
    concepts.sort_by(|a, b| {
        a.normalized_name
            .cmp(&b.normalized_name)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Order events newest first, then by ID.
pub(crate) fn sort_events(events: &mut [&Event]) {
    events.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
    }

    fn fruit_graph() -> HyperGraph {
        let mut graph = HyperGraph::new();
        graph.insert_concept(Concept::with_id("c1", "apple").with_state(1.0)).unwrap();
        graph.insert_concept(Concept::with_id("c2", "banana").with_state(1.0)).unwrap();
        graph.insert_concept(Concept::with_id("c3", "orange").with_state(1.0)).unwrap();

        graph
            .insert_event(
                Event::new(["c1".into(), "c2".into()])
                    .with_id("e1")
                    .at(at(9))
                    .with_delta(0.1),
            )
            .unwrap();
        graph
            .insert_event(
                Event::new(["c2".into(), "c3".into()])
                    .with_id("e2")
                    .at(at(10))
                    .with_delta(0.2),
            )
            .unwrap();
        graph
    }

    #[test]
    fn test_insert_concept_is_idempotent() {
        let mut graph = HyperGraph::new();
        let concept = Concept::with_id("c1", "Paris");

        graph.insert_concept(concept.clone()).unwrap();
        graph.insert_concept(concept).unwrap();

        assert_eq!(graph.concept_count(), 1);
        assert_eq!(
            graph.get_concept_by_id(&"c1".into()).unwrap().normalized_name,
            "paris"
        );
    }

    #[test]
    fn test_id_wins_over_differing_fields() {
        let mut graph = HyperGraph::new();
        graph.insert_concept(Concept::with_id("c1", "Paris").with_state(2.0)).unwrap();

        let stored = graph.insert_concept(Concept::with_id("c1", "London").with_state(9.0)).unwrap();
        assert_eq!(stored.name, "Paris");
        assert_eq!(stored.state, 2.0);
        assert!(graph.get_concept_by_name("London").is_none());
    }

    #[test]
    fn test_same_normalized_name_returns_same_instance() {
        let mut graph = HyperGraph::new();
        graph.insert_concept(Concept::with_id("c1", "Runs").with_state(1.0)).unwrap();

        let stored = graph.insert_concept(Concept::with_id("c2", "running").with_state(5.0)).unwrap();
        assert_eq!(stored.id, ConceptId::from("c1"));
        assert_eq!(stored.state, 1.0);
        assert_eq!(graph.concept_count(), 1);
        assert!(graph.get_concept_by_id(&"c2".into()).is_none());

        let by_first = graph.get_concept_by_name("Runs").unwrap();
        let by_second = graph.get_concept_by_name("running").unwrap();
        assert!(std::ptr::eq(by_first, by_second));
    }

    #[test]
    fn test_lookup_by_name_is_case_insensitive() {
        let mut graph = HyperGraph::new();
        graph.insert_concept_named("Weather");

        assert!(graph.get_concept_by_name("WEATHER").is_some());
        assert!(graph.get_concept_by_name("weather").is_some());
        assert!(graph.get_concept_by_name("ocean").is_none());
    }

    #[test]
    fn test_insert_event_links_canonical_instances() {
        let graph = fruit_graph();
        let c2: ConceptId = "c2".into();
        let e1: EventId = "e1".into();

        let event_ids: Vec<_> = graph.events_for_concept(&c2).iter().map(|e| e.id.clone()).collect();
        assert_eq!(event_ids, vec![EventId::from("e1"), EventId::from("e2")]);

        let stored = graph.get_concept_by_id(&c2).unwrap();
        let linked = graph.event_concepts(&e1);
        assert!(linked.iter().any(|c| std::ptr::eq(*c, stored)));
    }

    #[test]
    fn test_dangling_reference_is_a_warning() {
        let mut graph = HyperGraph::new();
        graph.insert_concept(Concept::with_id("c1", "Paris")).unwrap();

        let outcome = graph
            .insert_event(Event::new(["c1".into(), "ghost".into()]).with_id("e1"))
            .unwrap();

        assert!(!outcome.is_fully_linked());
        assert_eq!(outcome.linked, vec![ConceptId::from("c1")]);
        assert_eq!(
            outcome.warnings,
            vec![LinkWarning::DanglingReference {
                event_id: "e1".into(),
                concept_id: "ghost".into(),
            }]
        );

        let stored = graph.get_event(&"e1".into()).unwrap();
        assert_eq!(stored.concepts, vec![ConceptId::from("c1")]);
        assert!(graph.events_for_concept(&"ghost".into()).is_empty());
    }

    #[test]
    fn test_event_with_only_dangling_references_is_stored() {
        let mut graph = HyperGraph::new();
        let outcome = graph
            .insert_event(Event::new(["ghost".into()]).with_id("e1"))
            .unwrap();

        assert!(outcome.linked.is_empty());
        assert_eq!(graph.event_count(), 1);
    }

    #[test]
    fn test_duplicate_event_id_leaves_graph_untouched() {
        let mut graph = fruit_graph();

        let result = graph.insert_event(
            Event::new(["c3".into()])
                .with_id("e1")
                .with_delta(9.0),
        );
        assert!(matches!(result, Err(MemoryError::DuplicateId { .. })));

        let e1 = graph.get_event(&"e1".into()).unwrap();
        assert_eq!(e1.delta(), Some(0.1));
        assert_eq!(e1.concepts, vec![ConceptId::from("c1"), ConceptId::from("c2")]);

        let c3_events: Vec<_> = graph.events_for_concept(&"c3".into()).iter().map(|e| e.id.clone()).collect();
        assert_eq!(c3_events, vec![EventId::from("e2")]);
        assert_eq!(graph.event_count(), 2);
    }

    #[test]
    fn test_empty_event_is_rejected() {
        let mut graph = HyperGraph::new();
        let result = graph.insert_event(Event::new(Vec::new()).with_id("e1"));
        assert!(matches!(result, Err(MemoryError::EmptyEvent { .. })));
        assert_eq!(graph.event_count(), 0);
    }

    #[test]
    fn test_repeated_references_link_once() {
        let mut graph = HyperGraph::new();
        graph.insert_concept(Concept::with_id("c1", "Paris")).unwrap();

        let outcome = graph
            .insert_event(Event::new(["c1".into(), "c1".into()]).with_id("e1"))
            .unwrap();
        assert_eq!(outcome.linked, vec![ConceptId::from("c1")]);
    }

    #[test]
    fn test_find_related_concepts() {
        let graph = fruit_graph();

        let related: Vec<_> = graph
            .find_related_concepts(&"c2".into())
            .iter()
            .map(|c| c.name.clone())
            .collect();
        assert_eq!(related, vec!["apple", "orange"]);

        assert!(graph.find_related_concepts(&"missing".into()).is_empty());
    }

    #[test]
    fn test_events_by_concept_set() {
        let graph = fruit_graph();

        let exact = graph.events_by_concept_set(&["c2".into(), "c1".into()]);
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].id, EventId::from("e1"));

        assert!(graph.events_by_concept_set(&["c1".into()]).is_empty());
        assert!(graph.events_by_concept_set(&["c1".into(), "missing".into()]).is_empty());
    }

    #[test]
    fn test_search_concepts_by_name() {
        let graph = fruit_graph();
        let found = graph.search_concepts_by_name("AN");
        let names: Vec<_> = found.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["banana", "orange"]);
    }

    #[test]
    fn test_recent_events_newest_first() {
        let graph = fruit_graph();

        let recent = graph.recent_events(Duration::minutes(90), at(11));
        let ids: Vec<_> = recent.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["e2"]);

        let all = graph.recent_events(Duration::hours(3), at(11));
        let ids: Vec<_> = all.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["e2", "e1"]);
    }

    #[test]
    fn test_update_concept_state() {
        let mut graph = fruit_graph();

        let delta = graph.update_concept_state(&"c1".into(), 1.5).unwrap();
        assert!((delta - 0.5).abs() < 1e-9);
        assert_eq!(graph.get_concept_by_id(&"c1".into()).unwrap().state, 1.5);

        let err = graph.update_concept_state(&"missing".into(), 1.0).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_non_finite_values_are_rejected() {
        let mut graph = fruit_graph();

        let err = graph
            .insert_concept(Concept::with_id("c9", "kiwi").with_state(f64::NAN))
            .unwrap_err();
        assert!(matches!(err, MemoryError::NonFiniteValue { kind: "concept", .. }));
        assert!(graph.get_concept_by_name("kiwi").is_none());

        assert!(graph.update_concept_state(&"c1".into(), f64::INFINITY).is_err());
        assert_eq!(graph.get_concept_by_id(&"c1".into()).unwrap().state, 1.0);

        let err = graph
            .insert_event(
                Event::new(["c1".into()])
                    .with_id("e3")
                    .with_property("delta", f64::NEG_INFINITY),
            )
            .unwrap_err();
        assert!(matches!(err, MemoryError::NonFiniteValue { kind: "event", .. }));
        assert!(graph.get_event(&"e3".into()).is_none());
        assert_eq!(graph.events_for_concept(&"c1".into()).len(), 1);
    }

    #[test]
    fn test_names_differing_by_number_stay_distinct() {
        let mut graph = HyperGraph::new();
        graph.insert_concept(Concept::with_id("a11", "Apollo 11")).unwrap();
        let stored = graph.insert_concept(Concept::with_id("a13", "Apollo 13")).unwrap();

        assert_eq!(stored.id, ConceptId::from("a13"));
        assert_eq!(graph.concept_count(), 2);
        assert_eq!(
            graph.get_concept_by_name("apollo 11").unwrap().id,
            ConceptId::from("a11")
        );
    }
}
