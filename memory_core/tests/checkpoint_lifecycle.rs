use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use memory_core::persistence::{delete_snapshot, load_from_path, load_or_default, save_to_path};
use memory_core::{
    Concept, ConceptId, ContextAssembler, ContextProvenance, Event, EventId, ExtractedConcept,
    ExtractedEvent, ExtractionBatch, HyperGraph, Memory, MemoryConfig, MemoryError,
    SimpleLemmatizer,
};

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, hour, minute, 0).unwrap()
}

fn travel_graph() -> HyperGraph {
    let mut graph = HyperGraph::new();
    graph.insert_concept(Concept::with_id("c1", "Paris").with_state(0.5)).unwrap();
    graph.insert_concept(Concept::with_id("c2", "weather").with_state(-0.25)).unwrap();
    graph.insert_concept(Concept::with_id("c3", "train tickets")).unwrap();

    graph
        .insert_event(
            Event::new(["c1".into(), "c2".into()])
                .with_id("e1")
                .at(at(9, 0))
                .with_delta(0.3),
        )
        .unwrap();
    graph
        .insert_event(
            Event::new(["c1".into(), "c3".into(), "ghost".into()])
                .with_id("e2")
                .at(at(9, 55))
                .with_property("booked", true),
        )
        .unwrap();
    graph
}

type Linkage = BTreeSet<(String, Vec<String>)>;

fn linkage(graph: &HyperGraph) -> Linkage {
    graph
        .events()
        .map(|event| {
            let mut ids: Vec<String> = graph
                .event_concepts(&event.id)
                .into_iter()
                .map(|concept| concept.id.to_string())
                .collect();
            ids.sort();
            (event.id.to_string(), ids)
        })
        .collect()
}

#[test]
fn test_checkpoint_round_trip_preserves_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("graph.json");
    let original = travel_graph();

    save_to_path(&original, &path).unwrap();
    let restored = load_from_path(&path, Arc::new(SimpleLemmatizer::new())).unwrap();

    assert_eq!(restored.concept_count(), original.concept_count());
    for concept in original.concepts() {
        let twin = restored.get_concept_by_id(&concept.id).unwrap();
        assert_eq!(twin.name, concept.name);
        assert_eq!(twin.state, concept.state);
    }

    assert_eq!(restored.event_count(), original.event_count());
    for event in original.events() {
        let twin = restored.get_event(&event.id).unwrap();
        assert_eq!(twin.timestamp, event.timestamp);
        assert_eq!(twin.properties, event.properties);
    }
    assert_eq!(linkage(&restored), linkage(&original));

    // The dangling reference is not resurrected by a reload.
    let e2 = restored.get_event(&EventId::from("e2")).unwrap();
    assert!(!e2.involves(&ConceptId::from("ghost")));
}

#[test]
fn test_restored_store_answers_queries() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graph.json");
    save_to_path(&travel_graph(), &path).unwrap();

    let graph = load_or_default(&path, Arc::new(SimpleLemmatizer::new()));
    let knowledge = graph.retrieve_knowledge("weather in Paris");
    let concept_ids: Vec<&str> = knowledge.concept_ids().into_iter().map(|id| id.as_str()).collect();
    let event_ids: Vec<&str> = knowledge.event_ids().into_iter().map(|id| id.as_str()).collect();
    assert_eq!(concept_ids, vec!["c1", "c2"]);
    assert_eq!(event_ids, vec!["e2", "e1"]);

    assert!(graph.retrieve_knowledge("ocean").is_empty());

    let paris = graph.get_concept_by_name("  PARIS ").unwrap();
    assert!(std::ptr::eq(paris, graph.get_concept_by_id(&"c1".into()).unwrap()));
}

#[test]
fn test_context_from_restored_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graph.json");
    save_to_path(&travel_graph(), &path).unwrap();
    let graph = load_from_path(&path, Arc::new(SimpleLemmatizer::new())).unwrap();

    let assembler = ContextAssembler::with_defaults();
    let now = at(10, 0);

    let context = assembler.assemble_at(&graph, "weather", Some(Duration::minutes(10)), now);
    assert_eq!(context.provenance, ContextProvenance::Both);
    let names: Vec<&str> = context.concepts.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Paris", "train tickets", "weather"]);

    let context = assembler.assemble_at(&graph, "ocean", Some(Duration::minutes(1)), now);
    assert_eq!(context.provenance, ContextProvenance::Neither);
    assert!(context.is_empty());
}

#[test]
fn test_missing_and_corrupt_checkpoints() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.json");

    let err = load_from_path(&missing, Arc::new(SimpleLemmatizer::new())).unwrap_err();
    assert!(matches!(err, MemoryError::PersistenceUnavailable { .. }));
    assert!(load_or_default(&missing, Arc::new(SimpleLemmatizer::new())).is_empty());

    let corrupt = dir.path().join("corrupt.json");
    std::fs::write(&corrupt, "{\"concepts\": [").unwrap();
    assert!(load_or_default(&corrupt, Arc::new(SimpleLemmatizer::new())).is_empty());

    assert!(delete_snapshot(&corrupt).unwrap());
    assert!(!delete_snapshot(&corrupt).unwrap());
}

#[test]
fn test_memory_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = MemoryConfig {
        extra_stop_words: vec!["tell".to_string()],
        ..MemoryConfig::default()
    }
    .with_store_path(dir.path().join("memory.json"));

    {
        let mut memory = Memory::open(&config).unwrap();
        let report = memory.ingest(ExtractionBatch {
            concepts: vec![
                ExtractedConcept::new("Project Apollo").with_id("p1"),
                ExtractedConcept::new("deadline").with_state(0.9),
            ],
            events: vec![ExtractedEvent::new(["p1", "deadline"]).with_id("e1")],
        });
        assert!(report.is_clean());
        assert_eq!(report.concepts_added, 2);
        memory.checkpoint().unwrap();
    }

    let memory = Memory::open(&config).unwrap();
    let deadline = memory.graph().get_concept_by_name("Deadline").unwrap();
    assert_eq!(memory.graph().find_related_concepts(&deadline.id).len(), 1);

    let prompt = memory.prompt_for("tell me about project apollo");
    assert!(prompt.contains("- Project Apollo (state 0.00)"));
    assert!(prompt.contains("- deadline (state 0.90)"));
    assert!(prompt.ends_with("\n\nUser Query: tell me about project apollo"));
}
