//! Persistence - saving and restoring the hypergraph as a JSON document.
//!
//! The document holds two flat collections, `concepts` and `events`; events
//! carry concept IDs only, so the concept <-> event cycle never reaches the
//! encoding. Restoring stores every concept first and then re-links each event
//! through the normal insertion path, rebuilding the back-reference index from
//! the stored instances.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use memory_model::{Concept, ConceptId, Event, EventId, Lemmatizer, PropertyValue};

use crate::error::{MemoryError, MemoryResult};
use crate::knowledge_base::HyperGraph;

/// Durable form of a concept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptRecord {
    pub id: ConceptId,
    pub name: String,
    #[serde(default)]
    pub normalized_name: String,
    pub state: f64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// Durable form of an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: EventId,
    pub timestamp: DateTime<Utc>,
    pub concept_ids: Vec<ConceptId>,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
}

/// The whole graph as plain records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub concepts: Vec<ConceptRecord>,
    #[serde(default)]
    pub events: Vec<EventRecord>,
}

impl GraphSnapshot {
    /// Capture the graph. Records are sorted by ID so equal graphs encode equally.
    pub fn capture(graph: &HyperGraph) -> Self {
        let mut concepts: Vec<_> = graph
            .concepts()
            .map(|concept| ConceptRecord {
                id: concept.id.clone(),
                name: concept.name.clone(),
                normalized_name: concept.normalized_name.clone(),
                state: concept.state,
                metadata: concept.metadata.clone(),
            })
            .collect();
        concepts.sort_by(|a, b| a.id.cmp(&b.id));

        let mut events: Vec<_> = graph
            .events()
            .map(|event| EventRecord {
                id: event.id.clone(),
                timestamp: event.timestamp,
                concept_ids: event.concepts.clone(),
                properties: event.properties.clone(),
            })
            .collect();
        events.sort_by(|a, b| a.id.cmp(&b.id));

        Self { concepts, events }
    }

    /// Rebuild a graph from the records.
    ///
    /// Normalized names are recomputed with `lemmatizer` rather than trusted.
    /// A repeated event ID fails the whole restore; no partial graph escapes.
    pub fn restore(self, lemmatizer: Arc<dyn Lemmatizer>) -> MemoryResult<HyperGraph> {
        let mut graph = HyperGraph::with_lemmatizer(lemmatizer);
        // Concepts that collapsed onto another record -> the stored ID.
        let mut canonical: HashMap<ConceptId, ConceptId> = HashMap::new();

        for record in self.concepts {
            let recorded_key = record.normalized_name;
            let mut concept = Concept::with_id(record.id, record.name).with_state(record.state);
            concept.metadata = record.metadata;
            let requested = concept.id.clone();

            let stored = graph.insert_concept(concept)?;
            if stored.id != requested {
                tracing::warn!(
                    "Concept {} collapsed onto {} while restoring (same normalized name '{}'); relinking its events",
                    requested,
                    stored.id,
                    stored.normalized_name
                );
                canonical.insert(requested, stored.id.clone());
            } else if !recorded_key.is_empty() && recorded_key != stored.normalized_name {
                tracing::debug!(
                    "Concept {} re-normalized from '{}' to '{}'",
                    stored.id,
                    recorded_key,
                    stored.normalized_name
                );
            }
        }

        for record in self.events {
            let concept_ids = record
                .concept_ids
                .into_iter()
                .map(|id| canonical.get(&id).cloned().unwrap_or(id));
            let mut event = Event::new(concept_ids)
                .with_id(record.id)
                .at(record.timestamp);
            event.properties = record.properties;
            graph.restore_event(event)?;
        }

        Ok(graph)
    }
}

/// Encode the graph as pretty-printed JSON.
pub fn save_to_string(graph: &HyperGraph) -> MemoryResult<String> {
    Ok(serde_json::to_string_pretty(&GraphSnapshot::capture(graph))?)
}

/// Decode a graph from JSON.
pub fn load_from_str(document: &str, lemmatizer: Arc<dyn Lemmatizer>) -> MemoryResult<HyperGraph> {
    let snapshot: GraphSnapshot = serde_json::from_str(document)?;
    snapshot.restore(lemmatizer)
}

/// Write the graph to `path`, creating parent directories.
///
/// The document is written to a sibling temporary file and renamed into
/// place, so readers see either the old or the new checkpoint.
pub fn save_to_path(graph: &HyperGraph, path: impl AsRef<Path>) -> MemoryResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let document = save_to_string(graph)?;
    let staging = staging_path(path);
    if let Err(e) = fs::write(&staging, document).and_then(|()| fs::rename(&staging, path)) {
        if let Err(cleanup) = fs::remove_file(&staging) {
            tracing::debug!("Could not remove {}: {}", staging.display(), cleanup);
        }
        return Err(e.into());
    }

    tracing::info!(
        "Saved graph ({} concepts, {} events) to {}",
        graph.concept_count(),
        graph.event_count(),
        path.display()
    );
    Ok(())
}

/// Read a graph from `path`.
///
/// A missing or unreadable file is reported as `PersistenceUnavailable`.
pub fn load_from_path(path: impl AsRef<Path>, lemmatizer: Arc<dyn Lemmatizer>) -> MemoryResult<HyperGraph> {
    let path = path.as_ref();
    let document = fs::read_to_string(path).map_err(|source| MemoryError::PersistenceUnavailable {
        path: path.to_path_buf(),
        source,
    })?;

    let graph = load_from_str(&document, lemmatizer)?;
    tracing::info!(
        "Loaded graph ({} concepts, {} events) from {}",
        graph.concept_count(),
        graph.event_count(),
        path.display()
    );
    Ok(graph)
}

/// Read a graph from `path`, falling back to a fresh empty graph on any failure.
pub fn load_or_default(path: impl AsRef<Path>, lemmatizer: Arc<dyn Lemmatizer>) -> HyperGraph {
    let path = path.as_ref();
    match load_from_path(path, lemmatizer.clone()) {
        Ok(graph) => graph,
        Err(MemoryError::PersistenceUnavailable { source, .. }) => {
            tracing::info!("No saved graph at {} ({}); starting empty", path.display(), source);
            HyperGraph::with_lemmatizer(lemmatizer)
        }
        Err(e) => {
            tracing::warn!("Could not load graph from {}: {}; starting empty", path.display(), e);
            HyperGraph::with_lemmatizer(lemmatizer)
        }
    }
}

/// Delete a saved graph. Returns whether a file was removed.
pub fn delete_snapshot(path: impl AsRef<Path>) -> MemoryResult<bool> {
    let path = path.as_ref();
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!("No saved graph to delete at {}", path.display());
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
