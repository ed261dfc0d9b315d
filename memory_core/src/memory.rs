//! Memory - one owner for the graph, its checkpoint and context assembly.

use std::path::PathBuf;

use crate::config::MemoryConfig;
use crate::context_assembler::{AssembledContext, ContextAssembler};
use crate::error::MemoryResult;
use crate::knowledge_base::{integrate, ExtractionBatch, HyperGraph, IngestReport};
use crate::persistence;

/// Ties the hypergraph to its checkpoint file and the context assembler.
///
/// Not synchronized: callers sharing a `Memory` across threads must wrap it
/// in their own lock.
pub struct Memory {
    graph: HyperGraph,
    assembler: ContextAssembler,
    store_path: Option<PathBuf>,
}

impl Memory {
    /// Open a memory, restoring the graph from `store_path` when one is
    /// configured. A missing or unreadable checkpoint starts an empty graph.
    pub fn open(config: &MemoryConfig) -> MemoryResult<Self> {
        let lemmatizer = config.build_lemmatizer();
        let assembler = ContextAssembler::new(config.assembler_config()?);

        let graph = match &config.store_path {
            Some(path) => persistence::load_or_default(path, lemmatizer),
            None => HyperGraph::with_lemmatizer(lemmatizer),
        };

        Ok(Self {
            graph,
            assembler,
            store_path: config.store_path.clone(),
        })
    }

    /// A memory with default settings and no checkpoint file.
    pub fn in_memory() -> Self {
        Self {
            graph: HyperGraph::new(),
            assembler: ContextAssembler::with_defaults(),
            store_path: None,
        }
    }

    pub fn graph(&self) -> &HyperGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut HyperGraph {
        &mut self.graph
    }

    /// Integrate one extraction batch.
    pub fn ingest(&mut self, batch: ExtractionBatch) -> IngestReport {
        integrate(&mut self.graph, batch)
    }

    /// Assemble the context for a query.
    pub fn context_for(&self, query: &str) -> AssembledContext {
        self.assembler.assemble(&self.graph, query)
    }

    /// Context for `user_message` followed by the message itself.
    pub fn prompt_for(&self, user_message: &str) -> String {
        self.context_for(user_message).inject(user_message)
    }

    /// Save the graph to the configured path. Returns `false` when there is
    /// nowhere to save.
    pub fn checkpoint(&self) -> MemoryResult<bool> {
        match &self.store_path {
            Some(path) => {
                persistence::save_to_path(&self.graph, path)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
