//! Knowledge Base module - the hypergraph memory.
//!
//! The knowledge base consists of:
//! - **Concepts**: named nodes, unique by ID and by normalized name
//! - **Events**: timestamped hyperedges linking one or more concepts
//! - **Back-references**: an index from each concept to the events mentioning it

mod graph;
mod ingest;
mod retrieval;

pub use graph::*;
pub use ingest::*;
pub use retrieval::*;

pub(crate) use graph::{sort_concepts, sort_events};
