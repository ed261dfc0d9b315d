//! # Memory Core
//!
//! A queryable memory of concepts and events extracted from conversation,
//! used to ground each new turn of a language-model agent.
//!
//! ## Core Components
//!
//! - **knowledge_base**: the hypergraph store, keyword retrieval and batch ingestion
//! - **persistence**: JSON checkpoints of the store
//! - **context_assembler**: merges query matches and recent events into a bounded context
//! - **memory**: a single owner wiring the three together
//!
//! ## Design Philosophy
//!
//! - **Single owner**: the store is a plain in-memory structure with no internal locking
//! - **Identity first**: one concept per ID and per normalized name, always
//! - **Best-effort persistence**: a missing checkpoint means an empty store, not a failure

pub mod config;
pub mod context_assembler;
pub mod error;
pub mod knowledge_base;
pub mod memory;
pub mod persistence;

pub use config::*;
pub use context_assembler::*;
pub use error::*;
pub use knowledge_base::*;
pub use memory::*;

pub use memory_model::{
    Concept, ConceptId, Event, EventId, Lemmatizer, PropertyValue, SimpleLemmatizer,
};
