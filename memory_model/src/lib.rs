//! # Memory Model
//!
//! Leaf data types for the hypergraph memory: concepts (named nodes with a
//! scalar state), events (hyperedges over concepts carrying a property payload)
//! and the lemmatization capability used to derive a concept's normalized name.
//! This crate holds no storage logic; `memory_core` owns the graph.

pub mod entities;
pub mod lexicon;

pub use entities::*;
pub use lexicon::*;
