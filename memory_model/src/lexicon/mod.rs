//! Lemmatization capability shared by indexing and querying.
//!
//! The store and the context assembler both hold the same `Lemmatizer`
//! instance; using one normalization for names and for queries is what keeps
//! keyword retrieval from silently missing concepts.

mod simple;

pub use simple::*;

use std::fmt;

/// Turns free text into a sequence of normalized tokens.
pub trait Lemmatizer: Send + Sync + fmt::Debug {
    /// Tokenize and normalize `text`. Filtered tokens such as stop words are
    /// dropped.
    fn normalize(&self, text: &str) -> Vec<String>;

    /// Normalized form of a concept name: its tokens joined by a single space,
    /// or the trimmed lowercase name when every token was filtered out.
    fn normalize_name(&self, name: &str) -> String {
        let tokens = self.normalize(name);
        if tokens.is_empty() {
            name.trim().to_lowercase()
        } else {
            tokens.join(" ")
        }
    }
}
