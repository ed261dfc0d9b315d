//! Where the concepts in an assembled context came from.

use serde::{Deserialize, Serialize};

/// Provenance of the concept list in an assembled context.
///
/// The prompt layer reads the heading to judge how relevant the listed
/// concepts are, so each case gets its own wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContextProvenance {
    /// Nothing matched the query and nothing happened recently.
    Neither,
    /// Only the query matched.
    QueryOnly,
    /// Only recent events contributed.
    RecentOnly,
    /// Both the query and recent events contributed.
    Both,
}

impl ContextProvenance {
    pub fn from_sources(query_matched: bool, recent_activity: bool) -> Self {
        match (query_matched, recent_activity) {
            (true, true) => ContextProvenance::Both,
            (true, false) => ContextProvenance::QueryOnly,
            (false, true) => ContextProvenance::RecentOnly,
            (false, false) => ContextProvenance::Neither,
        }
    }

    /// Heading line placed above the concept list.
    pub fn heading(&self) -> &'static str {
        match self {
            ContextProvenance::Both => "Concepts related to the query and to recent events:",
            ContextProvenance::QueryOnly => "Concepts related to the query:",
            ContextProvenance::RecentOnly => "Concepts from recent events:",
            ContextProvenance::Neither => "No concepts related to the query or to recent events.",
        }
    }

    pub fn includes_query(&self) -> bool {
        matches!(self, ContextProvenance::QueryOnly | ContextProvenance::Both)
    }

    pub fn includes_recent(&self) -> bool {
        matches!(self, ContextProvenance::RecentOnly | ContextProvenance::Both)
    }
}

impl std::fmt::Display for ContextProvenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.heading())
    }
}
