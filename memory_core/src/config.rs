//! Configuration for the hypergraph memory.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use memory_model::{Lemmatizer, SimpleLemmatizer};

use crate::context_assembler::AssemblerConfig;
use crate::error::{MemoryError, MemoryResult};

/// Settings for a `Memory`, loadable from TOML or JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Where the graph is checkpointed. `None` keeps it in memory only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_path: Option<PathBuf>,

    /// Events this many minutes old or newer count as recent. `0` (or JSON
    /// `null`) turns recency off, since TOML cannot express a missing value
    /// over the default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_window_minutes: Option<u64>,

    pub max_context_concepts: usize,

    pub max_context_events: usize,

    /// Stop words added to the default English list.
    pub extra_stop_words: Vec<String>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        let assembler = AssemblerConfig::default();
        Self {
            store_path: None,
            recent_window_minutes: Some(10),
            max_context_concepts: assembler.max_concepts,
            max_context_events: assembler.max_events,
            extra_stop_words: Vec::new(),
        }
    }
}

impl MemoryConfig {
    /// Load configuration from a file (TOML or JSON).
    pub fn from_file(path: impl AsRef<Path>) -> MemoryResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        let config: Self = match ext {
            Some("toml") => Self::from_toml_str(&content)?,
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| MemoryError::Configuration(e.to_string()))?,
            _ => {
                return Err(MemoryError::Configuration(
                    "Unsupported config file format. Use .toml or .json".to_string(),
                ))
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> MemoryResult<Self> {
        toml::from_str(content).map_err(|e| MemoryError::Configuration(e.to_string()))
    }

    /// Set the checkpoint location.
    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = Some(path.into());
        self
    }

    /// Check that the values can be turned into runtime settings.
    pub fn validate(&self) -> MemoryResult<()> {
        self.recent_window().map(|_| ())
    }

    /// The recent window as a duration, `None` when recency is off.
    pub fn recent_window(&self) -> MemoryResult<Option<Duration>> {
        self.recent_window_minutes
            .filter(|minutes| *minutes > 0)
            .map(|minutes| {
                i64::try_from(minutes)
                    .ok()
                    .and_then(Duration::try_minutes)
                    .ok_or_else(|| {
                        MemoryError::Configuration(format!(
                            "recent_window_minutes out of range: {}",
                            minutes
                        ))
                    })
            })
            .transpose()
    }

    /// Build the lemmatizer shared by the graph and the assembler.
    pub fn build_lemmatizer(&self) -> Arc<dyn Lemmatizer> {
        Arc::new(SimpleLemmatizer::new().with_extra_stop_words(&self.extra_stop_words))
    }

    pub fn assembler_config(&self) -> MemoryResult<AssemblerConfig> {
        Ok(AssemblerConfig {
            recent_window: self.recent_window()?,
            max_concepts: self.max_context_concepts,
            max_events: self.max_context_events,
        })
    }
}
