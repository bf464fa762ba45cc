//! Database location configuration.

use serde::{Deserialize, Serialize};

fn default_path() -> String {
    ".thesia/thesia.db".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Path to the libSQL database file, or `":memory:"` for an ephemeral
    /// database (tests).
    #[serde(default = "default_path")]
    pub path: String,
}

impl DatabaseConfig {
    /// Whether the configured database is in-memory.
    #[must_use]
    pub fn is_memory(&self) -> bool {
        self.path == ":memory:"
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
        }
    }
}
