//! General application configuration.

use serde::{Deserialize, Serialize};

const fn default_limit() -> u32 {
    GeneralConfig::DEFAULT_LIMIT
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneralConfig {
    /// Default result limit for list queries.
    #[serde(default = "default_limit")]
    pub default_limit: u32,
}

impl GeneralConfig {
    /// Result limit applied when neither config nor filter set one.
    pub const DEFAULT_LIMIT: u32 = 20;
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_limit: Self::DEFAULT_LIMIT,
        }
    }
}
