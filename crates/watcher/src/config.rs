//! Watch settings
//!
//! Loaded from a small TOML file:
//!
//! ```toml
//! debounce_ms = 250
//! ```

use crate::error::WatchError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default debounce window in milliseconds
pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

/// Smallest accepted debounce window in milliseconds
pub const MIN_DEBOUNCE_MS: u64 = 1;

/// Largest accepted debounce window in milliseconds
pub const MAX_DEBOUNCE_MS: u64 = 60_000;

/// Settings for a watch session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchConfig {
    /// Quiet period after the last change before reloading (default: 100ms)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

impl WatchConfig {
    /// Settings with the given debounce window
    pub fn with_debounce(window: Duration) -> Self {
        Self {
            debounce_ms: window.as_millis().min(u64::MAX as u128) as u64,
        }
    }

    /// Parse and validate settings from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, WatchError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a settings file
    pub fn load(path: &Path) -> Result<Self, WatchError> {
        let text = std::fs::read_to_string(path).map_err(|source| WatchError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Check every value against its valid range
    pub fn validate(&self) -> Result<(), WatchError> {
        if !(MIN_DEBOUNCE_MS..=MAX_DEBOUNCE_MS).contains(&self.debounce_ms) {
            return Err(WatchError::InvalidConfig {
                field: "debounce_ms",
                message: format!(
                    "{} is outside {}-{}",
                    self.debounce_ms, MIN_DEBOUNCE_MS, MAX_DEBOUNCE_MS
                ),
            });
        }
        Ok(())
    }

    /// Debounce window as a [`Duration`]
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
