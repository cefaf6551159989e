//! Effective watch settings from the config file and command-line flags

use anyhow::{Context, Result};
use reload_watcher::WatchConfig;
use std::path::Path;

/// Load settings from `config_path` (or defaults) and apply flag overrides
///
/// Flags win over the file. The result is validated.
pub fn resolve(config_path: Option<&Path>, debounce_ms: Option<u64>) -> Result<WatchConfig> {
    let mut config = match config_path {
        Some(path) => WatchConfig::load(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => WatchConfig::default(),
    };

    if let Some(debounce_ms) = debounce_ms {
        config.debounce_ms = debounce_ms;
    }

    config.validate().context("Invalid settings")?;
    Ok(config)
}
