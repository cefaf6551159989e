//! Show effective settings
//!
//! Prints the settings `watch` would use with the same flags.

use crate::settings;
use anyhow::Result;
use owo_colors::OwoColorize;
use reload_watcher::config::{DEFAULT_DEBOUNCE_MS, MAX_DEBOUNCE_MS, MIN_DEBOUNCE_MS};
use std::path::Path;

/// List effective configuration values
pub async fn run_list(config_path: Option<&Path>, debounce_ms: Option<u64>) -> Result<()> {
    let config = settings::resolve(config_path, debounce_ms)?;

    println!("{}", "Watch Configuration".bold());
    match config_path {
        Some(path) => println!("{}: {}\n", "Location".dimmed(), path.display().dimmed()),
        None => println!("{}: {}\n", "Location".dimmed(), "(built-in defaults)".dimmed()),
    }

    println!(
        "  {} = {} {}",
        "debounce_ms".cyan(),
        config.debounce_ms,
        format!("({:?})", config.debounce_window()).dimmed()
    );

    println!("\n{}", "Valid Ranges:".bold());
    println!(
        "  debounce_ms: {}-{} (default {})",
        MIN_DEBOUNCE_MS, MAX_DEBOUNCE_MS, DEFAULT_DEBOUNCE_MS
    );

    Ok(())
}

/// Show example configuration
pub async fn run_example() -> Result<()> {
    println!("{}", example_config());
    Ok(())
}

fn example_config() -> String {
    format!(
        "# reloadwatch settings\n\
         \n\
         # Quiet period after the last change before the reload command runs\n\
         debounce_ms = {}\n",
        DEFAULT_DEBOUNCE_MS
    )
}
