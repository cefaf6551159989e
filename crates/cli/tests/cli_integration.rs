//! Integration tests for the reloadwatch binary

mod common;

use anyhow::Result;
use common::cli::wait_until;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn config_shows_defaults() -> Result<()> {
    let dir = TempDir::new()?;

    let result = rw!(dir.path(), "config").assert_success()?;
    assert!(result.contains_stdout("debounce_ms"));
    assert!(result.contains_stdout("100"));
    assert!(result.contains_stdout("built-in defaults"));

    Ok(())
}

#[test]
fn config_reads_settings_file() -> Result<()> {
    let dir = TempDir::new()?;
    fs::write(dir.path().join("reloadwatch.toml"), "debounce_ms = 250\n")?;

    let result = rw!(dir.path(), "config", "--config", "reloadwatch.toml").assert_success()?;
    assert!(result.contains_stdout("250"));

    let result = rw!(dir.path(), "config", "--config", "reloadwatch.toml", "--debounce-ms", "75")
        .assert_success()?;
    assert!(result.contains_stdout("75"));

    Ok(())
}

#[test]
fn config_example_is_valid_toml() -> Result<()> {
    let dir = TempDir::new()?;

    let result = rw!(dir.path(), "config", "--example").assert_success()?;
    fs::write(dir.path().join("example.toml"), &result.stdout)?;

    rw!(dir.path(), "config", "--config", "example.toml").assert_success()?;
    Ok(())
}

#[test]
fn invalid_debounce_is_rejected() -> Result<()> {
    let dir = TempDir::new()?;

    let result = rw!(dir.path(), "config", "--debounce-ms", "0").assert_failure()?;
    assert!(result.contains_stderr("debounce_ms"));

    Ok(())
}

#[test]
fn watch_requires_a_command() -> Result<()> {
    let dir = TempDir::new()?;
    fs::write(dir.path().join("app.toml"), "port = 1\n")?;

    rw!(dir.path(), "watch", "app.toml").assert_failure()?;
    Ok(())
}

#[test]
fn watch_missing_directory_fails_at_setup() -> Result<()> {
    let dir = TempDir::new()?;

    let result = rw!(dir.path(), "watch", "no/such/dir/app.toml", "--", "true").assert_failure()?;
    assert!(result.contains_stderr("Failed to watch"));

    Ok(())
}

#[cfg(unix)]
#[test]
fn watch_runs_command_after_change() -> Result<()> {
    let dir = TempDir::new()?;
    let config = dir.path().join("app.toml");
    let marker = dir.path().join("reloaded.log");
    fs::write(&config, "port = 1\n")?;

    let mut child = rw!(
        dir.path(),
        "watch",
        "app.toml",
        "--debounce-ms",
        "20",
        "--",
        "sh",
        "-c",
        "echo reloaded >> reloaded.log"
    )
    .spawn()?;

    // Keep touching the file until the watcher is up and has reacted
    let reloaded = wait_until(Duration::from_secs(10), || {
        let _ = fs::write(&config, "port = 2\n");
        std::thread::sleep(Duration::from_millis(100));
        marker.exists()
    });

    child.kill()?;
    child.wait()?;

    assert!(reloaded, "reload command never ran");
    Ok(())
}
