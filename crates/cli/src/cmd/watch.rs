//! Watch a file and run a command after each burst of changes

use crate::command::CommandReload;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use reload_watcher::{
    CancellationToken, Reload, SessionState, WatchConfig, WatchHandle, WatchStats,
};
use std::future::Future;
use std::path::Path;
use tracing::{error, info};

pub async fn run(
    path: &Path,
    command: &[String],
    config: WatchConfig,
    initial: bool,
) -> Result<()> {
    let reload = CommandReload::new(command)?;

    if initial {
        info!("Running initial reload: {}", reload.display());
        if let Err(e) = reload.reload().await {
            error!(error = %format!("{e:#}"), "Initial reload failed");
        }
    }

    let lifetime = CancellationToken::new();
    let display = reload.display();
    let handle = reload_watcher::watch_with_config(&lifetime, path, config.clone(), reload)
        .with_context(|| format!("Failed to watch {}", path.display()))?;

    println!(
        "{} {} {}",
        "Watching".green().bold(),
        path.display(),
        format!("(debounce {}ms, runs `{}`)", config.debounce_ms, display).dimmed()
    );
    println!("{}", "Press Ctrl-C to stop".dimmed());

    let stats = supervise(&lifetime, handle, tokio::signal::ctrl_c()).await?;

    println!(
        "\n{} {} reloads ({} failed), {} change events, {} notifier errors",
        "Stopped.".bold(),
        stats.reloads,
        stats.reload_failures,
        stats.events,
        stats.notifier_errors
    );
    if let Some(duration) = stats.last_reload_duration {
        println!("{}: {:?}", "Last successful reload took".dimmed(), duration);
    }

    Ok(())
}

/// Keep the session running until `shutdown` resolves, then cancel it
///
/// Returns the counters of the stopped session, so a reload still running at
/// shutdown is included. Fails if the session ends on its own first.
pub async fn supervise<F>(
    lifetime: &CancellationToken,
    handle: WatchHandle,
    shutdown: F,
) -> Result<WatchStats>
where
    F: Future<Output = std::io::Result<()>>,
{
    let mut states = handle.subscribe();

    let ended = tokio::select! {
        signal = shutdown => signal.context("Failed to listen for Ctrl-C").map(|()| None),
        state = states.wait_for(|s| s.is_terminal()) => {
            Ok(Some(state.map(|s| *s).unwrap_or(SessionState::Closed)))
        }
    };

    info!("Shutting down watch on {}", handle.path().display());
    lifetime.cancel();

    let path = handle.path().to_path_buf();
    let stats = handle.stopped().await;

    match ended? {
        None | Some(SessionState::Canceled) => Ok(stats),
        Some(state) => anyhow::bail!(
            "Watch on {} stopped unexpectedly ({:?}) after {} reloads",
            path.display(),
            state,
            stats.reloads
        ),
    }
}
