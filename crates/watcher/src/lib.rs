//! Debounced, cancellable reload notification
//!
//! This crate provides:
//! - A debounce coordinator that collapses bursts of changes into one reload
//! - A change notifier contract, with a `notify`-backed filesystem notifier
//!   and a manually driven one
//! - Cancellation through a caller-owned [`CancellationToken`]
//!
//! ```no_run
//! use reload_watcher::CancellationToken;
//!
//! # async fn demo() -> Result<(), reload_watcher::WatchError> {
//! let lifetime = CancellationToken::new();
//! let handle = reload_watcher::watch(&lifetime, "config.toml", || async {
//!     // parse and apply the new configuration
//!     Ok::<_, anyhow::Error>(())
//! })?;
//!
//! lifetime.cancel();
//! let stats = handle.stopped().await;
//! println!("{} reloads", stats.reloads);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod debounce;
pub mod error;
pub mod fs;
pub mod notifier;
pub mod reload;

use std::path::Path;

// Re-exports
pub use config::WatchConfig;
pub use debounce::{DebounceCoordinator, SessionState, WatchHandle, WatchStats};
pub use error::{NotifierError, WatchError};
pub use fs::FsNotifier;
pub use notifier::{
    ChangeEvent, ChangeKind, ChangeNotifier, EventHandler, ManualNotifier, Registration,
};
pub use reload::Reload;
pub use tokio_util::sync::CancellationToken;

/// Result type for watch operations
pub type Result<T> = std::result::Result<T, WatchError>;

/// Watch a file on disk with the default 100ms debounce window
///
/// See [`DebounceCoordinator::start`] for the full contract.
pub fn watch<R: Reload>(
    lifetime: &CancellationToken,
    path: impl AsRef<Path>,
    on_reload: R,
) -> Result<WatchHandle> {
    DebounceCoordinator::new(FsNotifier::new()).start(lifetime, path, on_reload)
}

/// Watch a file on disk with custom settings
pub fn watch_with_config<R: Reload>(
    lifetime: &CancellationToken,
    path: impl AsRef<Path>,
    config: WatchConfig,
    on_reload: R,
) -> Result<WatchHandle> {
    DebounceCoordinator::new(FsNotifier::new())
        .with_config(config)
        .start(lifetime, path, on_reload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_watch_file_end_to_end() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.toml");
        fs::write(&path, "port = 8080\n").unwrap();

        let reloads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&reloads);
        let lifetime = CancellationToken::new();

        let handle = watch_with_config(
            &lifetime,
            &path,
            WatchConfig::with_debounce(Duration::from_millis(50)),
            move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, anyhow::Error>(())
                }
            },
        )
        .unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        fs::write(&path, "port = 9090\n").unwrap();
        fs::write(&path, "port = 9091\n").unwrap();

        let mut waited = Duration::ZERO;
        while reloads.load(Ordering::SeqCst) == 0 && waited < Duration::from_secs(5) {
            tokio::time::sleep(Duration::from_millis(25)).await;
            waited += Duration::from_millis(25);
        }
        assert!(reloads.load(Ordering::SeqCst) >= 1);

        lifetime.cancel();
        handle.stopped().await;
    }

    #[tokio::test]
    async fn test_watch_missing_directory_fails() {
        let temp_dir = TempDir::new().unwrap();
        let lifetime = CancellationToken::new();

        let result = watch(&lifetime, temp_dir.path().join("gone/app.toml"), || async {
            Ok::<_, anyhow::Error>(())
        });
        assert!(matches!(result, Err(WatchError::Setup { .. })));
    }
}
