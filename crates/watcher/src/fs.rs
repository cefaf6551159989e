//! Filesystem change notifier backed by `notify`
//!
//! Watches the parent directory of the target so that editors which save via
//! write-then-rename, and files that are deleted and re-created, are still
//! observed. The target is re-resolved through symlinks on every event so a
//! swapped link (Kubernetes ConfigMap style) is reported as a change.

use crate::error::{NotifierError, WatchError};
use crate::notifier::{ChangeEvent, ChangeKind, ChangeNotifier, EventHandler, Registration};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Change notifier for a file on the local filesystem
#[derive(Debug, Clone, Default)]
pub struct FsNotifier {
    config: notify::Config,
}

impl FsNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom backend configuration (e.g. polling interval)
    pub fn with_config(config: notify::Config) -> Self {
        Self { config }
    }
}

impl ChangeNotifier for FsNotifier {
    fn watch(&self, path: &Path, handler: EventHandler) -> Result<Registration, WatchError> {
        let mut target = FileTarget::new(path)?;
        let dir = target.dir.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if let Some(result) = target.classify(&event) {
                        handler(result);
                    }
                }
                Err(e) => handler(Err(NotifierError::Backend(e.to_string()))),
            },
            self.config.clone(),
        )
        .map_err(|e| WatchError::setup(path, format!("failed to create watcher: {e}")))?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::setup(path, e))?;

        debug!("Watching {} via directory {}", path.display(), dir.display());

        Ok(Registration::new(watcher))
    }
}

/// Watched file and the last place it resolved to
struct FileTarget {
    path: PathBuf,
    dir: PathBuf,
    file_name: OsString,
    resolved: Option<PathBuf>,
}

impl FileTarget {
    fn new(path: &Path) -> Result<Self, WatchError> {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(|e| WatchError::setup(path, e))?
                .join(path)
        };

        let file_name = absolute
            .file_name()
            .map(|n| n.to_os_string())
            .ok_or_else(|| WatchError::setup(path, "path has no file name"))?;

        let dir = absolute
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| WatchError::setup(path, "path has no parent directory"))?;

        Ok(Self {
            resolved: std::fs::canonicalize(&absolute).ok(),
            path: absolute,
            dir,
            file_name,
        })
    }

    fn is_target(&self, path: &Path) -> bool {
        path.file_name() == Some(self.file_name.as_os_str())
    }

    /// Turn a raw backend event into a change, an error, or nothing
    fn classify(&mut self, event: &Event) -> Option<Result<ChangeEvent, NotifierError>> {
        if let Ok(current) = std::fs::canonicalize(&self.path) {
            if self.resolved.as_ref() != Some(&current) {
                let previous = self.resolved.replace(current);
                if previous.is_some() {
                    return Some(Ok(ChangeEvent::new(&self.path, ChangeKind::Retargeted)));
                }
            }
        }

        let hits: Vec<bool> = event.paths.iter().map(|p| self.is_target(p)).collect();
        if !hits.contains(&true) {
            return None;
        }

        let change = |kind: ChangeKind| -> Option<Result<ChangeEvent, NotifierError>> {
            Some(Ok(ChangeEvent::new(&self.path, kind)))
        };
        let removed = || -> Option<Result<ChangeEvent, NotifierError>> {
            Some(Err(NotifierError::Removed(self.path.clone())))
        };

        match event.kind {
            EventKind::Create(_) => change(ChangeKind::Created),
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => removed(),
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
                // paths are [from, to]
                if hits.get(1) == Some(&true) {
                    change(ChangeKind::Modified)
                } else {
                    removed()
                }
            }
            EventKind::Modify(_) => change(ChangeKind::Modified),
            EventKind::Remove(_) => removed(),
            EventKind::Access(_) | EventKind::Any | EventKind::Other => None,
        }
    }
}
