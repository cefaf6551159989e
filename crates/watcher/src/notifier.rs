//! Change notifier contract
//!
//! A notifier delivers "path changed" or "error" events for a single path to
//! a handler, from whatever thread it likes. Registration is synchronous and
//! is the only place a notifier reports a failure to the caller.

use crate::error::{NotifierError, WatchError};
use parking_lot::Mutex;
use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Kind of change observed on the watched path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// File contents or metadata changed, or a file was renamed onto it
    Modified,
    /// File was created
    Created,
    /// A symlink along the path now resolves to a different file
    Retargeted,
}

/// A change reported by a notifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Path that changed
    pub path: PathBuf,
    /// Type of change
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Callback invoked by a notifier for every change or error
pub type EventHandler = Box<dyn Fn(Result<ChangeEvent, NotifierError>) + Send + Sync + 'static>;

/// Source of change events for a path
pub trait ChangeNotifier: Send + Sync {
    /// Begin watching `path`, delivering events to `handler`
    ///
    /// Returns [`WatchError::Setup`] if watching cannot begin. Events keep
    /// flowing until the returned [`Registration`] is dropped.
    fn watch(&self, path: &Path, handler: EventHandler) -> Result<Registration, WatchError>;
}

impl<N: ChangeNotifier + ?Sized> ChangeNotifier for Arc<N> {
    fn watch(&self, path: &Path, handler: EventHandler) -> Result<Registration, WatchError> {
        (**self).watch(path, handler)
    }
}

/// Keeps a notifier watch alive
///
/// Dropping the registration stops event delivery.
pub struct Registration {
    _guard: Box<dyn Any + Send>,
}

impl Registration {
    /// Wrap whatever object keeps the underlying watch alive
    pub fn new<G: Any + Send>(guard: G) -> Self {
        Self {
            _guard: Box::new(guard),
        }
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration").finish_non_exhaustive()
    }
}

/// Notifier driven by explicit calls
///
/// Useful when change signals come from somewhere other than the filesystem
/// (a SIGHUP handler, an admin endpoint) and in tests.
#[derive(Default)]
pub struct ManualNotifier {
    watches: Mutex<Vec<ManualWatch>>,
    registrations: AtomicUsize,
    setup_failure: Mutex<Option<String>>,
}

struct ManualWatch {
    path: PathBuf,
    handler: Arc<EventHandler>,
    live: Arc<AtomicBool>,
}

struct ManualGuard {
    live: Arc<AtomicBool>,
}

impl Drop for ManualGuard {
    fn drop(&mut self) {
        self.live.store(false, Ordering::SeqCst);
    }
}

impl ManualNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following registration fail with `message`
    pub fn fail_registrations(&self, message: impl Into<String>) {
        *self.setup_failure.lock() = Some(message.into());
    }

    /// Total number of successful registrations so far
    pub fn registrations(&self) -> usize {
        self.registrations.load(Ordering::SeqCst)
    }

    /// Number of registrations that have not been dropped
    pub fn active_watches(&self) -> usize {
        self.watches
            .lock()
            .iter()
            .filter(|w| w.live.load(Ordering::SeqCst))
            .count()
    }

    /// Drop every handler watching `path`, as a notifier backend that dies would
    ///
    /// Registrations stay alive but nothing is delivered to them again.
    pub fn disconnect(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        self.watches.lock().retain(|w| w.path != path);
    }

    /// Deliver a modification event for `path`
    pub fn emit_change(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        self.emit(path, Ok(ChangeEvent::new(path, ChangeKind::Modified)));
    }

    /// Deliver a notifier error for `path`
    pub fn emit_error(&self, path: impl AsRef<Path>, error: NotifierError) {
        self.emit(path.as_ref(), Err(error));
    }

    /// Deliver an arbitrary result to every live handler watching `path`
    pub fn emit(&self, path: &Path, result: Result<ChangeEvent, NotifierError>) {
        // Handlers run outside the lock so they may re-enter the notifier
        let handlers: Vec<Arc<EventHandler>> = {
            let mut watches = self.watches.lock();
            watches.retain(|w| w.live.load(Ordering::SeqCst));
            watches
                .iter()
                .filter(|w| w.path == path)
                .map(|w| Arc::clone(&w.handler))
                .collect()
        };

        for handler in handlers {
            handler(result.clone());
        }
    }
}

impl ChangeNotifier for ManualNotifier {
    fn watch(&self, path: &Path, handler: EventHandler) -> Result<Registration, WatchError> {
        if let Some(message) = self.setup_failure.lock().clone() {
            return Err(WatchError::setup(path, message));
        }

        let live = Arc::new(AtomicBool::new(true));
        self.watches.lock().push(ManualWatch {
            path: path.to_path_buf(),
            handler: Arc::new(handler),
            live: Arc::clone(&live),
        });
        self.registrations.fetch_add(1, Ordering::SeqCst);

        Ok(Registration::new(ManualGuard { live }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording_handler() -> (EventHandler, Arc<Mutex<Vec<Result<ChangeEvent, NotifierError>>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler: EventHandler = Box::new(move |result| sink.lock().push(result));
        (handler, seen)
    }

    #[test]
    fn test_emit_reaches_matching_path_only() {
        let notifier = ManualNotifier::new();
        let (handler, seen) = recording_handler();
        let _registration = notifier.watch(Path::new("a.toml"), handler).unwrap();

        notifier.emit_change("a.toml");
        notifier.emit_change("b.toml");
        notifier.emit_error("a.toml", NotifierError::Backend("queue overflow".into()));

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], Ok(ChangeEvent::new("a.toml", ChangeKind::Modified)));
        assert!(seen[1].is_err());
    }

    #[test]
    fn test_dropped_registration_stops_delivery() {
        let notifier = ManualNotifier::new();
        let (handler, seen) = recording_handler();
        let registration = notifier.watch(Path::new("a.toml"), handler).unwrap();
        assert_eq!(notifier.active_watches(), 1);

        drop(registration);
        notifier.emit_change("a.toml");

        assert!(seen.lock().is_empty());
        assert_eq!(notifier.active_watches(), 0);
        assert_eq!(notifier.registrations(), 1);
    }

    #[test]
    fn test_disconnect_releases_handlers() {
        let notifier = ManualNotifier::new();
        let (handler, seen) = recording_handler();
        let _registration = notifier.watch(Path::new("a.toml"), handler).unwrap();
        let (other, other_seen) = recording_handler();
        let _other = notifier.watch(Path::new("b.toml"), other).unwrap();

        notifier.disconnect("a.toml");
        notifier.emit_change("a.toml");
        notifier.emit_change("b.toml");

        assert!(seen.lock().is_empty());
        assert_eq!(other_seen.lock().len(), 1);
        assert_eq!(notifier.active_watches(), 1);
        // The handler was dropped, so the sink is only held here
        assert_eq!(Arc::strong_count(&seen), 1);
    }

    #[test]
    fn test_forced_setup_failure() {
        let notifier = ManualNotifier::new();
        notifier.fail_registrations("permission denied");

        let (handler, _) = recording_handler();
        let err = notifier.watch(Path::new("a.toml"), handler).unwrap_err();
        assert!(matches!(err, WatchError::Setup { .. }));
        assert_eq!(notifier.registrations(), 0);
    }
}
