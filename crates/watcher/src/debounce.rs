//! Debounced reload coordination
//!
//! Every watch session owns one coordinating task. Notifier callbacks only
//! check the lifetime, stamp the latest change into a single slot and wake
//! that task. The task keeps the single pending deadline and runs the reload
//! inline, so reloads never overlap each other or a reschedule, and sessions
//! for different paths share nothing. Changes that arrive while a reload runs
//! collapse into the one slot rather than queueing.

use crate::config::WatchConfig;
use crate::error::WatchError;
use crate::notifier::{ChangeEvent, ChangeNotifier, EventHandler, Registration};
use crate::reload::Reload;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Lifecycle of a watch session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No change pending
    Idle,
    /// A reload is scheduled for the end of the debounce window
    Pending,
    /// The reload callback is running
    Reloading,
    /// The lifetime was canceled; terminal
    Canceled,
    /// The notifier dropped its handler while the lifetime was live; terminal
    Closed,
}

impl SessionState {
    /// Whether no further transitions can happen
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Canceled | Self::Closed)
    }
}

/// Counters kept by a watch session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchStats {
    /// Change events accepted
    pub events: u64,
    /// Errors reported by the notifier
    pub notifier_errors: u64,
    /// Reload callback invocations
    pub reloads: u64,
    /// Reload callback failures
    pub reload_failures: u64,
    /// Elapsed time of the last successful reload
    pub last_reload_duration: Option<Duration>,
}

/// Starts debounced watch sessions on top of a [`ChangeNotifier`]
pub struct DebounceCoordinator<N> {
    notifier: N,
    config: WatchConfig,
}

impl<N: ChangeNotifier> DebounceCoordinator<N> {
    /// Coordinator using the default settings
    pub fn new(notifier: N) -> Self {
        Self {
            notifier,
            config: WatchConfig::default(),
        }
    }

    /// Replace the settings used for new sessions
    pub fn with_config(mut self, config: WatchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Watch `path` and run `on_reload` once per debounced burst of changes
    ///
    /// If `lifetime` is already canceled this returns an inert handle without
    /// touching the notifier. Otherwise the notifier registration happens
    /// synchronously and its failure is returned as [`WatchError::Setup`].
    /// The session then runs in the background until `lifetime` is canceled;
    /// dropping the returned handle does not stop it.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start<R: Reload>(
        &self,
        lifetime: &CancellationToken,
        path: impl AsRef<Path>,
        on_reload: R,
    ) -> Result<WatchHandle, WatchError> {
        let path = path.as_ref();

        if lifetime.is_cancelled() {
            debug!("Lifetime already canceled, not watching {}", path.display());
            return Ok(WatchHandle::inert(path));
        }

        if path.as_os_str().is_empty() {
            return Err(WatchError::EmptyPath);
        }

        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| WatchError::NoRuntime)?;

        let stats = Arc::new(Mutex::new(WatchStats::default()));
        let (change_tx, change_rx) = watch::channel::<Option<Stamp>>(None);

        let handler_lifetime = lifetime.clone();
        let handler_stats = Arc::clone(&stats);
        let handler_path = path.to_path_buf();
        let handler: EventHandler = Box::new(move |result| {
            if handler_lifetime.is_cancelled() {
                return;
            }
            match result {
                Ok(event) => {
                    handler_stats.lock().events += 1;
                    let stamp = Stamp {
                        at: Instant::now(),
                        event,
                    };
                    // Deadline follows the latest event, never an earlier one
                    change_tx.send_modify(|latest| {
                        if latest.as_ref().map_or(true, |prev| prev.at <= stamp.at) {
                            *latest = Some(stamp);
                        }
                    });
                }
                Err(e) => {
                    handler_stats.lock().notifier_errors += 1;
                    warn!(path = %handler_path.display(), error = %e, "Failed watching config");
                }
            }
        });

        let registration = self.notifier.watch(path, handler)?;

        let (state_tx, state_rx) = watch::channel(SessionState::Idle);

        let session = Session {
            path: path.to_path_buf(),
            window: self.config.debounce_window(),
            lifetime: lifetime.clone(),
            on_reload,
            changes: change_rx,
            state: state_tx,
            stats: Arc::clone(&stats),
            _registration: registration,
        };

        info!(
            path = %path.display(),
            debounce_ms = self.config.debounce_ms,
            "Watching config for changes"
        );

        let task = runtime.spawn(session.run());

        Ok(WatchHandle {
            path: path.to_path_buf(),
            state: state_rx,
            stats,
            task: Some(task),
        })
    }
}

/// Handle to a running (or never started) watch session
pub struct WatchHandle {
    path: PathBuf,
    state: watch::Receiver<SessionState>,
    stats: Arc<Mutex<WatchStats>>,
    task: Option<JoinHandle<()>>,
}

impl WatchHandle {
    fn inert(path: &Path) -> Self {
        let (_tx, state) = watch::channel(SessionState::Canceled);
        Self {
            path: path.to_path_buf(),
            state,
            stats: Arc::default(),
            task: None,
        }
    }

    /// Path being watched
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current session state
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Receiver notified on every state transition
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Snapshot of the session counters
    ///
    /// A reload in flight is not counted until it returns; use the value
    /// from [`stopped`](Self::stopped) for final totals.
    pub fn stats(&self) -> WatchStats {
        self.stats.lock().clone()
    }

    /// Whether the session task is still running
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Wait until the session has stopped and released its notifier registration
    ///
    /// Returns the final counters, including a reload that was still running
    /// when the lifetime was canceled.
    pub async fn stopped(self) -> WatchStats {
        if let Some(task) = self.task {
            if let Err(e) = task.await {
                warn!("Watch session for {} ended abnormally: {}", self.path.display(), e);
            }
        }
        let stats = self.stats.lock().clone();
        stats
    }
}

/// Latest change, stamped with the time it was observed
#[derive(Debug, Clone)]
struct Stamp {
    at: Instant,
    event: ChangeEvent,
}

struct Session<R> {
    path: PathBuf,
    window: Duration,
    lifetime: CancellationToken,
    on_reload: R,
    changes: watch::Receiver<Option<Stamp>>,
    state: watch::Sender<SessionState>,
    stats: Arc<Mutex<WatchStats>>,
    /// Dropped with the session, which stops notifier delivery
    _registration: Registration,
}

impl<R: Reload> Session<R> {
    async fn run(mut self) {
        let mut deadline: Option<Instant> = None;

        let terminal = loop {
            tokio::select! {
                biased;

                _ = self.lifetime.cancelled() => {
                    debug!("Lifetime canceled, stopping watch on {}", self.path.display());
                    break SessionState::Canceled;
                }

                changed = self.changes.changed() => match changed {
                    Ok(()) => {
                        let latest = self.changes.borrow_and_update().clone();
                        if let Some(stamp) = latest {
                            self.accept(stamp, &mut deadline);
                        }
                    }
                    Err(_) => {
                        warn!(
                            path = %self.path.display(),
                            "Notifier stopped delivering events, watch is closed"
                        );
                        break SessionState::Closed;
                    }
                },

                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    deadline = None;
                    self.fire().await;
                }
            }
        };

        if deadline.is_some() {
            debug!("Discarding pending reload for {}", self.path.display());
        }
        self.set_state(terminal);
        info!(path = %self.path.display(), "Stopped watching config");
    }

    /// Move the pending deadline to one window after `stamp`
    fn accept(&mut self, stamp: Stamp, deadline: &mut Option<Instant>) {
        let next = stamp.at + self.window;
        *deadline = Some(deadline.map_or(next, |current| current.max(next)));

        debug!(
            "{:?} on {}, reload in {:?}",
            stamp.event.kind,
            stamp.event.path.display(),
            self.window
        );
        self.set_state(SessionState::Pending);
    }

    async fn fire(&mut self) {
        // A cancellation that raced the timer wins
        if self.lifetime.is_cancelled() {
            return;
        }

        self.set_state(SessionState::Reloading);
        info!(path = %self.path.display(), "Auto-reloading config");

        let start = Instant::now();
        let result = self.on_reload.reload().await;
        let elapsed = start.elapsed();

        {
            let mut stats = self.stats.lock();
            stats.reloads += 1;
            match &result {
                Ok(()) => stats.last_reload_duration = Some(elapsed),
                Err(_) => stats.reload_failures += 1,
            }
        }

        match result {
            Ok(()) => info!(
                path = %self.path.display(),
                duration_ms = elapsed.as_millis() as u64,
                "Reloaded config successfully in {:?}",
                elapsed
            ),
            Err(e) => error!(
                path = %self.path.display(),
                error = %format!("{e:#}"),
                "Failed to reload config"
            ),
        }

        self.set_state(SessionState::Idle);
    }

    fn set_state(&self, next: SessionState) {
        self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

mod tests {
    use super::*;
    use crate::error::NotifierError;
    use crate::notifier::ManualNotifier;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::sleep;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn coordinator(
        window_ms: u64,
    ) -> (Arc<ManualNotifier>, DebounceCoordinator<Arc<ManualNotifier>>) {
        let notifier = Arc::new(ManualNotifier::new());
        let coordinator = DebounceCoordinator::new(Arc::clone(&notifier))
            .with_config(WatchConfig { debounce_ms: window_ms });
        (notifier, coordinator)
    }

    /// Records the instant of every reload
    #[derive(Clone, Default)]
    struct Recorder {
        fired: Arc<Mutex<Vec<Instant>>>,
    }

    impl Recorder {
        fn callback(&self) -> impl Reload {
            let fired = Arc::clone(&self.fired);
            move || {
                let fired = Arc::clone(&fired);
                async move {
                    fired.lock().push(Instant::now());
                    Ok::<_, anyhow::Error>(())
                }
            }
        }

        fn offsets(&self, origin: Instant) -> Vec<Duration> {
            self.fired.lock().iter().map(|t| *t - origin).collect()
        }
    }

    /// Reload that takes `duration`, recording start instants and peak concurrency
    #[derive(Clone, Default)]
    struct SlowReload {
        started: Arc<Mutex<Vec<Instant>>>,
        in_flight: Arc<AtomicUsize>,
        max_in_flight: Arc<AtomicUsize>,
    }

    impl SlowReload {
        fn callback(&self, duration: Duration) -> impl Reload {
            let this = self.clone();
            move || {
                let this = this.clone();
                async move {
                    this.started.lock().push(Instant::now());
                    let now = this.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    this.max_in_flight.fetch_max(now, Ordering::SeqCst);
                    sleep(duration).await;
                    this.in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, anyhow::Error>(())
                }
            }
        }

        fn offsets(&self, origin: Instant) -> Vec<Duration> {
            self.started.lock().iter().map(|t| *t - origin).collect()
        }
    }

    fn assert_near(actual: Duration, expected: Duration) {
        assert!(
            actual >= expected && actual <= expected + ms(5),
            "expected ~{:?}, got {:?}",
            expected,
            actual
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_collapses_into_one_reload_after_last_event() {
        let (notifier, coordinator) = coordinator(100);
        let recorder = Recorder::default();
        let lifetime = CancellationToken::new();

        let handle = coordinator.start(&lifetime, "app.toml", recorder.callback()).unwrap();
        let origin = Instant::now();

        notifier.emit_change("app.toml");
        sleep(ms(10)).await;
        notifier.emit_change("app.toml");
        sleep(ms(10)).await;
        notifier.emit_change("app.toml");
        sleep(ms(300)).await;

        let offsets = recorder.offsets(origin);
        assert_eq!(offsets.len(), 1);
        assert_near(offsets[0], ms(120));

        let stats = handle.stats();
        assert_eq!(stats.events, 3);
        assert_eq!(stats.reloads, 1);
        assert_eq!(stats.reload_failures, 0);
        assert!(stats.last_reload_duration.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_separated_events_reload_twice() {
        let (notifier, coordinator) = coordinator(100);
        let recorder = Recorder::default();
        let lifetime = CancellationToken::new();

        let _handle = coordinator.start(&lifetime, "app.toml", recorder.callback()).unwrap();
        let origin = Instant::now();

        notifier.emit_change("app.toml");
        sleep(ms(150)).await;
        notifier.emit_change("app.toml");
        sleep(ms(300)).await;

        let offsets = recorder.offsets(origin);
        assert_eq!(offsets.len(), 2);
        assert_near(offsets[0], ms(100));
        assert_near(offsets[1], ms(250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_canceled_lifetime_never_registers() {
        let (notifier, coordinator) = coordinator(100);
        let recorder = Recorder::default();
        let lifetime = CancellationToken::new();
        lifetime.cancel();

        let handle = coordinator.start(&lifetime, "app.toml", recorder.callback()).unwrap();

        assert_eq!(notifier.registrations(), 0);
        assert_eq!(handle.state(), SessionState::Canceled);
        assert!(!handle.is_active());

        notifier.emit_change("app.toml");
        sleep(ms(300)).await;
        assert!(recorder.offsets(Instant::now()).is_empty());
        assert_eq!(handle.stopped().await, WatchStats::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_pending_suppresses_reload() {
        let (notifier, coordinator) = coordinator(100);
        let recorder = Recorder::default();
        let lifetime = CancellationToken::new();

        let handle = coordinator.start(&lifetime, "app.toml", recorder.callback()).unwrap();

        notifier.emit_change("app.toml");
        sleep(ms(50)).await;
        assert_eq!(handle.state(), SessionState::Pending);

        lifetime.cancel();
        notifier.emit_change("app.toml");
        sleep(ms(300)).await;

        assert!(recorder.fired.lock().is_empty());
        assert_eq!(handle.state(), SessionState::Canceled);
        assert_eq!(handle.stats().events, 1);

        handle.stopped().await;
        assert_eq!(notifier.active_watches(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reload_failure_does_not_stop_watch() {
        let (notifier, coordinator) = coordinator(100);
        let lifetime = CancellationToken::new();
        let attempts = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&attempts);
        let on_reload = move || {
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    anyhow::bail!("invalid config: missing [server] table");
                }
                Ok(())
            }
        };

        let handle = coordinator.start(&lifetime, "app.toml", on_reload).unwrap();

        notifier.emit_change("app.toml");
        sleep(ms(200)).await;
        assert_eq!(handle.stats().reload_failures, 1);
        assert_eq!(handle.stats().last_reload_duration, None);
        assert_eq!(handle.state(), SessionState::Idle);

        // No retry without a new change
        sleep(ms(500)).await;
        assert_eq!(attempts.load(Ordering::SeqCst), 1);

        notifier.emit_change("app.toml");
        sleep(ms(200)).await;

        let stats = handle.stats();
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(stats.reloads, 2);
        assert_eq!(stats.reload_failures, 1);
        assert!(stats.last_reload_duration.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_notifier_error_is_counted_and_not_a_change() {
        let (notifier, coordinator) = coordinator(100);
        let recorder = Recorder::default();
        let lifetime = CancellationToken::new();

        let handle = coordinator.start(&lifetime, "app.toml", recorder.callback()).unwrap();

        notifier.emit_error("app.toml", NotifierError::Removed(PathBuf::from("app.toml")));
        sleep(ms(300)).await;

        assert!(recorder.fired.lock().is_empty());
        assert_eq!(handle.stats().notifier_errors, 1);
        assert_eq!(handle.state(), SessionState::Idle);
        assert!(handle.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sessions_do_not_share_timers() {
        let (notifier, coordinator) = coordinator(100);
        let first = Recorder::default();
        let second = Recorder::default();
        let lifetime = CancellationToken::new();

        let _a = coordinator.start(&lifetime, "a.toml", first.callback()).unwrap();
        let _b = coordinator.start(&lifetime, "b.toml", second.callback()).unwrap();
        let origin = Instant::now();

        notifier.emit_change("a.toml");
        sleep(ms(60)).await;
        notifier.emit_change("b.toml");
        sleep(ms(300)).await;

        assert_eq!(first.offsets(origin).len(), 1);
        assert_eq!(second.offsets(origin).len(), 1);
        assert_near(first.offsets(origin)[0], ms(100));
        assert_near(second.offsets(origin)[0], ms(160));
    }

    #[tokio::test(start_paused = true)]
    async fn test_change_during_reload_schedules_one_more() {
        let (notifier, coordinator) = coordinator(100);
        let slow = SlowReload::default();
        let lifetime = CancellationToken::new();

        let handle = coordinator.start(&lifetime, "app.toml", slow.callback(ms(200))).unwrap();
        let origin = Instant::now();

        notifier.emit_change("app.toml");
        sleep(ms(150)).await;
        assert_eq!(handle.state(), SessionState::Reloading);
        notifier.emit_change("app.toml");
        sleep(ms(600)).await;

        // Second window is already over when the first reload returns at 300ms
        let offsets = slow.offsets(origin);
        assert_eq!(offsets.len(), 2);
        assert_near(offsets[0], ms(100));
        assert_near(offsets[1], ms(300));
        assert_eq!(slow.max_in_flight.load(Ordering::SeqCst), 1);

        let stats = handle.stats();
        assert_eq!(stats.events, 2);
        assert_eq!(stats.reloads, 2);
        assert_eq!(handle.state(), SessionState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_changes_during_hung_reload_collapse() {
        let (notifier, coordinator) = coordinator(100);
        let slow = SlowReload::default();
        let lifetime = CancellationToken::new();

        let handle = coordinator.start(&lifetime, "app.toml", slow.callback(ms(5_000))).unwrap();
        let origin = Instant::now();

        notifier.emit_change("app.toml");
        sleep(ms(150)).await;
        for _ in 0..10_000 {
            notifier.emit_change("app.toml");
        }
        sleep(ms(12_000)).await;

        let offsets = slow.offsets(origin);
        assert_eq!(offsets.len(), 2);
        assert_near(offsets[0], ms(100));
        assert_near(offsets[1], ms(5_100));
        assert_eq!(handle.stats().events, 10_001);
        assert_eq!(handle.stats().reloads, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_reports_reload_in_flight_at_cancel() {
        let (notifier, coordinator) = coordinator(100);
        let slow = SlowReload::default();
        let lifetime = CancellationToken::new();

        let handle = coordinator.start(&lifetime, "app.toml", slow.callback(ms(200))).unwrap();

        notifier.emit_change("app.toml");
        sleep(ms(150)).await;
        assert_eq!(handle.state(), SessionState::Reloading);

        lifetime.cancel();
        assert_eq!(handle.stats().reloads, 0);

        let stats = handle.stopped().await;
        assert_eq!(stats.events, 1);
        assert_eq!(stats.reloads, 1);
        assert_eq!(stats.reload_failures, 0);
        assert_near(stats.last_reload_duration.unwrap(), ms(200));
        assert_eq!(notifier.active_watches(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnected_notifier_closes_session() {
        let (notifier, coordinator) = coordinator(100);
        let recorder = Recorder::default();
        let lifetime = CancellationToken::new();

        let handle = coordinator.start(&lifetime, "app.toml", recorder.callback()).unwrap();
        let mut state = handle.subscribe();

        notifier.disconnect("app.toml");
        state.wait_for(|s| s.is_terminal()).await.unwrap();

        assert_eq!(handle.state(), SessionState::Closed);
        assert!(!lifetime.is_cancelled());
        assert_eq!(handle.stopped().await, WatchStats::default());
        assert!(recorder.fired.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_setup_failure_is_returned() {
        let (notifier, coordinator) = coordinator(100);
        notifier.fail_registrations("inotify watch limit reached");
        let lifetime = CancellationToken::new();

        let result = coordinator.start(&lifetime, "app.toml", Recorder::default().callback());
        match result {
            Err(WatchError::Setup { path, message }) => {
                assert_eq!(path, PathBuf::from("app.toml"));
                assert_eq!(message, "inotify watch limit reached");
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected setup failure"),
        }
    }

    #[tokio::test]
    async fn test_empty_path_rejected() {
        let (notifier, coordinator) = coordinator(100);
        let lifetime = CancellationToken::new();

        let result = coordinator.start(&lifetime, "", Recorder::default().callback());
        assert!(matches!(result, Err(WatchError::EmptyPath)));
        assert_eq!(notifier.registrations(), 0);
    }

    #[test]
    fn test_start_outside_runtime_fails() {
        let (notifier, coordinator) = coordinator(100);
        let lifetime = CancellationToken::new();

        let result = coordinator.start(&lifetime, "app.toml", Recorder::default().callback());
        assert!(matches!(result, Err(WatchError::NoRuntime)));
        assert_eq!(notifier.registrations(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_reloads_never_overlap_under_concurrent_events() {
        let (notifier, coordinator) = coordinator(20);
        let lifetime = CancellationToken::new();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_in_flight = Arc::new(AtomicUsize::new(0));

        let (current, max) = (Arc::clone(&in_flight), Arc::clone(&max_in_flight));
        let on_reload = move || {
            let (current, max) = (Arc::clone(&current), Arc::clone(&max));
            async move {
                let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                max.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(ms(50)).await;
                current.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, anyhow::Error>(())
            }
        };

        let handle = coordinator.start(&lifetime, "app.toml", on_reload).unwrap();

        let emitters: Vec<_> = (0..4)
            .map(|_| {
                let notifier = Arc::clone(&notifier);
                std::thread::spawn(move || {
                    for _ in 0..10 {
                        notifier.emit_change("app.toml");
                        std::thread::sleep(ms(15));
                    }
                })
            })
            .collect();
        for emitter in emitters {
            emitter.join().unwrap();
        }

        tokio::time::sleep(ms(400)).await;

        let stats = handle.stats();
        assert_eq!(stats.events, 40);
        assert!(stats.reloads >= 1);
        assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(in_flight.load(Ordering::SeqCst), 0);

        lifetime.cancel();
        let stats = handle.stopped().await;
        assert_eq!(stats.events, 40);
    }
}
