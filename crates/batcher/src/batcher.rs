//! Coalescing action batcher
//!
//! Callers stage zero-argument actions under string keys. Staging a key that
//! is already pending replaces its action but keeps its place in the batch.
//! A flush timer runs every staged action in one go, then the registered
//! listeners, then settles the batch's [`Completion`].
//!
//! Timing follows [`BatcherConfig`]:
//! - `require_lull = true`: every start restarts the window, so the flush
//!   happens `interval` after the last submission
//! - `require_lull = false`: the first start arms the timer and later
//!   submissions ride along
//!
//! Actions and listeners run with the internal lock released, so they may
//! call back into the batcher. A panicking action is logged and counted; the
//! rest of the batch still runs.

use crate::completion::{BatchOutcome, Completion, CompletionSignal, FlushReport};
use crate::config::BatcherConfig;
use crate::log::BatchLog;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

type Action = Box<dyn FnOnce() + Send + 'static>;
type Listener = Arc<dyn Fn() + Send + Sync + 'static>;

/// Batches keyed actions behind a flush timer
///
/// Cloning produces another handle to the same batcher. The timer task only
/// holds a weak reference, so dropping the last handle cancels it.
#[derive(Clone)]
pub struct ActionBatcher {
    shared: Arc<Shared>,
}

struct Shared {
    /// Full name (`ActionBatcher-{n}-{name}`)
    name: String,
    config: BatcherConfig,
    log: BatchLog,
    state: Mutex<BatchState>,
}

struct BatchState {
    /// Staged actions in first-staged order
    staged: IndexMap<String, Action>,
    /// Post-flush listeners in registration order
    listeners: IndexMap<String, Listener>,
    blocked: bool,
    disposed: bool,
    /// Outstanding flush timer (at most one)
    timer: Option<FlushTimer>,
    timer_seq: u64,
    /// Completion for the batch currently being staged
    signal: Arc<CompletionSignal>,
    /// Completion owned by a flush that is running right now
    in_flight: Option<Arc<CompletionSignal>>,
}

struct FlushTimer {
    seq: u64,
    handle: JoinHandle<()>,
}

impl BatchState {
    /// A settled (or already flushing) batch must not absorb new actions
    fn needs_fresh_signal(&self) -> bool {
        self.signal.is_settled()
            || self
                .in_flight
                .as_ref()
                .is_some_and(|flushing| Arc::ptr_eq(flushing, &self.signal))
    }

    /// The signal of a batch that has neither settled nor started flushing
    fn pending_signal(&self) -> Option<Arc<CompletionSignal>> {
        (!self.needs_fresh_signal()).then(|| Arc::clone(&self.signal))
    }

    fn cancel_timer(&mut self) -> bool {
        match self.timer.take() {
            Some(timer) => {
                timer.handle.abort();
                true
            }
            None => false,
        }
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        self.state.get_mut().cancel_timer();
    }
}

impl ActionBatcher {
    /// Create a batcher that records into `log`
    pub fn new(config: BatcherConfig, log: BatchLog) -> Self {
        let name = format!("ActionBatcher-{}-{}", log.next_instance(), config.name);
        debug!("Created {} (interval: {:?}, require_lull: {})", name, config.interval(), config.require_lull);

        Self {
            shared: Arc::new(Shared {
                name,
                config,
                log,
                state: Mutex::new(BatchState {
                    staged: IndexMap::new(),
                    listeners: IndexMap::new(),
                    blocked: false,
                    disposed: false,
                    timer: None,
                    timer_seq: 0,
                    signal: Arc::new(CompletionSignal::settled(BatchOutcome::Discarded)),
                    in_flight: None,
                }),
            }),
        }
    }

    /// Stage an action without starting the flush timer
    ///
    /// Re-staging a key replaces its action in place.
    pub fn stage<F>(&self, key: impl Into<String>, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let key = key.into();
        let mut state = self.shared.state.lock();
        if state.disposed {
            drop(state);
            self.log(format!("Action \"{}\" ignored, batcher disposed", key));
            return;
        }

        // Replacing an existing key keeps its slot
        let restaged = state.staged.insert(key.clone(), Box::new(action)).is_some();

        if state.needs_fresh_signal() {
            state.signal = Arc::new(CompletionSignal::pending());
        }
        drop(state);

        self.log(format!("Action \"{}\" {}staged", key, if restaged { "re-" } else { "" }));
    }

    /// Stage an action and start the flush timer
    ///
    /// An empty key stages nothing and behaves like [`run_pending`](Self::run_pending).
    pub fn run<F>(&self, key: impl Into<String>, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let key = key.into();
        if key.is_empty() {
            self.run_pending();
            return;
        }

        self.log(format!("Run with action \"{}\"", key));
        self.stage(key, action);
        self.start_flush_timer();
    }

    /// Start the flush timer for whatever is already staged
    pub fn run_pending(&self) {
        self.log("Argumentless run");
        self.start_flush_timer();
    }

    /// Prevent elapsed timers from flushing (blocks do not stack)
    pub fn block(&self, message: &str) {
        let was_blocked = std::mem::replace(&mut self.shared.state.lock().blocked, true);
        self.log(format!(
            "Blocked ({} blocked) ; {}",
            if was_blocked { "was" } else { "was not" },
            describe(message)
        ));
    }

    /// Allow flushing again and restart the flush timer
    pub fn unblock(&self, message: &str) {
        let was_blocked = std::mem::replace(&mut self.shared.state.lock().blocked, false);
        self.log(format!(
            "Unblocked ({} blocked) ; {}",
            if was_blocked { "was" } else { "was not" },
            describe(message)
        ));

        self.start_flush_timer();
    }

    /// Drop every staged action without running it
    ///
    /// The current batch settles as [`BatchOutcome::Discarded`] and any
    /// outstanding timer is cancelled.
    pub fn clear(&self, message: &str) {
        let (dropped, signal) = {
            let mut state = self.shared.state.lock();
            state.cancel_timer();
            (std::mem::take(&mut state.staged), state.pending_signal())
        };

        self.log(format!("Clearing batch of {} actions ; {}", dropped.len(), describe(message)));
        // Dropping closures may run arbitrary destructors; keep it outside the lock
        drop(dropped);

        if let Some(signal) = signal {
            self.log("Resolving batch completion as discarded");
            signal.resolve(BatchOutcome::Discarded);
        }
    }

    /// Register a callback to run after every successful flush
    pub fn add_listener<F>(&self, key: impl Into<String>, listener: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let key = key.into();
        let listener: Listener = Arc::new(listener);
        let mut state = self.shared.state.lock();
        state.listeners.insert(key.clone(), listener);
        drop(state);

        self.log(format!("Listener \"{}\" added", key));
    }

    /// Remove a listener (no-op if absent)
    pub fn remove_listener(&self, key: &str) {
        let removed = self.shared.state.lock().listeners.shift_remove(key).is_some();

        if removed {
            self.log(format!("Listener \"{}\" removed", key));
        }
    }

    /// Cancel the timer, discard the batch and refuse further actions
    pub fn dispose(&self) {
        let (dropped, signal) = {
            let mut state = self.shared.state.lock();
            state.disposed = true;
            state.cancel_timer();
            state.listeners.clear();
            (std::mem::take(&mut state.staged), state.pending_signal())
        };

        self.log(format!("Disposed with {} staged actions", dropped.len()));
        drop(dropped);
        if let Some(signal) = signal {
            signal.resolve(BatchOutcome::Discarded);
        }
    }

    /// Completion for the batch currently being staged
    ///
    /// If nothing is pending this is the completion of the last batch and is
    /// already settled.
    pub fn completion(&self) -> Completion {
        Completion::new(Arc::clone(&self.shared.state.lock().signal))
    }

    /// Full batcher name as it appears in the log
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn config(&self) -> &BatcherConfig {
        &self.shared.config
    }

    /// The log this batcher records into
    pub fn batch_log(&self) -> &BatchLog {
        &self.shared.log
    }

    pub fn is_blocked(&self) -> bool {
        self.shared.state.lock().blocked
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.state.lock().disposed
    }

    /// Number of staged actions
    pub fn staged_len(&self) -> usize {
        self.shared.state.lock().staged.len()
    }

    /// Staged keys in flush order
    pub fn staged_keys(&self) -> Vec<String> {
        self.shared.state.lock().staged.keys().cloned().collect()
    }

    /// Whether a flush timer is outstanding
    pub fn has_pending_timer(&self) -> bool {
        self.shared.state.lock().timer.is_some()
    }

    /// Write this batcher's log entries, newest first
    pub fn write_log<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        self.shared.log.write_log(writer, Some(&self.shared.name))
    }

    fn log(&self, message: impl Into<String>) {
        self.shared.log.record(&self.shared.name, message);
    }

    fn start_flush_timer(&self) {
        let mut state = self.shared.state.lock();
        if state.disposed || state.staged.is_empty() {
            return;
        }

        if state.timer.is_some() && !self.shared.config.require_lull {
            drop(state);
            self.log("Flush timer already running");
            return;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                drop(state);
                warn!("{}: cannot start flush timer outside a tokio runtime: {}", self.shared.name, e);
                self.log("Flush timer not started (no runtime)");
                return;
            }
        };

        let restarted = state.cancel_timer();
        state.timer_seq += 1;
        let seq = state.timer_seq;
        let delay = self.shared.config.interval();
        let deadline = Instant::now() + delay;
        let weak = Arc::downgrade(&self.shared);

        let handle = runtime.spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep_until(deadline).await;
            }
            on_timer_elapsed(weak, seq);
        });
        state.timer = Some(FlushTimer { seq, handle });
        drop(state);

        self.log(if restarted { "Restarting flush timer" } else { "Starting flush timer" });
    }

    fn flush_batch(&self, actions: IndexMap<String, Action>, listeners: Vec<(String, Listener)>, signal: Arc<CompletionSignal>) {
        self.log(format!("Flushing batch of {} actions", actions.len()));

        let mut report = FlushReport::default();
        for (key, action) in actions {
            self.log(format!("Executing \"{}\"", key));
            report.actions += 1;
            if catch_unwind(AssertUnwindSafe(action)).is_err() {
                report.failures += 1;
                warn!("{}: action \"{}\" panicked during flush", self.shared.name, key);
                self.log(format!("Action \"{}\" panicked", key));
            }
        }

        for (key, listener) in listeners {
            report.listeners += 1;
            if catch_unwind(AssertUnwindSafe(|| listener())).is_err() {
                report.failures += 1;
                warn!("{}: listener \"{}\" panicked during flush", self.shared.name, key);
                self.log(format!("Listener \"{}\" panicked", key));
            }
        }

        self.log("Resolving batch completion as flushed");
        signal.resolve(BatchOutcome::Flushed(report));

        let mut state = self.shared.state.lock();
        if state.in_flight.as_ref().is_some_and(|flushing| Arc::ptr_eq(flushing, &signal)) {
            state.in_flight = None;
        }
    }
}

/// Timer task body: flush unless superseded, disposed or blocked
fn on_timer_elapsed(weak: Weak<Shared>, seq: u64) {
    let Some(shared) = weak.upgrade() else {
        return;
    };
    let batcher = ActionBatcher { shared };

    let mut state = batcher.shared.state.lock();
    match state.timer.as_ref() {
        Some(timer) if timer.seq == seq => {}
        // Superseded by a restart between waking and taking the lock
        _ => return,
    }
    state.timer = None;

    if state.blocked {
        drop(state);
        batcher.log("Flush timer complete, but was blocked");
        return;
    }

    let actions = std::mem::take(&mut state.staged);
    if actions.is_empty() {
        drop(state);
        batcher.log("Flush timer complete, nothing staged");
        return;
    }

    let listeners: Vec<_> = state
        .listeners
        .iter()
        .map(|(key, listener)| (key.clone(), Arc::clone(listener)))
        .collect();
    let signal = Arc::clone(&state.signal);
    state.in_flight = Some(Arc::clone(&signal));
    drop(state);

    batcher.log("Flush timer complete, not blocked");
    batcher.flush_batch(actions, listeners, signal);
}

fn describe(message: &str) -> &str {
    if message.is_empty() {
        "No message"
    } else {
        message
    }
}

impl std::fmt::Debug for ActionBatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("ActionBatcher")
            .field("name", &self.shared.name)
            .field("config", &self.shared.config)
            .field("staged", &state.staged.len())
            .field("listeners", &state.listeners.len())
            .field("blocked", &state.blocked)
            .field("timer", &state.timer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::sleep;

    fn batcher(interval_ms: u64, require_lull: bool) -> ActionBatcher {
        let config = BatcherConfig::new("test")
            .with_interval_ms(interval_ms)
            .with_require_lull(require_lull);
        ActionBatcher::new(config, BatchLog::default())
    }

    fn counter() -> Arc<AtomicUsize> {
        Arc::new(AtomicUsize::new(0))
    }

    fn bump(count: &Arc<AtomicUsize>) -> impl FnOnce() + Send + 'static {
        let count = Arc::clone(count);
        move || {
            count.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn recorder(order: &Arc<Mutex<Vec<&'static str>>>, label: &'static str) -> impl Fn() + Send + Sync + 'static {
        let order = Arc::clone(order);
        move || order.lock().push(label)
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_staged_action_wins() {
        let batcher = batcher(0, true);
        let first = counter();
        let second = counter();

        batcher.stage("a", bump(&first));
        batcher.stage("a", bump(&second));
        assert_eq!(batcher.staged_len(), 1);

        batcher.run_pending();
        let outcome = batcher.completion().await;

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert_eq!(outcome, BatchOutcome::Flushed(FlushReport { actions: 1, listeners: 0, failures: 0 }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restage_keeps_original_position() {
        let batcher = batcher(0, true);
        let order = Arc::new(Mutex::new(Vec::new()));

        let o = Arc::clone(&order);
        batcher.stage("a", move || o.lock().push("a1"));
        let o = Arc::clone(&order);
        batcher.stage("b", move || o.lock().push("b"));
        let o = Arc::clone(&order);
        batcher.stage("a", move || o.lock().push("a2"));

        assert_eq!(batcher.staged_keys(), vec!["a", "b"]);
        batcher.run_pending();
        batcher.completion().await;

        assert_eq!(*order.lock(), vec!["a2", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_large_batch_keeps_order_and_last_write() {
        let batcher = batcher(0, true);
        let order = Arc::new(Mutex::new(Vec::with_capacity(10_000)));

        // Full redraw, then a second mutation of every square in the same tick
        for pass in 0..2 {
            for i in 0..10_000 {
                let order = Arc::clone(&order);
                batcher.stage(format!("square-{}", i), move || order.lock().push((i, pass)));
            }
        }
        assert_eq!(batcher.staged_len(), 10_000);
        batcher.run_pending();

        let outcome = batcher.completion().await;
        assert_eq!(outcome, BatchOutcome::Flushed(FlushReport { actions: 10_000, listeners: 0, failures: 0 }));

        let order = order.lock();
        assert_eq!(order.len(), 10_000);
        assert!(order.iter().enumerate().all(|(idx, &(i, pass))| idx == i && pass == 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_pending_without_actions_is_noop() {
        let batcher = batcher(0, true);
        let before = batcher.completion();

        batcher.run_pending();

        assert!(!batcher.has_pending_timer());
        assert!(batcher.completion().same_batch(&before));
        assert_eq!(before.try_outcome(), Some(BatchOutcome::Discarded));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stage_does_not_start_timer() {
        let batcher = batcher(10, true);
        let count = counter();

        batcher.stage("a", bump(&count));
        sleep(Duration::from_millis(50)).await;

        assert!(!batcher.has_pending_timer());
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(batcher.staged_len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_key_only_starts_timer() {
        let batcher = batcher(0, true);
        let count = counter();
        let ignored = counter();

        batcher.stage("a", bump(&count));
        batcher.run("", bump(&ignored));
        batcher.completion().await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(ignored.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lull_restarts_window() {
        let batcher = batcher(100, true);
        let count = counter();

        batcher.run("a", bump(&count));
        sleep(Duration::from_millis(60)).await;
        batcher.run("b", bump(&count));
        sleep(Duration::from_millis(60)).await;

        // 120ms after the first call, 60ms after the last: still waiting
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(batcher.has_pending_timer());

        sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(!batcher.has_pending_timer());
    }

    #[tokio::test(start_paused = true)]
    async fn test_lull_flushes_after_gap() {
        let batcher = batcher(100, true);
        let count = counter();

        batcher.run("a", bump(&count));
        sleep(Duration::from_millis(150)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        batcher.run("b", bump(&count));
        sleep(Duration::from_millis(99)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        sleep(Duration::from_millis(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_rate_does_not_push_flush_later() {
        let batcher = batcher(100, false);
        let count = counter();

        batcher.run("a", bump(&count));
        sleep(Duration::from_millis(60)).await;
        batcher.run("b", bump(&count));
        sleep(Duration::from_millis(50)).await;

        // Flushed at 100ms, riding along with the first call's timer
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_block_suppresses_flush_until_unblock() {
        let batcher = batcher(0, true);
        let count = counter();
        let listened = counter();
        let l = Arc::clone(&listened);
        batcher.add_listener("listener", move || {
            l.fetch_add(1, Ordering::SeqCst);
        });

        batcher.block("testing");
        batcher.run("x", bump(&count));
        let completion = batcher.completion();
        sleep(Duration::from_millis(10)).await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(listened.load(Ordering::SeqCst), 0);
        assert_eq!(batcher.staged_len(), 1);
        assert!(!batcher.has_pending_timer());
        assert!(!completion.is_settled());

        batcher.stage("y", bump(&count));
        batcher.unblock("done");
        assert!(batcher.has_pending_timer());

        assert!(completion.await.is_flushed());
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(listened.load(Ordering::SeqCst), 1);

        // Exactly once
        sleep(Duration::from_millis(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_block_after_scheduling_takes_effect() {
        let batcher = batcher(100, true);
        let count = counter();

        batcher.run("x", bump(&count));
        sleep(Duration::from_millis(50)).await;
        batcher.block("");
        sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        batcher.unblock("");
        sleep(Duration::from_millis(99)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        sleep(Duration::from_millis(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_block_does_not_stack() {
        let batcher = batcher(0, true);
        batcher.block("one");
        batcher.block("two");
        assert!(batcher.is_blocked());

        batcher.unblock("");
        assert!(!batcher.is_blocked());
        batcher.unblock("");
        assert!(!batcher.is_blocked());

        let messages: Vec<_> = batcher
            .batch_log()
            .entries(Some(batcher.name()))
            .into_iter()
            .map(|e| e.message)
            .collect();
        assert!(messages.contains(&"Blocked (was blocked) ; two".to_string()));
        assert!(messages.contains(&"Blocked (was not blocked) ; one".to_string()));
        assert!(messages.contains(&"Unblocked (was not blocked) ; No message".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_discards_batch() {
        let batcher = batcher(50, true);
        let count = counter();
        let listened = counter();
        let l = Arc::clone(&listened);
        batcher.add_listener("listener", move || {
            l.fetch_add(1, Ordering::SeqCst);
        });

        batcher.run("a", bump(&count));
        let completion = batcher.completion();
        batcher.clear("abandon");

        assert_eq!(completion.clone().await, BatchOutcome::Discarded);
        assert_eq!(batcher.staged_len(), 0);
        assert!(!batcher.has_pending_timer());

        sleep(Duration::from_millis(100)).await;
        batcher.run_pending();
        sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(listened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_during_flush_keeps_flushed_outcome() {
        let batcher = batcher(0, true);
        let inner = batcher.clone();
        batcher.run("a", move || inner.clear("from action"));

        let outcome = batcher.completion().await;
        assert!(outcome.is_flushed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_listeners_run_after_actions_once_per_flush() {
        let batcher = batcher(0, true);
        let order = Arc::new(Mutex::new(Vec::new()));

        batcher.add_listener("render", recorder(&order, "listener"));
        let o = Arc::clone(&order);
        batcher.stage("a", move || o.lock().push("a"));
        let o = Arc::clone(&order);
        batcher.run("b", move || o.lock().push("b"));
        batcher.completion().await;

        assert_eq!(*order.lock(), vec!["a", "b", "listener"]);

        let o = Arc::clone(&order);
        batcher.run("c", move || o.lock().push("c"));
        batcher.completion().await;
        assert_eq!(*order.lock(), vec!["a", "b", "listener", "c", "listener"]);

        batcher.remove_listener("render");
        batcher.remove_listener("render");
        let o = Arc::clone(&order);
        batcher.run("d", move || o.lock().push("d"));
        batcher.completion().await;
        assert_eq!(order.lock().last(), Some(&"d"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_listener_last_registration_wins() {
        let batcher = batcher(0, true);
        let order = Arc::new(Mutex::new(Vec::new()));

        batcher.add_listener("one", recorder(&order, "first"));
        batcher.add_listener("two", recorder(&order, "second"));
        batcher.add_listener("one", recorder(&order, "replaced"));

        batcher.run("a", || {});
        let outcome = batcher.completion().await;

        assert_eq!(*order.lock(), vec!["replaced", "second"]);
        assert_eq!(outcome, BatchOutcome::Flushed(FlushReport { actions: 1, listeners: 2, failures: 0 }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_flushes_next_tick() {
        let batcher = batcher(0, true);
        let a = counter();
        let b = counter();

        batcher.stage("a", bump(&a));
        batcher.stage("b", bump(&b));
        batcher.run_pending();
        let completion = batcher.completion();

        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 1);
        assert_eq!(batcher.staged_len(), 0);
        assert!(completion.try_outcome().is_some_and(|o| o.is_flushed()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_action_does_not_stop_batch() {
        let batcher = batcher(0, true);
        let count = counter();
        let listened = counter();
        let l = Arc::clone(&listened);
        batcher.add_listener("listener", move || {
            l.fetch_add(1, Ordering::SeqCst);
        });

        batcher.stage("boom", || panic!("render failed"));
        batcher.run("after", bump(&count));
        let outcome = batcher.completion().await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(listened.load(Ordering::SeqCst), 1);
        assert_eq!(outcome, BatchOutcome::Flushed(FlushReport { actions: 2, listeners: 1, failures: 1 }));
        assert!(batcher
            .batch_log()
            .entries(None)
            .iter()
            .any(|e| e.message == "Action \"boom\" panicked"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiters_share_outcome_and_next_batch_is_fresh() {
        let batcher = batcher(0, true);

        batcher.stage("a", || {});
        let early = batcher.completion();
        batcher.stage("b", || {});
        let late = batcher.completion();
        assert!(early.same_batch(&late));

        batcher.run_pending();
        let (x, y) = futures::join!(early.wait(), late.wait());
        assert!(x.is_flushed());
        assert_eq!(x, y);

        batcher.stage("c", || {});
        let next = batcher.completion();
        assert!(!next.same_batch(&early));
        assert!(!next.is_settled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_actions_staged_during_flush_wait_for_next_flush() {
        let batcher = batcher(0, true);
        let count = counter();

        let inner = batcher.clone();
        let c = Arc::clone(&count);
        batcher.run("outer", move || {
            inner.run("inner", bump(&c));
        });

        let first = batcher.completion();
        assert!(first.clone().await.is_flushed());

        let second = batcher.completion();
        assert!(!second.same_batch(&first));
        assert!(second.await.is_flushed());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_cancels_timer() {
        let batcher = batcher(50, true);
        let count = counter();

        batcher.run("a", bump(&count));
        let completion = batcher.completion();
        batcher.dispose();

        assert_eq!(completion.await, BatchOutcome::Discarded);
        sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        batcher.run("b", bump(&count));
        assert_eq!(batcher.staged_len(), 0);
        assert!(!batcher.has_pending_timer());
        assert!(batcher.is_disposed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_last_handle_cancels_timer() {
        let count = counter();
        {
            let batcher = batcher(50, true);
            batcher.run("a", bump(&count));
        }
        sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_log_records_staging() {
        let log = BatchLog::default();
        let batcher = ActionBatcher::new(BatcherConfig::new("squares"), log.clone());
        assert_eq!(batcher.name(), "ActionBatcher-1-squares");

        batcher.stage("a", || {});
        batcher.stage("a", || {});

        let messages: Vec<_> = log.entries(None).into_iter().map(|e| e.message).collect();
        assert_eq!(messages[0], "Action \"a\" re-staged");
        assert_eq!(messages[1], "Action \"a\" staged");

        let other = ActionBatcher::new(BatcherConfig::new("other"), log.clone());
        assert_eq!(other.name(), "ActionBatcher-2-other");

        let mut out = Vec::new();
        batcher.write_log(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 2);
    }

    #[test]
    fn test_run_outside_runtime_leaves_batch_staged() {
        let batcher = batcher(0, true);
        batcher.run("a", || {});
        assert_eq!(batcher.staged_len(), 1);
        assert!(!batcher.has_pending_timer());
    }
}
