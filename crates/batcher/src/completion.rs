//! Batch completion signal
//!
//! A batch settles exactly once: either its actions ran (`Flushed`) or it was
//! thrown away (`Discarded`). Any number of waiters may hold a `Completion`
//! for the same batch and all observe the same outcome.

use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::watch;

/// Counts from a completed flush
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Staged actions that were invoked
    pub actions: usize,
    /// Listeners that were invoked
    pub listeners: usize,
    /// Actions or listeners that panicked
    pub failures: usize,
}

/// How a batch settled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// The staged actions ran
    Flushed(FlushReport),
    /// The batch was cleared (or nothing was ever staged)
    Discarded,
}

impl BatchOutcome {
    pub fn is_flushed(&self) -> bool {
        matches!(self, BatchOutcome::Flushed(_))
    }
}

/// Producer side, owned by the batcher
pub(crate) struct CompletionSignal {
    tx: watch::Sender<Option<BatchOutcome>>,
}

impl CompletionSignal {
    /// A signal that has not settled yet
    pub(crate) fn pending() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// A signal that is already settled with `outcome`
    pub(crate) fn settled(outcome: BatchOutcome) -> Self {
        let (tx, _rx) = watch::channel(Some(outcome));
        Self { tx }
    }

    pub(crate) fn is_settled(&self) -> bool {
        self.tx.borrow().is_some()
    }

    pub(crate) fn outcome(&self) -> Option<BatchOutcome> {
        *self.tx.borrow()
    }

    /// Settle the signal. The first outcome wins; returns false if already settled.
    pub(crate) fn resolve(&self, outcome: BatchOutcome) -> bool {
        self.tx.send_if_modified(|slot| {
            if slot.is_none() {
                *slot = Some(outcome);
                true
            } else {
                false
            }
        })
    }
}

/// Waiter side of a batch's completion
///
/// Awaiting a `Completion` (or calling [`Completion::wait`]) returns once the
/// batch it was taken from has flushed or been cleared.
#[derive(Clone)]
pub struct Completion {
    signal: Arc<CompletionSignal>,
}

impl Completion {
    pub(crate) fn new(signal: Arc<CompletionSignal>) -> Self {
        Self { signal }
    }

    /// Wait for the batch to settle
    pub async fn wait(&self) -> BatchOutcome {
        let mut rx = self.signal.tx.subscribe();
        // The sender lives as long as `self.signal`
        let settled = match rx.wait_for(Option::is_some).await {
            Ok(value) => *value,
            Err(_) => None,
        };
        settled.unwrap_or(BatchOutcome::Discarded)
    }

    /// The outcome if the batch has already settled
    pub fn try_outcome(&self) -> Option<BatchOutcome> {
        self.signal.outcome()
    }

    pub fn is_settled(&self) -> bool {
        self.signal.is_settled()
    }

    /// Whether two handles refer to the same batch
    pub fn same_batch(&self, other: &Completion) -> bool {
        Arc::ptr_eq(&self.signal, &other.signal)
    }
}

impl IntoFuture for Completion {
    type Output = BatchOutcome;
    type IntoFuture = Pin<Box<dyn Future<Output = BatchOutcome> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move { self.wait().await })
    }
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("outcome", &self.signal.outcome())
            .finish()
    }
}
