//! Keyed action batching
//!
//! This crate provides:
//! - `ActionBatcher`: coalesces keyed callbacks into a single timed flush
//!   (last write wins per key, optional debounce, block/unblock)
//! - `Completion`: a multi-waiter signal resolved when a batch flushes or is cleared
//! - `BatchLog`: a bounded, shareable diagnostic log for batcher activity

pub mod batcher;
pub mod completion;
pub mod config;
pub mod log;

// Re-exports
pub use batcher::ActionBatcher;
pub use completion::{BatchOutcome, Completion, FlushReport};
pub use config::BatcherConfig;
pub use log::{BatchLog, LogEntry, DEFAULT_LOG_CAPACITY};
