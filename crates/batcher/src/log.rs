//! Bounded diagnostic log shared by batchers
//!
//! Each batcher records what it stages, runs, blocks and clears. The log is an
//! explicit handle so tests and embedders decide who shares it and whether
//! entries are mirrored to the tracing output.

use chrono::{DateTime, Local};
use chrono_tz::Tz;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

/// Number of entries retained when no capacity is given
pub const DEFAULT_LOG_CAPACITY: usize = 50;

const TIMESTAMP_FORMAT: &str = "%-m/%-d/%Y, %H:%M:%S%.3f %Z";

/// The system's IANA zone, if it can be determined
fn local_zone() -> Option<Tz> {
    static ZONE: OnceLock<Option<Tz>> = OnceLock::new();
    *ZONE.get_or_init(|| {
        iana_time_zone::get_timezone()
            .ok()
            .and_then(|name| name.parse().ok())
    })
}

/// Format with the zone abbreviation (`EST`), or the numeric offset when the
/// zone is unknown
fn format_timestamp(timestamp: &DateTime<Local>, zone: Option<Tz>) -> String {
    match zone {
        Some(tz) => timestamp.with_timezone(&tz).format(TIMESTAMP_FORMAT).to_string(),
        None => timestamp.format(TIMESTAMP_FORMAT).to_string(),
    }
}

/// A single log record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// When the entry was recorded
    pub timestamp: DateTime<Local>,
    /// Full name of the batcher that recorded it
    pub batcher: String,
    /// What happened
    pub message: String,
}

impl LogEntry {
    /// Render as `timestamp ; batcher ; message`
    pub fn render(&self) -> String {
        format!(
            "{} ; {} ; {}",
            format_timestamp(&self.timestamp, local_zone()),
            self.batcher,
            self.message
        )
    }
}

/// Ring buffer of batcher activity (newest first)
///
/// Cloning the handle shares the same buffer.
#[derive(Clone)]
pub struct BatchLog {
    inner: Arc<LogInner>,
}

struct LogInner {
    entries: Mutex<VecDeque<LogEntry>>,
    capacity: AtomicUsize,
    console: AtomicBool,
    instances: AtomicUsize,
}

impl BatchLog {
    /// Create a log retaining at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(LogInner {
                entries: Mutex::new(VecDeque::with_capacity(capacity)),
                capacity: AtomicUsize::new(capacity),
                console: AtomicBool::new(false),
                instances: AtomicUsize::new(0),
            }),
        }
    }

    /// Enable or disable the immediate tracing mirror
    pub fn with_console_logging(self, enabled: bool) -> Self {
        self.set_console_logging(enabled);
        self
    }

    /// Record a message for a batcher
    pub fn record(&self, batcher: &str, message: impl Into<String>) {
        let entry = LogEntry {
            timestamp: Local::now(),
            batcher: batcher.to_string(),
            message: message.into(),
        };

        if self.console_logging() {
            tracing::info!(target: "batcher::log", "{}", entry.render());
        }

        let capacity = self.capacity();
        let mut entries = self.inner.entries.lock();
        entries.push_front(entry);
        entries.truncate(capacity);
    }

    /// Maximum number of retained entries
    pub fn capacity(&self) -> usize {
        self.inner.capacity.load(Ordering::Relaxed)
    }

    /// Change the capacity, dropping the oldest entries if it shrinks
    pub fn set_capacity(&self, capacity: usize) {
        self.inner.capacity.store(capacity, Ordering::Relaxed);
        self.inner.entries.lock().truncate(capacity);
    }

    pub fn console_logging(&self) -> bool {
        self.inner.console.load(Ordering::Relaxed)
    }

    pub fn set_console_logging(&self, enabled: bool) {
        self.inner.console.store(enabled, Ordering::Relaxed);
    }

    /// Entries for one batcher (or all when `batcher` is `None`), newest first
    pub fn entries(&self, batcher: Option<&str>) -> Vec<LogEntry> {
        self.inner
            .entries
            .lock()
            .iter()
            .filter(|entry| batcher.map_or(true, |name| entry.batcher == name))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.lock().is_empty()
    }

    /// Rendered dump, one entry per line, newest first
    pub fn render(&self, batcher: Option<&str>) -> String {
        self.entries(batcher)
            .iter()
            .map(LogEntry::render)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Write the rendered dump to `writer`
    pub fn write_log<W: Write>(&self, writer: &mut W, batcher: Option<&str>) -> io::Result<()> {
        for entry in self.entries(batcher) {
            writeln!(writer, "{}", entry.render())?;
        }
        Ok(())
    }

    /// Allocate the next batcher instance number (1-based)
    pub(crate) fn next_instance(&self) -> usize {
        self.inner.instances.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl Default for BatchLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}
