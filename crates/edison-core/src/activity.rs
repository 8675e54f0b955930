//! Activity log: a bounded, in-memory feed of human-readable events.
//!
//! This is what the dashboard's "Recent Activity" panel shows. It is not a
//! replacement for `tracing`; callers usually emit both.

use chrono::Local;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Default number of entries kept.
pub const DEFAULT_CAPACITY: usize = 50;

/// First entry of a fresh log.
pub const STARTED_SENTINEL: &str = "> Bot server started";

/// Only entry of a cleared log.
pub const CLEARED_SENTINEL: &str = "> Logs cleared";

/// Bounded FIFO of log lines. Oldest entries fall off past `capacity`.
#[derive(Debug)]
pub struct ActivityLog {
    entries: Mutex<VecDeque<String>>,
    capacity: usize,
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ActivityLog {
    /// Create a log holding the start-up sentinel. `capacity` is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut entries = VecDeque::with_capacity(capacity);
        entries.push_back(STARTED_SENTINEL.to_string());
        Self {
            entries: Mutex::new(entries),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append `message` as `> [HH:MM:SS] message`.
    pub fn push(&self, message: impl AsRef<str>) {
        let line = format!(
            "> [{}] {}",
            Local::now().format("%H:%M:%S"),
            message.as_ref()
        );
        self.push_line(line);
    }

    /// Append a preformatted line.
    pub fn push_line(&self, line: String) {
        let mut entries = self.lock();
        entries.push_back(line);
        while entries.len() > self.capacity {
            entries.pop_front();
        }
    }

    /// Like [`push`](Self::push) but gives up instead of blocking when the log is
    /// locked. Used from the panic hook, which may run on a thread holding the lock.
    pub fn try_push(&self, message: impl AsRef<str>) -> bool {
        let Ok(mut entries) = self.entries.try_lock() else {
            return false;
        };
        entries.push_back(format!(
            "> [{}] {}",
            Local::now().format("%H:%M:%S"),
            message.as_ref()
        ));
        while entries.len() > self.capacity {
            entries.pop_front();
        }
        true
    }

    /// Copy of the current entries, oldest first.
    pub fn snapshot(&self) -> Vec<String> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop everything and leave the single cleared sentinel.
    pub fn clear(&self) {
        let mut entries = self.lock();
        entries.clear();
        entries.push_back(CLEARED_SENTINEL.to_string());
    }

    // A panic while holding the lock cannot leave the deque half-written,
    // so a poisoned lock is still safe to use.
    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}
