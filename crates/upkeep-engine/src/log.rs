//! Bounded in-memory event log.
//!
//! Newest entries first, trimmed to a fixed capacity. Read by the UI and
//! status surfaces; written by the engine on alert emissions and cluster
//! transitions.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::Local;

/// Default number of retained entries.
pub const LOG_CAPACITY: usize = 100;

/// A bounded, newest-first ring of `[HH:MM:SS] text` entries.
pub struct LogRing {
    entries: Mutex<VecDeque<String>>,
    capacity: usize,
}

impl LogRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Append an entry at the head, stamped with the local wall clock.
    pub fn push(&self, message: &str) {
        let entry = format!("[{}] {}", Local::now().format("%H:%M:%S"), message);
        let mut entries = self.entries.lock().expect("log ring lock");
        entries.push_front(entry);
        entries.truncate(self.capacity);
    }

    /// Copy out all entries, newest first.
    pub fn entries(&self) -> Vec<String> {
        let entries = self.entries.lock().expect("log ring lock");
        entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("log ring lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for LogRing {
    fn default() -> Self {
        Self::new(LOG_CAPACITY)
    }
}
