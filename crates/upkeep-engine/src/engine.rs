//! The engine value shared by all monitoring tasks.
//!
//! Owns the live-state map, the engine-active flag, the log ring, and
//! the alert dispatcher. Built once by the composition root and handed
//! out as `Arc<Engine>` to the supervisor, probe tasks, the cluster
//! coordinator, and the HTTP handlers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use upkeep_alert::AlertDispatcher;
use upkeep_state::{Monitor, MonitorId, Store};

use crate::live::MonitorState;
use crate::log::LogRing;

/// Shared monitoring engine state.
///
/// The live map is guarded by an async `RwLock` and is never held across
/// network I/O. The active flag is only ever read or swapped atomically:
/// when it is false the engine is passive, meaning probe tasks idle,
/// alerts are suppressed, and heartbeat ingress rejects.
pub struct Engine {
    pub(crate) store: Arc<dyn Store>,
    pub(crate) live: RwLock<HashMap<MonitorId, MonitorState>>,
    pub(crate) active: AtomicBool,
    pub(crate) log: LogRing,
    pub(crate) dispatcher: AlertDispatcher,
}

impl Engine {
    /// Build an engine over the given store. Starts active; a follower
    /// coordinator flips it passive before probing begins to matter.
    pub fn new(store: Arc<dyn Store>) -> Self {
        let dispatcher = AlertDispatcher::new(Arc::clone(&store));
        Self {
            store,
            live: RwLock::new(HashMap::new()),
            active: AtomicBool::new(true),
            log: LogRing::default(),
            dispatcher,
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    // ── Active flag ────────────────────────────────────────────────

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }

    // ── Event log ──────────────────────────────────────────────────

    /// Append a line to the user-visible event log.
    pub fn log(&self, message: &str) {
        self.log.push(message);
    }

    /// Copy out the event log, newest first.
    pub fn logs(&self) -> Vec<String> {
        self.log.entries()
    }

    // ── Live state ─────────────────────────────────────────────────

    /// Snapshot of every monitor's runtime state, ordered by id.
    pub async fn snapshot(&self) -> Vec<MonitorState> {
        let live = self.live.read().await;
        let mut states: Vec<MonitorState> = live.values().cloned().collect();
        states.sort_by_key(|s| s.monitor.id);
        states
    }

    /// Runtime state for one monitor, if it is currently observed.
    pub async fn monitor_state(&self, id: MonitorId) -> Option<MonitorState> {
        let live = self.live.read().await;
        live.get(&id).cloned()
    }

    /// Insert a fresh runtime entry for a monitor. Returns false if the
    /// monitor is already observed (the entry is left untouched).
    pub(crate) async fn adopt(&self, monitor: Monitor) -> bool {
        let mut live = self.live.write().await;
        if live.contains_key(&monitor.id) {
            return false;
        }
        live.insert(monitor.id, MonitorState::new(monitor));
        true
    }

    /// Apply a config change to a live monitor, keeping its runtime
    /// fields. Returns false if the monitor is not observed.
    pub async fn update_monitor_config(&self, monitor: &Monitor) -> bool {
        let mut live = self.live.write().await;
        match live.get_mut(&monitor.id) {
            Some(state) => {
                state.monitor = monitor.clone();
                true
            }
            None => false,
        }
    }

    /// Drop a monitor from live state. Its probe task observes the
    /// absence on its next wake and terminates.
    pub async fn remove_monitor(&self, id: MonitorId) -> bool {
        let mut live = self.live.write().await;
        let removed = live.remove(&id).is_some();
        if removed {
            debug!(monitor_id = id, "monitor removed from live state");
        }
        removed
    }
}
