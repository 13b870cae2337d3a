//! Runtime state of a monitor.
//!
//! One `MonitorState` exists per monitor in the live map while the
//! monitor is observed. These fields are ephemeral: they reset to
//! defaults if a monitor is removed and re-added.

use chrono::{DateTime, Utc};
use serde::Serialize;

use upkeep_state::{Monitor, MonitorKind, MonitorStatus};

/// Persisted config plus the probe state accumulated at runtime.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorState {
    /// Configuration snapshot. Refreshed by explicit config updates, not
    /// by the supervisor.
    pub monitor: Monitor,
    /// Confirmed (debounced) status.
    pub status: MonitorStatus,
    /// HTTP status code of the last raw check (0 on transport error).
    pub status_code: u16,
    /// Latency of the last raw check.
    pub latency_ms: u64,
    /// Last probe completion, or last heartbeat for push monitors.
    pub last_check: Option<DateTime<Utc>>,
    /// `not_after` of the most recently observed peer certificate.
    pub cert_expiry: Option<DateTime<Utc>>,
    /// Whether a peer certificate has been observed.
    pub has_ssl: bool,
    /// Consecutive non-UP raw checks. `max_retries + 1` means confirmed broken.
    pub failure_count: u32,
    /// An expiry warning went out for the current certificate.
    pub sent_ssl_warning: bool,
}

impl MonitorState {
    /// Fresh entry for a newly discovered monitor.
    ///
    /// Push monitors start their heartbeat window at discovery time so a
    /// quiet agent is only considered missing one full interval later.
    pub fn new(monitor: Monitor) -> Self {
        let last_check = match monitor.kind {
            MonitorKind::Push => Some(Utc::now()),
            MonitorKind::Http => None,
        };
        Self {
            monitor,
            status: MonitorStatus::Pending,
            status_code: 0,
            latency_ms: 0,
            last_check,
            cert_expiry: None,
            has_ssl: false,
            failure_count: 0,
            sent_ssl_warning: false,
        }
    }
}
