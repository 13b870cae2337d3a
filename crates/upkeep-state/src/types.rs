//! Domain types for the upkeep state store.
//!
//! These types represent the persisted configuration of monitors, alert
//! bindings, and users. All types are serializable to/from JSON for
//! storage in redb tables. Runtime probe state lives in `upkeep-engine`
//! and is never persisted.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for a monitor. Never reused once assigned.
pub type MonitorId = i64;

/// Unique identifier for an alert configuration. `0` means "no alerts".
pub type AlertId = i64;

/// Unique identifier for a user.
pub type UserId = i64;

// ── Monitor ───────────────────────────────────────────────────────

/// How a monitor observes its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorKind {
    /// Actively probed with an outbound HTTP GET.
    Http,
    /// Passively observed via inbound heartbeats carrying a token.
    Push,
}

/// Confirmed status of a monitor after debouncing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonitorStatus {
    /// Discovered but not yet probed.
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "UP")]
    Up,
    #[serde(rename = "DOWN")]
    Down,
    /// The target responded but its certificate has expired.
    #[serde(rename = "SSL EXP")]
    SslExpired,
}

impl MonitorStatus {
    /// Whether this status counts as a broken state for alerting purposes.
    pub fn is_broken(self) -> bool {
        matches!(self, MonitorStatus::Down | MonitorStatus::SslExpired)
    }
}

impl fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MonitorStatus::Pending => "PENDING",
            MonitorStatus::Up => "UP",
            MonitorStatus::Down => "DOWN",
            MonitorStatus::SslExpired => "SSL EXP",
        };
        f.write_str(s)
    }
}

/// Persisted configuration for one observed target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Monitor {
    pub id: MonitorId,
    pub name: String,
    pub kind: MonitorKind,
    /// Target URL. Required for `http` monitors, unused for `push`.
    pub url: String,
    /// Heartbeat token. Assigned at creation for `push` monitors and
    /// immutable afterwards; empty for `http`.
    pub token: String,
    /// Check cadence in seconds. Clamped to >= 5 at scheduling time.
    pub interval_secs: u64,
    /// Consecutive failed raw checks tolerated before a confirmed DOWN.
    pub max_retries: u32,
    /// Inspect the peer certificate on each probe (`http` only).
    pub check_ssl: bool,
    /// Warn when the certificate expires within this many days.
    pub expiry_threshold_days: i64,
    /// Alert configuration to notify on edges. `0` disables alerting.
    pub alert_id: AlertId,
}

/// Parameters for creating a monitor. The store assigns the id and, for
/// `push` monitors, generates the token.
#[derive(Debug, Clone)]
pub struct NewMonitor {
    pub name: String,
    pub kind: MonitorKind,
    pub url: String,
    pub interval_secs: u64,
    pub max_retries: u32,
    pub check_ssl: bool,
    pub expiry_threshold_days: i64,
    pub alert_id: AlertId,
}

// ── Alert configuration ───────────────────────────────────────────

/// Transport kind of an alert configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Discord,
    Slack,
    Webhook,
    Email,
}

/// A named notification binding.
///
/// Required settings keys depend on the kind: `discord`/`slack`/`webhook`
/// need `url`; `email` needs `host`, `user`, `pass`, `from`, `to` and
/// accepts an optional `port` (default `"25"`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertConfig {
    pub id: AlertId,
    pub name: String,
    pub kind: AlertKind,
    pub settings: HashMap<String, String>,
}

// ── User ──────────────────────────────────────────────────────────

/// An operator account. Consumed by external session auth; the core only
/// stores and lists these.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub public_key: String,
    pub role: String,
}
