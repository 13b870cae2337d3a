//! Passive (push) monitor evaluation and heartbeat ingress.
//!
//! Push monitors are never probed over the network. An external agent
//! GETs the heartbeat endpoint with its token; the probe task only
//! checks that the last heartbeat is recent enough.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tracing::debug;

use upkeep_state::{MonitorKind, MonitorStatus};

use crate::engine::Engine;
use crate::live::MonitorState;
use crate::probe::ProbeOutcome;
use crate::transition::RECOVERY_TITLE;

/// Slack added to the interval before a missing heartbeat counts as DOWN.
pub const HEARTBEAT_GRACE_SECS: i64 = 5;

/// Deadline check for a push monitor. Pure; `now` is injected so tests
/// can replay clock scenarios.
///
/// Past the deadline the raw outcome is DOWN. Within the deadline a
/// monitor that is not yet confirmed UP yields a raw UP (code 200) so it
/// converges; an already-UP monitor yields nothing.
pub fn evaluate(state: &MonitorState, now: DateTime<Utc>) -> Option<ProbeOutcome> {
    let last = state.last_check?;
    let deadline = last
        + ChronoDuration::seconds(state.monitor.interval_secs as i64)
        + ChronoDuration::seconds(HEARTBEAT_GRACE_SECS);

    if now > deadline {
        Some(ProbeOutcome::down(0))
    } else if state.status != MonitorStatus::Up {
        Some(ProbeOutcome::up(200))
    } else {
        None
    }
}

impl Engine {
    /// Record an inbound heartbeat carrying `token`.
    ///
    /// Returns false when the engine is passive or no push monitor owns
    /// the token; the ingress maps that to a 404. On success the monitor
    /// is immediately UP, and a recovery alert goes out if it was
    /// confirmed DOWN.
    pub async fn record_heartbeat(&self, token: &str) -> bool {
        if !self.is_active() || token.is_empty() {
            return false;
        }

        let mut recovery = None;
        {
            let mut live = self.live.write().await;
            let Some(state) = live
                .values_mut()
                .find(|s| s.monitor.kind == MonitorKind::Push && s.monitor.token == token)
            else {
                return false;
            };

            let prior = state.status;
            state.last_check = Some(Utc::now());
            state.status = MonitorStatus::Up;
            state.failure_count = 0;

            debug!(monitor_id = state.monitor.id, "heartbeat received");

            if prior == MonitorStatus::Down {
                recovery = Some((
                    state.monitor.alert_id,
                    format!("Monitor '{}' is UP", state.monitor.name),
                ));
            }
        }

        if let Some((alert_id, body)) = recovery {
            self.log(&format!("{RECOVERY_TITLE}: {body}"));
            self.dispatcher.dispatch(alert_id, RECOVERY_TITLE, &body);
        }
        true
    }
}
