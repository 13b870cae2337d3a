//! Status transition machine.
//!
//! Converts raw probe outcomes into confirmed status transitions using
//! the monitor's retry tolerance, and emits alert events on edges. The
//! runtime mutation and the emission decision happen under the live-map
//! write lock; delivery itself is handed to the dispatcher afterwards so
//! a slow transport never blocks a probe.

use chrono::Utc;

use upkeep_state::{MonitorId, MonitorKind, MonitorStatus};

use crate::engine::Engine;
use crate::probe::ProbeOutcome;

pub const ALERT_TITLE: &str = "ALERT";
pub const RECOVERY_TITLE: &str = "RECOVERY";
pub const SSL_WARNING_TITLE: &str = "SSL WARNING";

/// Apply one raw outcome to the debounce state machine.
///
/// Returns the new confirmed status and failure count.
///
/// From UP, failures accumulate until they exceed `max_retries`; the
/// confirmed status then jumps to the raw status with the counter pinned
/// at `max_retries + 1` ("confirmed broken"). From PENDING or an already
/// broken state, a single failure confirms immediately. Any raw UP
/// resets the machine.
pub fn step(
    prior: MonitorStatus,
    failure_count: u32,
    max_retries: u32,
    raw: MonitorStatus,
) -> (MonitorStatus, u32) {
    if raw == MonitorStatus::Up {
        return (MonitorStatus::Up, 0);
    }

    match prior {
        MonitorStatus::Up => {
            let failures = failure_count + 1;
            if failures <= max_retries {
                (MonitorStatus::Up, failures)
            } else {
                (raw, max_retries + 1)
            }
        }
        // PENDING is not a healthy baseline: the first failure confirms.
        MonitorStatus::Pending | MonitorStatus::Down | MonitorStatus::SslExpired => {
            (raw, max_retries + 1)
        }
    }
}

struct Emission {
    title: &'static str,
    body: String,
}

impl Engine {
    /// Feed one raw outcome through the transition machine.
    ///
    /// Updates the monitor's runtime fields, decides emissions under the
    /// same exclusion, then logs and dispatches. A passive engine
    /// mutates nothing and emits nothing, even if the flag flipped while
    /// the probe was in flight.
    pub async fn apply_outcome(&self, id: MonitorId, outcome: ProbeOutcome) {
        let mut emissions: Vec<Emission> = Vec::new();
        let alert_id;
        {
            let mut live = self.live.write().await;
            if !self.is_active() {
                return;
            }
            let Some(state) = live.get_mut(&id) else {
                return;
            };

            let prior = state.status;
            let (next, failures) = step(
                prior,
                state.failure_count,
                state.monitor.max_retries,
                outcome.status,
            );

            state.status = next;
            state.failure_count = failures;
            state.status_code = outcome.status_code;
            state.latency_ms = outcome.latency_ms;
            state.last_check = Some(Utc::now());
            if let Some(cert) = &outcome.cert {
                state.has_ssl = true;
                state.cert_expiry = Some(cert.not_after);
            }

            if !prior.is_broken() && next.is_broken() {
                let body = match state.monitor.kind {
                    MonitorKind::Http => format!(
                        "Monitor '{}' is DOWN ({})",
                        state.monitor.name, outcome.status
                    ),
                    MonitorKind::Push => {
                        format!("Push Monitor '{}' missed heartbeat.", state.monitor.name)
                    }
                };
                emissions.push(Emission {
                    title: ALERT_TITLE,
                    body,
                });
            }
            if prior.is_broken() && next == MonitorStatus::Up {
                emissions.push(Emission {
                    title: RECOVERY_TITLE,
                    body: format!("Monitor '{}' is UP", state.monitor.name),
                });
            }

            // Expiry warning, independent of the UP/DOWN transition. Uses
            // the certificate recorded by this probe, so a freshly rotated
            // certificate re-arms or warns on the same cycle.
            if state.monitor.check_ssl
                && state.has_ssl
                && outcome.status != MonitorStatus::SslExpired
            {
                if let Some(expiry) = state.cert_expiry {
                    let days_left = (expiry - Utc::now()).num_days();
                    if days_left <= state.monitor.expiry_threshold_days {
                        if !state.sent_ssl_warning {
                            state.sent_ssl_warning = true;
                            emissions.push(Emission {
                                title: SSL_WARNING_TITLE,
                                body: format!(
                                    "Certificate for '{}' expires in {} days",
                                    state.monitor.name, days_left
                                ),
                            });
                        }
                    } else {
                        state.sent_ssl_warning = false;
                    }
                }
            }

            alert_id = state.monitor.alert_id;
        }

        for emission in emissions {
            self.log(&format!("{}: {}", emission.title, emission.body));
            self.dispatcher
                .dispatch(alert_id, emission.title, &emission.body);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Duration as ChronoDuration;
    use upkeep_state::{Monitor, StateStore, Store};

    use crate::probe::CertInfo;

    use upkeep_state::MonitorStatus::{Down, Pending, SslExpired, Up};

    fn monitor(max_retries: u32) -> Monitor {
        Monitor {
            id: 1,
            name: "api".to_string(),
            kind: MonitorKind::Http,
            url: "https://api.example.com".to_string(),
            token: String::new(),
            interval_secs: 5,
            max_retries,
            check_ssl: false,
            expiry_threshold_days: 7,
            alert_id: 0,
        }
    }

    async fn engine_with(monitor: Monitor) -> Arc<Engine> {
        let store: Arc<dyn Store> = Arc::new(StateStore::open_in_memory().unwrap());
        let engine = Arc::new(Engine::new(store));
        engine.adopt(monitor).await;
        engine
    }

    fn ssl_outcome(days_from_now: i64) -> ProbeOutcome {
        ProbeOutcome {
            status: Up,
            status_code: 200,
            latency_ms: 12,
            cert: Some(CertInfo {
                not_after: Utc::now() + ChronoDuration::days(days_from_now),
            }),
        }
    }

    fn alert_count(engine: &Engine) -> usize {
        engine.logs().len()
    }

    // ── step: the debounce table ───────────────────────────────────

    #[test]
    fn up_on_up_stays_clean() {
        assert_eq!(step(Up, 0, 2, Up), (Up, 0));
    }

    #[test]
    fn up_absorbs_failures_within_tolerance() {
        assert_eq!(step(Up, 0, 2, Down), (Up, 1));
        assert_eq!(step(Up, 1, 2, Down), (Up, 2));
        assert_eq!(step(Up, 2, 2, Down), (Down, 3));
    }

    #[test]
    fn broken_state_takes_the_raw_status() {
        assert_eq!(step(Down, 3, 2, Down), (Down, 3));
        // A DOWN monitor whose certificate then expires moves to SSL EXP.
        assert_eq!(step(Down, 3, 2, SslExpired), (SslExpired, 3));
        assert_eq!(step(SslExpired, 3, 2, Down), (Down, 3));
    }

    #[test]
    fn any_up_restores_immediately() {
        assert_eq!(step(Down, 3, 2, Up), (Up, 0));
        assert_eq!(step(SslExpired, 3, 2, Up), (Up, 0));
        assert_eq!(step(Pending, 0, 2, Up), (Up, 0));
    }

    #[test]
    fn pending_confirms_on_first_failure() {
        // PENDING bypasses the increment and jumps straight to confirmed.
        assert_eq!(step(Pending, 0, 2, Down), (Down, 3));
        assert_eq!(step(Pending, 0, 0, Down), (Down, 1));
    }

    #[test]
    fn failure_count_stays_in_bounds() {
        let max_retries = 3;
        let mut status = Up;
        let mut failures = 0;
        for _ in 0..10 {
            let (next, count) = step(status, failures, max_retries, Down);
            assert!(count <= max_retries + 1);
            status = next;
            failures = count;
        }
        assert_eq!(status, Down);
        assert_eq!(failures, max_retries + 1);
    }

    #[test]
    fn up_implies_zero_failures() {
        for prior in [Up, Down, SslExpired, Pending] {
            for failures in [0, 1, 5] {
                let (next, count) = step(prior, failures, 2, Up);
                assert_eq!(next, Up);
                assert_eq!(count, 0);
            }
        }
    }

    // ── apply_outcome: scenarios ───────────────────────────────────

    /// Debounce: raw [DOWN, DOWN, DOWN, UP] with tolerance 2 confirms
    /// [UP, UP, DOWN, UP] and emits one alert plus one recovery.
    #[tokio::test]
    async fn debounce_scenario() {
        let engine = engine_with(monitor(2)).await;

        // Bring the monitor UP first.
        engine.apply_outcome(1, ProbeOutcome::up(200)).await;
        assert_eq!(engine.monitor_state(1).await.unwrap().status, Up);
        let baseline = alert_count(&engine);

        engine.apply_outcome(1, ProbeOutcome::down(500)).await;
        assert_eq!(engine.monitor_state(1).await.unwrap().status, Up);
        engine.apply_outcome(1, ProbeOutcome::down(500)).await;
        assert_eq!(engine.monitor_state(1).await.unwrap().status, Up);
        assert_eq!(alert_count(&engine), baseline);

        engine.apply_outcome(1, ProbeOutcome::down(500)).await;
        let state = engine.monitor_state(1).await.unwrap();
        assert_eq!(state.status, Down);
        assert_eq!(state.failure_count, 3);
        assert_eq!(alert_count(&engine), baseline + 1);
        assert!(engine.logs()[0].contains("ALERT: Monitor 'api' is DOWN (DOWN)"));

        engine.apply_outcome(1, ProbeOutcome::up(200)).await;
        let state = engine.monitor_state(1).await.unwrap();
        assert_eq!(state.status, Up);
        assert_eq!(state.failure_count, 0);
        assert_eq!(alert_count(&engine), baseline + 2);
        assert!(engine.logs()[0].contains("RECOVERY: Monitor 'api' is UP"));
    }

    /// Zero tolerance: a PENDING monitor confirms DOWN and alerts on the
    /// very first failure.
    #[tokio::test]
    async fn zero_tolerance_scenario() {
        let engine = engine_with(monitor(0)).await;

        engine.apply_outcome(1, ProbeOutcome::down(0)).await;

        let state = engine.monitor_state(1).await.unwrap();
        assert_eq!(state.status, Down);
        assert_eq!(state.failure_count, 1);
        assert_eq!(alert_count(&engine), 1);
    }

    #[tokio::test]
    async fn pending_to_up_emits_nothing() {
        let engine = engine_with(monitor(2)).await;
        engine.apply_outcome(1, ProbeOutcome::up(200)).await;

        assert_eq!(engine.monitor_state(1).await.unwrap().status, Up);
        assert_eq!(alert_count(&engine), 0);
    }

    #[tokio::test]
    async fn runtime_fields_follow_the_outcome() {
        let engine = engine_with(monitor(0)).await;

        engine
            .apply_outcome(
                1,
                ProbeOutcome {
                    status: Up,
                    status_code: 204,
                    latency_ms: 87,
                    cert: None,
                },
            )
            .await;

        let state = engine.monitor_state(1).await.unwrap();
        assert_eq!(state.status_code, 204);
        assert_eq!(state.latency_ms, 87);
        assert!(state.last_check.is_some());
        assert!(!state.has_ssl);
    }

    /// SSL warning arms once per contiguous window and re-arms after the
    /// certificate is rotated out past the threshold.
    #[tokio::test]
    async fn ssl_warning_arm_and_clear_scenario() {
        let mut m = monitor(0);
        m.check_ssl = true;
        m.expiry_threshold_days = 7;
        let engine = engine_with(m).await;

        // Certificate expiring within the threshold: exactly one warning.
        engine.apply_outcome(1, ssl_outcome(6)).await;
        let state = engine.monitor_state(1).await.unwrap();
        assert!(state.sent_ssl_warning);
        assert!(state.has_ssl);
        assert_eq!(alert_count(&engine), 1);
        assert!(engine.logs()[0].contains("SSL WARNING"));

        // Same conditions next cycle: no second warning.
        engine.apply_outcome(1, ssl_outcome(6)).await;
        assert_eq!(alert_count(&engine), 1);

        // Rotated to a long-lived certificate: flag clears, no alert.
        engine.apply_outcome(1, ssl_outcome(30)).await;
        let state = engine.monitor_state(1).await.unwrap();
        assert!(!state.sent_ssl_warning);
        assert_eq!(alert_count(&engine), 1);

        // Rotated back to a short one: exactly one new warning.
        engine.apply_outcome(1, ssl_outcome(5)).await;
        let state = engine.monitor_state(1).await.unwrap();
        assert!(state.sent_ssl_warning);
        assert_eq!(alert_count(&engine), 2);
    }

    #[tokio::test]
    async fn expired_certificate_overrides_and_skips_warning() {
        let mut m = monitor(0);
        m.check_ssl = true;
        let engine = engine_with(m).await;

        let outcome = ProbeOutcome {
            status: SslExpired,
            status_code: 200,
            latency_ms: 10,
            cert: Some(CertInfo {
                not_after: Utc::now() - ChronoDuration::days(1),
            }),
        };
        engine.apply_outcome(1, outcome).await;

        let state = engine.monitor_state(1).await.unwrap();
        assert_eq!(state.status, SslExpired);
        // The broken-edge alert fires; the warning path does not.
        assert_eq!(alert_count(&engine), 1);
        assert!(engine.logs()[0].contains("ALERT: Monitor 'api' is DOWN (SSL EXP)"));
        assert!(!state.sent_ssl_warning);
    }

    /// Passive suppression: a completed probe mutates nothing and emits
    /// nothing while the engine is passive.
    #[tokio::test]
    async fn passive_engine_suppresses_everything() {
        let engine = engine_with(monitor(0)).await;
        engine.apply_outcome(1, ProbeOutcome::up(200)).await;
        let before = engine.monitor_state(1).await.unwrap();
        let logs_before = alert_count(&engine);

        engine.set_active(false);
        engine.apply_outcome(1, ProbeOutcome::down(500)).await;

        let after = engine.monitor_state(1).await.unwrap();
        assert_eq!(after.status, before.status);
        assert_eq!(after.failure_count, before.failure_count);
        assert_eq!(after.status_code, before.status_code);
        assert_eq!(after.last_check, before.last_check);
        assert_eq!(alert_count(&engine), logs_before);
    }

    #[tokio::test]
    async fn push_monitor_alert_body() {
        let mut m = monitor(0);
        m.kind = MonitorKind::Push;
        m.name = "cron-worker".to_string();
        m.token = "feed".repeat(8);
        let engine = engine_with(m).await;

        engine.apply_outcome(1, ProbeOutcome::down(0)).await;
        assert!(engine.logs()[0]
            .contains("ALERT: Push Monitor 'cron-worker' missed heartbeat."));
    }

    #[tokio::test]
    async fn single_up_after_broken_restores_with_one_recovery() {
        let engine = engine_with(monitor(3)).await;
        engine.apply_outcome(1, ProbeOutcome::up(200)).await;
        for _ in 0..4 {
            engine.apply_outcome(1, ProbeOutcome::down(503)).await;
        }
        assert_eq!(engine.monitor_state(1).await.unwrap().status, Down);
        let downs = alert_count(&engine);

        engine.apply_outcome(1, ProbeOutcome::up(200)).await;

        let state = engine.monitor_state(1).await.unwrap();
        assert_eq!(state.status, Up);
        assert_eq!(state.failure_count, 0);
        assert_eq!(alert_count(&engine), downs + 1);
    }

    #[tokio::test]
    async fn outcome_for_unknown_monitor_is_ignored() {
        let engine = engine_with(monitor(0)).await;
        engine.apply_outcome(99, ProbeOutcome::down(0)).await;
        assert_eq!(alert_count(&engine), 0);
    }
}
