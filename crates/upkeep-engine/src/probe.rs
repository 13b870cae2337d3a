//! Probe tasks and the HTTP prober.
//!
//! One task per monitor drives its check cadence. HTTP monitors get an
//! outbound GET with certificate inspection; push monitors get a pure
//! deadline check against their last heartbeat.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::time::sleep;
use tracing::{debug, warn};

use upkeep_state::{MonitorId, MonitorKind, MonitorStatus};

use crate::engine::Engine;
use crate::heartbeat;

/// Total timeout for one probe request.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// How long an idle (passive) probe task sleeps before re-checking the mode.
const PASSIVE_BACKOFF: Duration = Duration::from_secs(5);

/// Floor for the configured check interval.
const MIN_INTERVAL_SECS: u64 = 5;

/// Peer certificate facts captured during a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CertInfo {
    pub not_after: DateTime<Utc>,
}

/// Classification of a single raw check, before debouncing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOutcome {
    /// `Up`, `Down`, or `SslExpired`. Never `Pending`.
    pub status: MonitorStatus,
    pub status_code: u16,
    pub latency_ms: u64,
    pub cert: Option<CertInfo>,
}

impl ProbeOutcome {
    pub fn up(status_code: u16) -> Self {
        Self {
            status: MonitorStatus::Up,
            status_code,
            latency_ms: 0,
            cert: None,
        }
    }

    pub fn down(status_code: u16) -> Self {
        Self {
            status: MonitorStatus::Down,
            status_code,
            latency_ms: 0,
            cert: None,
        }
    }
}

/// Drive one monitor's check cadence until it leaves live state.
///
/// The first check runs immediately. While the engine is passive the
/// task idles; it only exits when the live-state lookup reports the
/// monitor absent.
pub async fn run_probe_loop(engine: Arc<Engine>, id: MonitorId) {
    check_once(&engine, id).await;

    loop {
        if !engine.is_active() {
            sleep(PASSIVE_BACKOFF).await;
            continue;
        }

        let Some(state) = engine.monitor_state(id).await else {
            debug!(monitor_id = id, "monitor gone, probe task exiting");
            return;
        };

        let interval = state.monitor.interval_secs.max(MIN_INTERVAL_SECS);
        sleep(Duration::from_secs(interval)).await;
        check_once(&engine, id).await;
    }
}

/// Perform one raw check and feed the outcome to the transition machine.
async fn check_once(engine: &Engine, id: MonitorId) {
    if !engine.is_active() {
        return;
    }
    let Some(state) = engine.monitor_state(id).await else {
        return;
    };

    let outcome = match state.monitor.kind {
        MonitorKind::Http => {
            Some(http_probe(&state.monitor.url, state.monitor.check_ssl).await)
        }
        MonitorKind::Push => heartbeat::evaluate(&state, Utc::now()),
    };

    if let Some(outcome) = outcome {
        engine.apply_outcome(id, outcome).await;
    }
}

/// One GET against the monitor's URL.
///
/// Certificate verification is disabled on purpose: the point is
/// reachability, and an expired or self-signed certificate must still
/// yield a response whose chain can be inspected.
pub async fn http_probe(url: &str, check_ssl: bool) -> ProbeOutcome {
    let started = Instant::now();

    let client = match reqwest::Client::builder()
        .timeout(PROBE_TIMEOUT)
        .danger_accept_invalid_certs(true)
        .tls_info(check_ssl)
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            warn!(%url, error = %e, "probe client build failed");
            return ProbeOutcome::down(0);
        }
    };

    match client.get(url).send().await {
        Ok(response) => {
            let latency_ms = started.elapsed().as_millis() as u64;
            let status_code = response.status().as_u16();
            let mut status = if status_code >= 400 {
                MonitorStatus::Down
            } else {
                MonitorStatus::Up
            };

            let cert = if check_ssl {
                peer_cert_info(&response)
            } else {
                None
            };
            // An expired certificate overrides the code-based classification.
            if let Some(cert) = &cert {
                if Utc::now() > cert.not_after {
                    status = MonitorStatus::SslExpired;
                }
            }

            ProbeOutcome {
                status,
                status_code,
                latency_ms,
                cert,
            }
        }
        Err(e) => {
            debug!(%url, error = %e, "probe transport error");
            ProbeOutcome {
                status: MonitorStatus::Down,
                status_code: 0,
                latency_ms: started.elapsed().as_millis() as u64,
                cert: None,
            }
        }
    }
}

/// Extract `not_after` from the peer's leaf certificate, if the response
/// carried TLS connection info.
fn peer_cert_info(response: &reqwest::Response) -> Option<CertInfo> {
    let tls = response.extensions().get::<reqwest::tls::TlsInfo>()?;
    let der = tls.peer_certificate()?;
    let (_, cert) = x509_parser::parse_x509_certificate(der).ok()?;
    let not_after = DateTime::<Utc>::from_timestamp(cert.validity().not_after.timestamp(), 0)?;
    Some(CertInfo { not_after })
}
