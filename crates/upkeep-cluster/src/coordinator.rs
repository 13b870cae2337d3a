//! Cluster coordinator.
//!
//! A leader simply marks the engine active and acts as the source of
//! truth. A follower starts passive and probes the leader's health
//! endpoint, taking over when the leader stays unreachable and yielding
//! as soon as it comes back.
//!
//! There is no fencing: if both replicas believe themselves leader, both
//! probe and alert. Accepted limitation of a two-node warm standby.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use upkeep_engine::Engine;

use crate::tracker::{FailoverTracker, Flip, FAILOVER_THRESHOLD};

/// Cadence of leader health probes.
const PROBE_PERIOD: Duration = Duration::from_secs(5);

/// Timeout for one leader health probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Header carrying the shared cluster secret.
const SECRET_HEADER: &str = "X-Upkeep-Secret";

/// Role of this replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterMode {
    Leader,
    Follower,
}

/// Coordinator configuration.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    pub mode: ClusterMode,
    /// Base URL of the leader, e.g. `http://primary:8080`. Follower only.
    pub peer_url: String,
    /// Shared secret attached to health probes when configured.
    pub shared_key: Option<String>,
}

/// Flips the engine-wide active flag based on peer health.
pub struct Coordinator {
    engine: Arc<Engine>,
    config: ClusterConfig,
    period: Duration,
    probe_timeout: Duration,
}

impl Coordinator {
    pub fn new(engine: Arc<Engine>, config: ClusterConfig) -> Self {
        Self {
            engine,
            config,
            period: PROBE_PERIOD,
            probe_timeout: PROBE_TIMEOUT,
        }
    }

    /// Override the probe period (for testing).
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Run the coordinator. Leaders return immediately after activating
    /// the engine; followers loop until shutdown.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        match self.config.mode {
            ClusterMode::Leader => {
                self.engine.set_active(true);
                info!("cluster: running as leader (active)");
            }
            ClusterMode::Follower => {
                self.engine.set_active(false);
                info!(peer = %self.config.peer_url, "cluster: running as follower (passive)");
                self.follower_loop(&mut shutdown).await;
            }
        }
    }

    async fn follower_loop(&self, shutdown: &mut watch::Receiver<bool>) {
        let client = reqwest::Client::builder()
            .timeout(self.probe_timeout)
            .build()
            .expect("leader health client");
        let mut tracker = FailoverTracker::new(FAILOVER_THRESHOLD);

        loop {
            tokio::select! {
                _ = sleep(self.period) => {
                    let healthy = self.probe_leader(&client).await;
                    match tracker.record(healthy) {
                        Some(Flip::ToPassive) => {
                            self.engine.set_active(false);
                            self.engine.log("Leader detected. Switching to PASSIVE.");
                            info!("leader detected, switching to passive");
                        }
                        Some(Flip::ToActive) => {
                            self.engine.set_active(true);
                            self.engine.log("Leader Unreachable. Switching to ACTIVE.");
                            warn!(
                                failures = tracker.consecutive_failures(),
                                "leader unreachable, switching to active"
                            );
                        }
                        None => {}
                    }
                }
                _ = shutdown.changed() => {
                    debug!("coordinator shutting down");
                    break;
                }
            }
        }
    }

    /// One health probe against the leader. Healthy means the request
    /// completed with status 200.
    async fn probe_leader(&self, client: &reqwest::Client) -> bool {
        let url = format!(
            "{}/api/health",
            self.config.peer_url.trim_end_matches('/')
        );
        let mut request = client.get(&url);
        if let Some(key) = &self.config.shared_key {
            request = request.header(SECRET_HEADER, key);
        }

        match request.send().await {
            Ok(response) => response.status() == reqwest::StatusCode::OK,
            Err(e) => {
                debug!(error = %e, "leader health probe failed");
                false
            }
        }
    }
}
