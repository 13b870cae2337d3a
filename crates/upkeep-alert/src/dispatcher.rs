//! Alert dispatcher.
//!
//! Resolves an alert id to a provider and fires the notification in a
//! fresh task so a slow transport never blocks a probe. Failures are
//! logged and never retried.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use upkeep_state::{AlertId, Store};

use crate::providers::AlertProvider;

/// Outbound client timeout. Providers get one bounded delivery attempt.
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Fire-and-forget alert dispatch over the configured providers.
#[derive(Clone)]
pub struct AlertDispatcher {
    store: Arc<dyn Store>,
    client: reqwest::Client,
}

impl AlertDispatcher {
    pub fn new(store: Arc<dyn Store>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .expect("outbound alert client");
        Self { store, client }
    }

    /// Dispatch a notification to the alert config identified by `alert_id`.
    ///
    /// An id of `0`, a missing config row, or a store read failure drops
    /// the notification silently (the probe path must never block or
    /// propagate errors). The provider call runs in a spawned task.
    pub fn dispatch(&self, alert_id: AlertId, title: &str, body: &str) {
        if alert_id == 0 {
            return;
        }

        let store = Arc::clone(&self.store);
        let client = self.client.clone();
        let title = title.to_string();
        let body = body.to_string();

        tokio::spawn(async move {
            let config = match store.get_alert(alert_id) {
                Ok(Some(config)) => config,
                Ok(None) => {
                    debug!(alert_id, "no alert config for id, dropping notification");
                    return;
                }
                Err(e) => {
                    warn!(alert_id, error = %e, "alert config read failed, dropping notification");
                    return;
                }
            };

            let provider = match AlertProvider::from_config(&config) {
                Ok(provider) => provider,
                Err(e) => {
                    warn!(alert_id, name = %config.name, error = %e, "alert config invalid");
                    return;
                }
            };

            match provider.send(&client, &title, &body).await {
                Ok(()) => debug!(alert_id, name = %config.name, "alert delivered"),
                Err(e) => {
                    warn!(alert_id, name = %config.name, error = %e, "alert delivery failed")
                }
            }
        });
    }
}
