//! Engine supervisor — pull-based monitor discovery.
//!
//! On a fixed cadence, lists monitors from the store and spawns a probe
//! task for every row not yet in live state. CRUD performed by the UI,
//! an import, or a promoted follower is picked up without any
//! cross-component signalling. Removal is observed by the probe tasks
//! themselves, so the supervisor owns creation only.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use upkeep_state::MonitorId;

use crate::engine::Engine;
use crate::probe;

/// Discovery cadence.
pub const SUPERVISOR_INTERVAL: Duration = Duration::from_secs(5);

/// One discovery pass.
///
/// A store read failure skips the cycle without touching live state.
/// Returns the ids of newly adopted monitors.
pub async fn reconcile_once(engine: &Arc<Engine>) -> Vec<MonitorId> {
    let monitors = match engine.store().list_monitors() {
        Ok(monitors) => monitors,
        Err(e) => {
            warn!(error = %e, "monitor listing failed, skipping cycle");
            return Vec::new();
        }
    };

    let mut discovered = Vec::new();
    for monitor in monitors {
        let id = monitor.id;
        let name = monitor.name.clone();
        if !engine.adopt(monitor).await {
            continue;
        }
        info!(monitor_id = id, name = %name, "monitor discovered");
        tokio::spawn(probe::run_probe_loop(Arc::clone(engine), id));
        discovered.push(id);
    }
    discovered
}

/// Run discovery until shutdown. Never exits on errors.
pub async fn run_supervisor(engine: Arc<Engine>, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(SUPERVISOR_INTERVAL);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                reconcile_once(&engine).await;
            }
            _ = shutdown.changed() => {
                debug!("supervisor shutting down");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use upkeep_state::*;

    fn push_monitor(name: &str) -> NewMonitor {
        NewMonitor {
            name: name.to_string(),
            kind: MonitorKind::Push,
            url: String::new(),
            interval_secs: 10,
            max_retries: 0,
            check_ssl: false,
            expiry_threshold_days: 14,
            alert_id: 0,
        }
    }

    /// A store whose reads always fail, for exercising the skip path.
    struct BrokenStore;

    impl Store for BrokenStore {
        fn list_monitors(&self) -> StateResult<Vec<Monitor>> {
            Err(StateError::Read("disk on fire".to_string()))
        }
        fn get_monitor(&self, _: MonitorId) -> StateResult<Option<Monitor>> {
            Err(StateError::Read("disk on fire".to_string()))
        }
        fn add_monitor(&self, _: NewMonitor) -> StateResult<Monitor> {
            Err(StateError::Write("disk on fire".to_string()))
        }
        fn update_monitor(&self, _: &Monitor) -> StateResult<()> {
            Err(StateError::Write("disk on fire".to_string()))
        }
        fn delete_monitor(&self, _: MonitorId) -> StateResult<bool> {
            Err(StateError::Write("disk on fire".to_string()))
        }
        fn list_alerts(&self) -> StateResult<Vec<AlertConfig>> {
            Err(StateError::Read("disk on fire".to_string()))
        }
        fn get_alert(&self, _: AlertId) -> StateResult<Option<AlertConfig>> {
            Err(StateError::Read("disk on fire".to_string()))
        }
        fn add_alert(
            &self,
            _: &str,
            _: AlertKind,
            _: HashMap<String, String>,
        ) -> StateResult<AlertConfig> {
            Err(StateError::Write("disk on fire".to_string()))
        }
        fn update_alert(&self, _: &AlertConfig) -> StateResult<()> {
            Err(StateError::Write("disk on fire".to_string()))
        }
        fn delete_alert(&self, _: AlertId) -> StateResult<bool> {
            Err(StateError::Write("disk on fire".to_string()))
        }
        fn list_users(&self) -> StateResult<Vec<User>> {
            Err(StateError::Read("disk on fire".to_string()))
        }
        fn add_user(&self, _: &str, _: &str, _: &str) -> StateResult<User> {
            Err(StateError::Write("disk on fire".to_string()))
        }
        fn delete_user(&self, _: UserId) -> StateResult<bool> {
            Err(StateError::Write("disk on fire".to_string()))
        }
    }

    #[tokio::test]
    async fn reconcile_adopts_new_monitors_as_pending() {
        let store = Arc::new(StateStore::open_in_memory().unwrap());
        store.add_monitor(push_monitor("a")).unwrap();
        store.add_monitor(push_monitor("b")).unwrap();

        let engine = Arc::new(Engine::new(store as Arc<dyn Store>));
        let discovered = reconcile_once(&engine).await;
        assert_eq!(discovered.len(), 2);

        for state in engine.snapshot().await {
            assert_eq!(state.status, MonitorStatus::Pending);
        }
    }

    #[tokio::test]
    async fn reconcile_is_idempotent() {
        let store = Arc::new(StateStore::open_in_memory().unwrap());
        store.add_monitor(push_monitor("a")).unwrap();

        let engine = Arc::new(Engine::new(store.clone() as Arc<dyn Store>));
        assert_eq!(reconcile_once(&engine).await.len(), 1);
        assert_eq!(reconcile_once(&engine).await.len(), 0);

        // A new store row is picked up on the next pass.
        store.add_monitor(push_monitor("b")).unwrap();
        assert_eq!(reconcile_once(&engine).await.len(), 1);
        assert_eq!(engine.snapshot().await.len(), 2);
    }

    #[tokio::test]
    async fn store_failure_skips_the_cycle() {
        let engine = Arc::new(Engine::new(Arc::new(BrokenStore) as Arc<dyn Store>));

        let discovered = reconcile_once(&engine).await;
        assert!(discovered.is_empty());
        assert!(engine.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn removed_monitor_is_not_rediscovered_while_absent_from_store() {
        let store = Arc::new(StateStore::open_in_memory().unwrap());
        let added = store.add_monitor(push_monitor("a")).unwrap();

        let engine = Arc::new(Engine::new(store.clone() as Arc<dyn Store>));
        reconcile_once(&engine).await;

        store.delete_monitor(added.id).unwrap();
        engine.remove_monitor(added.id).await;

        assert!(reconcile_once(&engine).await.is_empty());
        assert!(engine.monitor_state(added.id).await.is_none());
    }
}
