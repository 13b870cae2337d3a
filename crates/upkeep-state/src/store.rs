//! Store contract and the redb-backed implementation.
//!
//! The monitoring core consumes the [`Store`] trait; `StateStore` is the
//! embedded implementation shipped with the daemon. All values are
//! JSON-serialized into redb's `&[u8]` value columns. The store supports
//! both on-disk and in-memory backends (the latter for testing).

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use rand::RngCore;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Read/write contract consumed by the monitoring core.
///
/// The engine holds an `Arc<dyn Store>`; concrete backends only need to
/// satisfy this trait.
pub trait Store: Send + Sync {
    // Monitors
    fn list_monitors(&self) -> StateResult<Vec<Monitor>>;
    fn get_monitor(&self, id: MonitorId) -> StateResult<Option<Monitor>>;
    /// Create a monitor. Assigns the id and, for `push` kind, the token.
    fn add_monitor(&self, new: NewMonitor) -> StateResult<Monitor>;
    /// Update a monitor in place. An already-assigned token is immutable;
    /// a monitor switched to `push` without one gets a fresh token.
    fn update_monitor(&self, monitor: &Monitor) -> StateResult<()>;
    fn delete_monitor(&self, id: MonitorId) -> StateResult<bool>;

    // Alerts
    fn list_alerts(&self) -> StateResult<Vec<AlertConfig>>;
    fn get_alert(&self, id: AlertId) -> StateResult<Option<AlertConfig>>;
    fn add_alert(
        &self,
        name: &str,
        kind: AlertKind,
        settings: HashMap<String, String>,
    ) -> StateResult<AlertConfig>;
    fn update_alert(&self, alert: &AlertConfig) -> StateResult<()>;
    fn delete_alert(&self, id: AlertId) -> StateResult<bool>;

    // Users
    fn list_users(&self) -> StateResult<Vec<User>>;
    fn add_user(&self, username: &str, public_key: &str, role: &str) -> StateResult<User>;
    fn delete_user(&self, id: UserId) -> StateResult<bool>;
}

/// Thread-safe state store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(MONITORS).map_err(map_err!(Table))?;
        txn.open_table(ALERTS).map_err(map_err!(Table))?;
        txn.open_table(USERS).map_err(map_err!(Table))?;
        txn.open_table(META).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── Generic row helpers ────────────────────────────────────────

    /// Allocate the next id from the meta counter and insert the entity
    /// built from it, in one transaction.
    fn insert_with_id<T, F>(
        &self,
        table: TableDefinition<u64, &[u8]>,
        counter: &str,
        build: F,
    ) -> StateResult<T>
    where
        T: Serialize,
        F: FnOnce(u64) -> T,
    {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let entity;
        {
            let mut meta = txn.open_table(META).map_err(map_err!(Table))?;
            let id = meta
                .get(counter)
                .map_err(map_err!(Read))?
                .map(|g| g.value())
                .unwrap_or(1);
            meta.insert(counter, id + 1).map_err(map_err!(Write))?;
            drop(meta);

            entity = build(id);
            let value = serde_json::to_vec(&entity).map_err(map_err!(Serialize))?;
            let mut rows = txn.open_table(table).map_err(map_err!(Table))?;
            rows.insert(id, value.as_slice()).map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(entity)
    }

    fn put_row<T: Serialize>(
        &self,
        table: TableDefinition<u64, &[u8]>,
        id: u64,
        entity: &T,
    ) -> StateResult<()> {
        let value = serde_json::to_vec(entity).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut rows = txn.open_table(table).map_err(map_err!(Table))?;
            rows.insert(id, value.as_slice()).map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    fn get_row<T: DeserializeOwned>(
        &self,
        table: TableDefinition<u64, &[u8]>,
        id: u64,
    ) -> StateResult<Option<T>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let rows = txn.open_table(table).map_err(map_err!(Table))?;
        match rows.get(id).map_err(map_err!(Read))? {
            Some(guard) => {
                let entity = serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(entity))
            }
            None => Ok(None),
        }
    }

    fn list_rows<T: DeserializeOwned>(
        &self,
        table: TableDefinition<u64, &[u8]>,
    ) -> StateResult<Vec<T>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let rows = txn.open_table(table).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in rows.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let entity: T =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(entity);
        }
        Ok(results)
    }

    fn remove_row(&self, table: TableDefinition<u64, &[u8]>, id: u64) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut rows = txn.open_table(table).map_err(map_err!(Table))?;
            existed = rows.remove(id).map_err(map_err!(Write))?.is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(existed)
    }
}

/// Generate a heartbeat token: 16 random bytes, hex-encoded.
fn generate_token() -> String {
    let mut bytes = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

impl Store for StateStore {
    // ── Monitors ───────────────────────────────────────────────────

    fn list_monitors(&self) -> StateResult<Vec<Monitor>> {
        self.list_rows(MONITORS)
    }

    fn get_monitor(&self, id: MonitorId) -> StateResult<Option<Monitor>> {
        self.get_row(MONITORS, id as u64)
    }

    fn add_monitor(&self, new: NewMonitor) -> StateResult<Monitor> {
        let token = match new.kind {
            MonitorKind::Push => generate_token(),
            MonitorKind::Http => String::new(),
        };
        let monitor = self.insert_with_id(MONITORS, "next_monitor_id", |id| Monitor {
            id: id as MonitorId,
            name: new.name,
            kind: new.kind,
            url: new.url,
            token,
            interval_secs: new.interval_secs,
            max_retries: new.max_retries,
            check_ssl: new.check_ssl,
            expiry_threshold_days: new.expiry_threshold_days,
            alert_id: new.alert_id,
        })?;
        debug!(id = monitor.id, name = %monitor.name, "monitor stored");
        Ok(monitor)
    }

    fn update_monitor(&self, monitor: &Monitor) -> StateResult<()> {
        let mut row = monitor.clone();
        // The token is assigned once. Keep whatever is already stored;
        // a monitor switched to push without one gets a fresh token.
        if let Some(existing) = self.get_monitor(monitor.id)? {
            if !existing.token.is_empty() {
                row.token = existing.token;
            }
        }
        if row.kind == MonitorKind::Push && row.token.is_empty() {
            row.token = generate_token();
        }
        self.put_row(MONITORS, row.id as u64, &row)
    }

    fn delete_monitor(&self, id: MonitorId) -> StateResult<bool> {
        let existed = self.remove_row(MONITORS, id as u64)?;
        debug!(id, existed, "monitor deleted");
        Ok(existed)
    }

    // ── Alerts ─────────────────────────────────────────────────────

    fn list_alerts(&self) -> StateResult<Vec<AlertConfig>> {
        self.list_rows(ALERTS)
    }

    fn get_alert(&self, id: AlertId) -> StateResult<Option<AlertConfig>> {
        self.get_row(ALERTS, id as u64)
    }

    fn add_alert(
        &self,
        name: &str,
        kind: AlertKind,
        settings: HashMap<String, String>,
    ) -> StateResult<AlertConfig> {
        self.insert_with_id(ALERTS, "next_alert_id", |id| AlertConfig {
            id: id as AlertId,
            name: name.to_string(),
            kind,
            settings,
        })
    }

    fn update_alert(&self, alert: &AlertConfig) -> StateResult<()> {
        self.put_row(ALERTS, alert.id as u64, alert)
    }

    fn delete_alert(&self, id: AlertId) -> StateResult<bool> {
        self.remove_row(ALERTS, id as u64)
    }

    // ── Users ──────────────────────────────────────────────────────

    fn list_users(&self) -> StateResult<Vec<User>> {
        self.list_rows(USERS)
    }

    fn add_user(&self, username: &str, public_key: &str, role: &str) -> StateResult<User> {
        self.insert_with_id(USERS, "next_user_id", |id| User {
            id: id as UserId,
            username: username.to_string(),
            public_key: public_key.to_string(),
            role: role.to_string(),
        })
    }

    fn delete_user(&self, id: UserId) -> StateResult<bool> {
        self.remove_row(USERS, id as u64)
    }
}
