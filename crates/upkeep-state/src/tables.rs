//! redb table definitions for the upkeep state store.
//!
//! Entity tables use `u64` ids as keys and JSON-serialized domain types
//! as `&[u8]` values. The `meta` table holds monotone id counters so ids
//! are never reused after a delete.

use redb::TableDefinition;

/// Monitor configs keyed by monitor id.
pub const MONITORS: TableDefinition<u64, &[u8]> = TableDefinition::new("monitors");

/// Alert configs keyed by alert id.
pub const ALERTS: TableDefinition<u64, &[u8]> = TableDefinition::new("alerts");

/// Users keyed by user id.
pub const USERS: TableDefinition<u64, &[u8]> = TableDefinition::new("users");

/// Id counters: `next_monitor_id`, `next_alert_id`, `next_user_id`.
pub const META: TableDefinition<&str, u64> = TableDefinition::new("meta");
