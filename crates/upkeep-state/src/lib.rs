//! upkeep-state — domain types and embedded state store for upkeep.
//!
//! Backed by [redb](https://docs.rs/redb), provides persistent and
//! in-memory storage for monitor configs, alert bindings, and users.
//!
//! # Architecture
//!
//! The monitoring core depends on the [`Store`] trait only; [`StateStore`]
//! is the concrete redb backend wired in by the daemon. Entities are
//! JSON-serialized into `u64 → &[u8]` tables, and a `meta` counter table
//! allocates ids so they are never reused after a delete.
//!
//! `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across async tasks.

pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use store::{StateStore, Store};
pub use types::*;
