//! upkeep-alert — notification providers and dispatch for upkeep.
//!
//! The monitoring engine emits `(alert_id, title, body)` events on status
//! edges; this crate resolves the alert config to a transport provider
//! and performs one delivery attempt per event.
//!
//! # Architecture
//!
//! ```text
//! AlertDispatcher::dispatch(alert_id, title, body)
//!   ├── Store::get_alert(alert_id)        (0 / missing → drop)
//!   ├── AlertProvider::from_config        (validate settings)
//!   └── tokio::spawn(provider.send(...))  (failure → warn, no retry)
//! ```
//!
//! Supported transports: Discord, Slack, generic webhook (JSON POST via
//! reqwest) and email (SMTP with PLAIN auth via lettre).

pub mod dispatcher;
pub mod error;
pub mod providers;

pub use dispatcher::AlertDispatcher;
pub use error::{AlertError, AlertResult};
pub use providers::{AlertProvider, EmailSettings};
