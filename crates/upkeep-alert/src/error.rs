//! Error types for alert resolution and delivery.

use thiserror::Error;

/// Result type alias for alert operations.
pub type AlertResult<T> = Result<T, AlertError>;

/// Errors that can occur while resolving or delivering an alert.
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("missing required setting '{key}' for {kind} alert")]
    MissingSetting {
        kind: &'static str,
        key: &'static str,
    },

    #[error("invalid setting '{key}': {reason}")]
    InvalidSetting { key: &'static str, reason: String },

    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("smtp error: {0}")]
    Smtp(String),
}
