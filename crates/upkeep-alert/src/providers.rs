//! Alert transport providers.
//!
//! Each provider adapts a `(title, body)` pair to its transport-native
//! payload. Webhook-style providers POST JSON; email goes out over SMTP
//! with PLAIN auth.

use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde_json::json;

use upkeep_state::{AlertConfig, AlertKind};

use crate::error::{AlertError, AlertResult};

/// SMTP delivery settings for the email provider.
#[derive(Debug, Clone)]
pub struct EmailSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub from: String,
    pub to: String,
}

/// A resolved alert transport.
///
/// One variant per supported kind; `send` performs a single delivery
/// attempt and reports success or failure. Retries are the caller's
/// concern (the dispatcher performs none).
#[derive(Debug, Clone)]
pub enum AlertProvider {
    Discord { url: String },
    Slack { url: String },
    Webhook { url: String },
    Email(EmailSettings),
}

impl AlertProvider {
    /// Resolve an alert configuration to a provider, validating the
    /// settings it requires.
    pub fn from_config(config: &AlertConfig) -> AlertResult<Self> {
        match config.kind {
            AlertKind::Discord => Ok(AlertProvider::Discord {
                url: required(config, "discord", "url")?,
            }),
            AlertKind::Slack => Ok(AlertProvider::Slack {
                url: required(config, "slack", "url")?,
            }),
            AlertKind::Webhook => Ok(AlertProvider::Webhook {
                url: required(config, "webhook", "url")?,
            }),
            AlertKind::Email => {
                let port_raw = config
                    .settings
                    .get("port")
                    .map(String::as_str)
                    .unwrap_or("25");
                let port = port_raw
                    .parse::<u16>()
                    .map_err(|e| AlertError::InvalidSetting {
                        key: "port",
                        reason: e.to_string(),
                    })?;
                Ok(AlertProvider::Email(EmailSettings {
                    host: required(config, "email", "host")?,
                    port,
                    user: required(config, "email", "user")?,
                    pass: required(config, "email", "pass")?,
                    from: required(config, "email", "from")?,
                    to: required(config, "email", "to")?,
                }))
            }
        }
    }

    /// The JSON payload POSTed by webhook-style providers. `None` for email.
    pub fn payload(&self, title: &str, body: &str) -> Option<serde_json::Value> {
        match self {
            AlertProvider::Discord { .. } => Some(json!({
                "content": format!("**{title}**\n{body}"),
            })),
            AlertProvider::Slack { .. } => Some(json!({
                "text": format!("*{title}*\n{body}"),
            })),
            AlertProvider::Webhook { .. } => Some(json!({
                "title": title,
                "message": body,
                "status": "alert",
            })),
            AlertProvider::Email(_) => None,
        }
    }

    /// Deliver one notification.
    pub async fn send(
        &self,
        client: &reqwest::Client,
        title: &str,
        body: &str,
    ) -> AlertResult<()> {
        match self {
            AlertProvider::Discord { url }
            | AlertProvider::Slack { url }
            | AlertProvider::Webhook { url } => {
                let payload = self
                    .payload(title, body)
                    .expect("webhook-style provider has a payload");
                client
                    .post(url)
                    .json(&payload)
                    .send()
                    .await?
                    .error_for_status()?;
                Ok(())
            }
            AlertProvider::Email(settings) => send_email(settings, title, body).await,
        }
    }
}

async fn send_email(settings: &EmailSettings, title: &str, body: &str) -> AlertResult<()> {
    let from: Mailbox = settings
        .from
        .parse()
        .map_err(|e: lettre::address::AddressError| AlertError::InvalidSetting {
            key: "from",
            reason: e.to_string(),
        })?;
    let to: Mailbox = settings
        .to
        .parse()
        .map_err(|e: lettre::address::AddressError| AlertError::InvalidSetting {
            key: "to",
            reason: e.to_string(),
        })?;

    let message = Message::builder()
        .from(from)
        .to(to)
        .subject(format!("Upkeep: {title}"))
        .body(body.to_string())
        .map_err(|e| AlertError::Smtp(e.to_string()))?;

    let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(settings.host.as_str())
        .port(settings.port)
        .credentials(Credentials::new(
            settings.user.clone(),
            settings.pass.clone(),
        ))
        .authentication(vec![Mechanism::Plain])
        .build();

    transport
        .send(message)
        .await
        .map_err(|e| AlertError::Smtp(e.to_string()))?;
    Ok(())
}

fn required(
    config: &AlertConfig,
    kind: &'static str,
    key: &'static str,
) -> AlertResult<String> {
    config
        .settings
        .get(key)
        .filter(|v| !v.is_empty())
        .cloned()
        .ok_or(AlertError::MissingSetting { kind, key })
}
