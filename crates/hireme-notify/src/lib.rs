//! Notification transports for the HireME deadline monitor.
//!
//! Every transport implements [`hireme_core::transport::Transport`]. The
//! server picks one at startup through [`NotifierConfig`] and hands the
//! resulting [`Notifier`] to the dispatcher.

pub mod log;
pub mod webhook;

use std::time::Duration;

use hireme_core::{
  TransportError,
  record::Record,
  subscriber::Subscriber,
  transport::Transport,
};
use serde::Deserialize;

pub use log::LogTransport;
pub use webhook::WebhookTransport;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Which transport to use, deserialised from the `[notifier]` config table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotifierConfig {
  /// Log reminders instead of delivering them.
  #[default]
  Log,
  /// POST each reminder as JSON to `url`.
  Webhook {
    url:          String,
    /// Client-side request timeout. Defaults to 10 seconds.
    #[serde(default = "default_webhook_timeout_secs")]
    timeout_secs: u64,
  },
}

fn default_webhook_timeout_secs() -> u64 { 10 }

// ─── Notifier ─────────────────────────────────────────────────────────────────

/// The configured transport.
#[derive(Debug, Clone)]
pub enum Notifier {
  Log(LogTransport),
  Webhook(WebhookTransport),
}

impl Notifier {
  pub fn from_config(config: &NotifierConfig) -> Result<Self, TransportError> {
    Ok(match config {
      NotifierConfig::Log => Self::Log(LogTransport),
      NotifierConfig::Webhook { url, timeout_secs } => Self::Webhook(
        WebhookTransport::new(url.clone(), Duration::from_secs(*timeout_secs))?,
      ),
    })
  }
}

impl Transport for Notifier {
  async fn send(
    &self,
    recipient: &Subscriber,
    record: &Record,
    lead_time_days: u32,
  ) -> Result<(), TransportError> {
    match self {
      Self::Log(t) => t.send(recipient, record, lead_time_days).await,
      Self::Webhook(t) => t.send(recipient, record, lead_time_days).await,
    }
  }
}
