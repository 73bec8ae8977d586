//! [`WebhookTransport`] — POSTs each reminder as JSON to a fixed URL.
//!
//! Request body:
//!
//! ```json
//! { "to": "...", "subject": "...", "body": "...", "lead_time_days": 3, "record": { ... } }
//! ```
//!
//! Any 2xx response counts as delivered. Everything else is a
//! [`TransportError`]; there is no retry.

use std::time::Duration;

use hireme_core::{
  TransportError,
  message::ReminderMessage,
  record::Record,
  subscriber::Subscriber,
  transport::Transport,
};
use reqwest::Client;
use serde::Serialize;

#[derive(Serialize)]
struct Payload<'a> {
  #[serde(flatten)]
  message:        ReminderMessage,
  lead_time_days: u32,
  record:         &'a Record,
}

/// HTTP webhook transport.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Debug, Clone)]
pub struct WebhookTransport {
  client: Client,
  url:    String,
}

impl WebhookTransport {
  pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
    let client = Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| TransportError::Unreachable(format!("failed to build HTTP client: {e}")))?;
    Ok(Self { client, url: url.into() })
  }
}

impl Transport for WebhookTransport {
  async fn send(
    &self,
    recipient: &Subscriber,
    record: &Record,
    lead_time_days: u32,
  ) -> Result<(), TransportError> {
    let payload = Payload {
      message: ReminderMessage::render(recipient, record, lead_time_days),
      lead_time_days,
      record,
    };

    let resp = self
      .client
      .post(&self.url)
      .json(&payload)
      .send()
      .await
      .map_err(|e| TransportError::Unreachable(format!("POST {} failed: {e}", self.url)))?;

    if !resp.status().is_success() {
      return Err(TransportError::Rejected(format!(
        "POST {} → {}",
        self.url,
        resp.status()
      )));
    }

    tracing::debug!(to = %recipient.id, record = %record.key(), "webhook delivered");
    Ok(())
  }
}
