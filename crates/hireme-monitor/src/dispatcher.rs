//! [`Dispatcher`] — hands one reminder to the transport and absorbs failure.

use std::{sync::Arc, time::Duration};

use hireme_core::{record::Record, subscriber::Subscriber, transport::Transport};
use serde::Serialize;

/// Result of one dispatch attempt. Only [`DispatchOutcome::Sent`] is success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchOutcome {
  Sent,
  Failed,
  TimedOut,
}

impl DispatchOutcome {
  pub fn is_success(self) -> bool { matches!(self, Self::Sent) }
}

/// Wraps a transport with a per-call timeout and failure logging.
///
/// Never retries: a failed or timed-out notification is dropped for the
/// current scan.
#[derive(Debug)]
pub struct Dispatcher<T> {
  transport: Arc<T>,
  timeout:   Duration,
}

impl<T: Transport> Dispatcher<T> {
  pub fn new(transport: Arc<T>, timeout: Duration) -> Self {
    Self { transport, timeout }
  }

  pub async fn notify(
    &self,
    subscriber: &Subscriber,
    record: &Record,
    lead_time_days: u32,
  ) -> DispatchOutcome {
    let send = self.transport.send(subscriber, record, lead_time_days);

    match tokio::time::timeout(self.timeout, send).await {
      Ok(Ok(())) => {
        tracing::info!(
          subscriber = %subscriber.id,
          record = %record.key(),
          "reminder sent"
        );
        DispatchOutcome::Sent
      }
      Ok(Err(e)) => {
        tracing::warn!(
          subscriber = %subscriber.id,
          record = %record.key(),
          error = %e,
          "reminder dispatch failed"
        );
        DispatchOutcome::Failed
      }
      Err(_) => {
        tracing::warn!(
          subscriber = %subscriber.id,
          record = %record.key(),
          timeout_secs = self.timeout.as_secs(),
          "reminder dispatch timed out"
        );
        DispatchOutcome::TimedOut
      }
    }
  }
}
