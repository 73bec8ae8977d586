//! [`LogTransport`] — writes each reminder to the log and reports success.

use hireme_core::{
  TransportError,
  message::ReminderMessage,
  record::Record,
  subscriber::Subscriber,
  transport::Transport,
};

/// A transport that never leaves the process. Useful for dry runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTransport;

impl Transport for LogTransport {
  async fn send(
    &self,
    recipient: &Subscriber,
    record: &Record,
    lead_time_days: u32,
  ) -> Result<(), TransportError> {
    let message = ReminderMessage::render(recipient, record, lead_time_days);
    tracing::info!(
      to = %message.to,
      subject = %message.subject,
      record = %record.key(),
      "reminder (log transport)"
    );
    tracing::debug!(body = %message.body, "reminder body");
    Ok(())
  }
}
