//! The `Transport` trait: the single way a reminder leaves the process.

use std::future::Future;

use crate::{TransportError, record::Record, subscriber::Subscriber};

/// A notification channel. Delivery is best-effort: an `Err` is terminal for
/// that notification and the caller never retries.
pub trait Transport: Send + Sync {
  /// Deliver one reminder for `record` to `recipient`, whose email address is
  /// the destination. `lead_time_days` is the configured reminder window.
  fn send<'a>(
    &'a self,
    recipient: &'a Subscriber,
    record: &'a Record,
    lead_time_days: u32,
  ) -> impl Future<Output = Result<(), TransportError>> + Send + 'a;
}
