//! Error types for `hireme-core`.

use thiserror::Error;

use crate::{record::RecordKey, subscriber::{GroupId, SubscriberId}};

#[derive(Debug, Error)]
pub enum Error {
  #[error("subscriber not found: {0}")]
  SubscriberNotFound(SubscriberId),

  #[error("group not found: {0}")]
  GroupNotFound(GroupId),

  #[error("record not found: {0}")]
  RecordNotFound(RecordKey),

  #[error("record {0} already exists")]
  RecordExists(RecordKey),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Why a notification could not be delivered.
///
/// Transports never retry; the dispatcher logs the error and moves on.
#[derive(Debug, Error)]
pub enum TransportError {
  #[error("transport rejected the notification: {0}")]
  Rejected(String),

  #[error("transport unreachable: {0}")]
  Unreachable(String),
}
