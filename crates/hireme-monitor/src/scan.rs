//! One full monitoring pass over the registry.

use std::sync::Arc;

use hireme_core::{dedup::DedupScope, transport::Transport, window::{LeadTime, is_due}};
use serde::Serialize;

use crate::{Clock, Dispatcher, Registry};

/// Everything a scan needs, shared between the scheduler loop and manual
/// triggers.
pub struct ScanContext<T> {
  pub registry:    Registry,
  pub dispatcher:  Dispatcher<T>,
  pub lead_time:   LeadTime,
  pub dedup_scope: DedupScope,
  pub clock:       Arc<dyn Clock>,
}

/// Counters for one scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
  /// Subscribers in the snapshot.
  pub subscribers: usize,
  /// (subscriber, record) paths walked, including repeats.
  pub candidates:  usize,
  /// Paths whose record was inside the reminder window.
  pub due:         usize,
  /// Due paths refused by the dedup tracker.
  pub duplicates:  usize,
  pub sent:        usize,
  /// Dispatches that failed or timed out.
  pub failed:      usize,
  /// Snapshotted keys whose record was gone by the time it was evaluated.
  pub stale:       usize,
}

impl ScanReport {
  pub fn attempted(&self) -> usize { self.sent + self.failed }
}

/// Run one scan: snapshot, evaluate, dedup, dispatch.
///
/// The registry lock is only held to take the snapshot and to resolve each
/// key, never across a dispatch. Transport failures are counted, not
/// propagated.
pub async fn run_scan<T: Transport>(ctx: &ScanContext<T>) -> ScanReport {
  let now = ctx.clock.now();
  let snapshot = ctx.registry.snapshot().await;
  let mut tracker = ctx.dedup_scope.tracker();
  let mut report = ScanReport {
    subscribers: snapshot.subscribers.len(),
    ..ScanReport::default()
  };

  tracing::debug!(%now, subscribers = report.subscribers, "scan started");

  for entry in &snapshot.subscribers {
    for key in entry.reachable() {
      report.candidates += 1;

      let Some(record) = ctx.registry.resolve(key).await else {
        tracing::debug!(subscriber = %entry.subscriber.id, record = %key, "record no longer exists");
        report.stale += 1;
        continue;
      };

      if !is_due(&record, now, ctx.lead_time) {
        continue;
      }
      report.due += 1;

      if !tracker.try_claim(&entry.subscriber.id, key) {
        report.duplicates += 1;
        continue;
      }

      let outcome = ctx
        .dispatcher
        .notify(&entry.subscriber, &record, ctx.lead_time.whole_days())
        .await;
      if outcome.is_success() {
        report.sent += 1;
      } else {
        report.failed += 1;
      }
    }
  }

  tracing::info!(
    subscribers = report.subscribers,
    due = report.due,
    sent = report.sent,
    failed = report.failed,
    duplicates = report.duplicates,
    stale = report.stale,
    "scan completed"
  );

  report
}
