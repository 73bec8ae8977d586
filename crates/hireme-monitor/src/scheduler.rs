//! [`ScanScheduler`] — recurring, non-overlapping scans with a start/stop
//! lifecycle.
//!
//! # Lifecycle
//!
//! `Stopped → start() → Running → stop() → Stopped`. Both transitions are
//! idempotent. The loop runs on its own tokio task:
//!
//! 1. The first scan fires immediately, then once per `scan_period`.
//! 2. A firing that elapses while a scan is still running is skipped
//!    (`MissedTickBehavior::Skip` plus a `try_lock` gate shared with
//!    [`ScanScheduler::scan_now`]), never queued.
//! 3. Each scan runs on a child task; a panic inside it is logged and the
//!    next period proceeds.
//! 4. `stop()` cancels the loop and waits up to `shutdown_grace` for the
//!    in-flight scan, then aborts it. No new scan starts once cancelled.
//!    Dropping the scheduler cancels the loop the same way without waiting.

use std::{
  sync::{Arc, Mutex, PoisonError},
  time::Duration,
};

use hireme_core::transport::Transport;
use tokio::{
  sync::Mutex as AsyncMutex,
  task::JoinHandle,
  time::{MissedTickBehavior, interval},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
  Clock, Dispatcher, MonitorConfig, Registry,
  scan::{ScanContext, ScanReport, run_scan},
};

type LastReport = Arc<Mutex<Option<ScanReport>>>;

struct RunningLoop {
  cancel: CancellationToken,
  handle: JoinHandle<()>,
}

/// Aborts the wrapped task when dropped, so abandoning the loop also
/// abandons its in-flight scan.
struct AbortOnDrop<R>(JoinHandle<R>);

impl<R> Drop for AbortOnDrop<R> {
  fn drop(&mut self) { self.0.abort(); }
}

pub struct ScanScheduler<T> {
  ctx:         Arc<ScanContext<T>>,
  period:      Duration,
  grace:       Duration,
  gate:        Arc<AsyncMutex<()>>,
  running:     Mutex<Option<RunningLoop>>,
  last_report: LastReport,
}

impl<T: Transport + 'static> ScanScheduler<T> {
  pub fn new(
    registry: Registry,
    transport: Arc<T>,
    config: &MonitorConfig,
    clock: Arc<dyn Clock>,
  ) -> Self {
    let ctx = ScanContext {
      registry,
      dispatcher: Dispatcher::new(transport, config.dispatch_timeout),
      lead_time: config.lead_time(),
      dedup_scope: config.dedup_scope,
      clock,
    };
    Self {
      ctx:         Arc::new(ctx),
      // `interval` panics on a zero period.
      period:      config.scan_period.max(Duration::from_millis(1)),
      grace:       config.shutdown_grace,
      gate:        Arc::new(AsyncMutex::new(())),
      running:     Mutex::new(None),
      last_report: LastReport::default(),
    }
  }

  /// Begin firing scans. Returns `false` (and does nothing) if already
  /// running.
  pub fn start(&self) -> bool {
    let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
    if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
      debug!("scan scheduler already running");
      return false;
    }

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(scan_loop(
      self.ctx.clone(),
      self.gate.clone(),
      self.period,
      cancel.clone(),
      self.last_report.clone(),
    ));
    *running = Some(RunningLoop { cancel, handle });

    info!(
      period_secs = self.period.as_secs(),
      lead_time_days = self.ctx.lead_time.whole_days(),
      "scan scheduler started"
    );
    true
  }

  /// Stop firing scans, waiting up to the grace period for an in-flight
  /// scan. Returns `false` if the scheduler was not running.
  pub async fn stop(&self) -> bool {
    let taken = self
      .running
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .take();
    let Some(RunningLoop { cancel, mut handle }) = taken else {
      return false;
    };

    cancel.cancel();
    match tokio::time::timeout(self.grace, &mut handle).await {
      Ok(Ok(())) => info!("scan scheduler stopped"),
      Ok(Err(e)) => warn!(error = %e, "scan loop ended abnormally"),
      Err(_) => {
        warn!(
          grace_secs = self.grace.as_secs(),
          "in-flight scan did not finish within the grace period; abandoning it"
        );
        handle.abort();
      }
    }
    true
  }

  pub fn is_running(&self) -> bool {
    self
      .running
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .as_ref()
      .is_some_and(|r| !r.handle.is_finished())
  }

  /// Run one scan on the caller's task, outside the schedule. Returns `None`
  /// if a scan is already in flight.
  pub async fn scan_now(&self) -> Option<ScanReport> {
    let Ok(_guard) = self.gate.try_lock() else {
      debug!("manual scan refused: a scan is already running");
      return None;
    };
    let report = run_scan(&self.ctx).await;
    record_report(&self.last_report, report);
    Some(report)
  }

  /// Counters from the most recent completed scan.
  pub fn last_report(&self) -> Option<ScanReport> {
    *self.last_report.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl<T> Drop for ScanScheduler<T> {
  fn drop(&mut self) {
    let running = self.running.get_mut().unwrap_or_else(PoisonError::into_inner);
    if let Some(RunningLoop { cancel, .. }) = running.take() {
      cancel.cancel();
    }
  }
}

fn record_report(last: &LastReport, report: ScanReport) {
  *last.lock().unwrap_or_else(PoisonError::into_inner) = Some(report);
}

async fn scan_loop<T: Transport + 'static>(
  ctx: Arc<ScanContext<T>>,
  gate: Arc<AsyncMutex<()>>,
  period: Duration,
  cancel: CancellationToken,
  last_report: LastReport,
) {
  let mut ticker = interval(period);
  ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
  let mut in_flight: Option<AbortOnDrop<()>> = None;

  loop {
    tokio::select! {
      biased;
      _ = cancel.cancelled() => break,
      _ = ticker.tick() => {
        if cancel.is_cancelled() {
          break;
        }
        // The scan runs detached so the ticker keeps being polled; firings
        // that land while it holds the gate are dropped here.
        let Ok(permit) = gate.clone().try_lock_owned() else {
          debug!("previous scan still running; skipping this firing");
          continue;
        };
        if let Some(previous) = in_flight.take() {
          reap(previous).await;
        }

        let ctx = ctx.clone();
        let last_report = last_report.clone();
        in_flight = Some(AbortOnDrop(tokio::spawn(async move {
          let _permit = permit;
          let report = run_scan(&ctx).await;
          record_report(&last_report, report);
        })));
      }
    }
  }

  info!("scan loop shutting down");
  if let Some(scan) = in_flight.take() {
    reap(scan).await;
  }
}

/// Wait for a scan task and log how it ended if it did not finish normally.
async fn reap(mut scan: AbortOnDrop<()>) {
  if let Err(e) = (&mut scan.0).await {
    error!(error = %e, "scan aborted; will retry next period");
  }
}
