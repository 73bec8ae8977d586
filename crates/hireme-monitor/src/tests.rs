//! Scan and scheduler behaviour against an instrumented in-memory transport.

use std::{
  sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
  },
  time::{Duration, Instant},
};

use chrono::{DateTime, NaiveDate, TimeDelta, TimeZone, Utc};
use hireme_core::{
  TransportError,
  dedup::DedupScope,
  graph::OwnershipGraph,
  record::{Record, RecordKey},
  subscriber::{Subscriber, SubscriberId},
  transport::Transport,
};

use crate::{
  Clock, Dispatcher, FixedClock, MonitorConfig, Registry, ScanContext, ScanScheduler,
  run_scan,
};

// ─── Fixtures ────────────────────────────────────────────────────────────────

type Hook = Box<dyn Fn(&mut OwnershipGraph) + Send + Sync>;

/// Records every call; can fail, stall, panic or mutate the registry on a
/// chosen call.
#[derive(Default)]
struct MockTransport {
  calls:         Mutex<Vec<(SubscriberId, RecordKey)>>,
  started:       Mutex<Vec<Instant>>,
  attempts:      AtomicUsize,
  in_flight:     AtomicUsize,
  max_in_flight: AtomicUsize,
  delay:         Option<Duration>,
  fail_on:       Option<usize>,
  panic_on:      Option<usize>,
  on_first:      Option<(Registry, Hook)>,
}

impl MockTransport {
  fn calls(&self) -> Vec<(SubscriberId, RecordKey)> {
    self.calls.lock().unwrap().clone()
  }

  fn attempts(&self) -> usize { self.attempts.load(Ordering::SeqCst) }

  fn started(&self) -> Vec<Instant> { self.started.lock().unwrap().clone() }
}

impl Transport for MockTransport {
  async fn send(
    &self,
    recipient: &Subscriber,
    record: &Record,
    _lead_time_days: u32,
  ) -> Result<(), TransportError> {
    self.started.lock().unwrap().push(Instant::now());
    let n = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
    let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    self.max_in_flight.fetch_max(now, Ordering::SeqCst);

    if self.panic_on == Some(n) {
      self.in_flight.fetch_sub(1, Ordering::SeqCst);
      panic!("transport exploded");
    }

    if let (1, Some((registry, hook))) = (n, &self.on_first) {
      hook(&mut *registry.write().await);
    }

    if let Some(delay) = self.delay {
      tokio::time::sleep(delay).await;
    }

    self
      .calls
      .lock()
      .unwrap()
      .push((recipient.id.clone(), record.key().clone()));
    self.in_flight.fetch_sub(1, Ordering::SeqCst);

    if self.fail_on == Some(n) {
      return Err(TransportError::Rejected("mock failure".into()));
    }
    Ok(())
  }
}

fn now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap() }

fn due_in(days: i64) -> NaiveDate { (now() + TimeDelta::days(days)).date_naive() }

fn record(company: &str, position: &str, days: i64) -> Record {
  Record::new(company, position, "", due_in(days), "https://example.com")
}

fn person(name: &str) -> Subscriber {
  Subscriber::new(name, format!("{}@example.com", name.to_lowercase()))
}

fn context(
  registry: &Registry,
  transport: Arc<MockTransport>,
  scope: DedupScope,
) -> ScanContext<MockTransport> {
  ScanContext {
    registry:    registry.clone(),
    dispatcher:  Dispatcher::new(transport, Duration::from_secs(5)),
    lead_time:   hireme_core::window::LeadTime::days(3),
    dedup_scope: scope,
    clock:       Arc::new(FixedClock::new(now())),
  }
}

async fn own(registry: &Registry, who: &Subscriber, r: Record) {
  let mut g = registry.write().await;
  g.register_subscriber(who.clone());
  let key = r.key().clone();
  g.upsert_record(r);
  g.own_record(&who.id, &key).unwrap();
}

// ─── Scan semantics ──────────────────────────────────────────────────────────

#[tokio::test]
async fn end_to_end_single_reminder_and_no_cross_scan_dedup() {
  let registry = Registry::default();
  let alice = person("Alice");
  own(&registry, &alice, record("Acme", "Intern", 2)).await;

  let transport = Arc::new(MockTransport::default());
  let ctx = context(&registry, transport.clone(), DedupScope::Record);

  let first = run_scan(&ctx).await;
  assert_eq!(first.sent, 1);
  assert_eq!(
    transport.calls(),
    vec![(alice.id.clone(), RecordKey::new("Acme", "Intern"))]
  );

  let second = run_scan(&ctx).await;
  assert_eq!(second.sent, 1);
  assert_eq!(transport.calls().len(), 2);
}

#[tokio::test]
async fn record_shared_through_two_groups_to_two_subscribers_sends_once() {
  let registry = Registry::default();
  let alice = person("Alice");
  let bob = person("Bob");
  {
    let mut g = registry.write().await;
    g.register_subscriber(alice.clone());
    g.register_subscriber(bob.clone());
    let shared = record("Acme", "Intern", 1);
    let key = shared.key().clone();
    g.upsert_record(shared);

    let g1 = g.create_group("study buddies");
    let g2 = g.create_group("career club");
    g.join_group(&alice.id, g1).unwrap();
    g.join_group(&bob.id, g2).unwrap();
    g.share_record(g1, &key).unwrap();
    g.share_record(g2, &key).unwrap();
  }

  let transport = Arc::new(MockTransport::default());
  let report = run_scan(&context(&registry, transport.clone(), DedupScope::Record)).await;

  assert_eq!(transport.attempts(), 1);
  assert_eq!(report.due, 2);
  assert_eq!(report.duplicates, 1);
}

#[tokio::test]
async fn pair_scope_notifies_each_subscriber_once() {
  let registry = Registry::default();
  let alice = person("Alice");
  let bob = person("Bob");
  {
    let mut g = registry.write().await;
    g.register_subscriber(alice.clone());
    g.register_subscriber(bob.clone());
    let shared = record("Acme", "Intern", 1);
    let key = shared.key().clone();
    g.upsert_record(shared);
    g.own_record(&alice.id, &key).unwrap();

    let gid = g.create_group("cohort");
    g.join_group(&alice.id, gid).unwrap();
    g.join_group(&bob.id, gid).unwrap();
    g.share_record(gid, &key).unwrap();
  }

  let transport = Arc::new(MockTransport::default());
  let report =
    run_scan(&context(&registry, transport.clone(), DedupScope::SubscriberRecord)).await;

  assert_eq!(report.sent, 2);
  assert_eq!(report.duplicates, 1);
  let mut recipients: Vec<_> = transport.calls().into_iter().map(|(s, _)| s).collect();
  recipients.sort();
  assert_eq!(recipients, vec![alice.id, bob.id]);
}

#[tokio::test]
async fn owned_and_group_paths_for_one_subscriber_send_once() {
  let registry = Registry::default();
  let alice = person("Alice");
  let r = record("Acme", "Intern", 1);
  let key = r.key().clone();
  own(&registry, &alice, r).await;
  {
    let mut g = registry.write().await;
    let gid = g.create_group("cohort");
    g.join_group(&alice.id, gid).unwrap();
    g.share_record(gid, &key).unwrap();
  }

  let transport = Arc::new(MockTransport::default());
  let report = run_scan(&context(&registry, transport.clone(), DedupScope::Record)).await;

  assert_eq!(report.candidates, 2);
  assert_eq!(report.sent, 1);
}

#[tokio::test]
async fn double_registration_keeps_one_entry() {
  let registry = Registry::default();
  let alice = person("Alice");
  assert!(registry.register_subscriber(alice.clone()).await);
  assert!(!registry.register_subscriber(alice.clone()).await);
  own(&registry, &alice, record("Acme", "Intern", 2)).await;

  assert_eq!(registry.read().await.subscriber_count(), 1);

  let transport = Arc::new(MockTransport::default());
  let report = run_scan(&context(&registry, transport.clone(), DedupScope::Record)).await;
  assert_eq!(report.subscribers, 1);
  assert_eq!(transport.attempts(), 1);
}

#[tokio::test]
async fn records_outside_window_are_ignored() {
  let registry = Registry::default();
  let alice = person("Alice");
  own(&registry, &alice, record("Past", "Intern", -1)).await;
  own(&registry, &alice, record("Today", "Intern", 0)).await;
  own(&registry, &alice, record("Later", "Intern", 10)).await;

  let transport = Arc::new(MockTransport::default());
  let report = run_scan(&context(&registry, transport.clone(), DedupScope::Record)).await;

  assert_eq!(report.candidates, 3);
  assert_eq!(report.due, 0);
  assert_eq!(transport.attempts(), 0);
}

#[tokio::test]
async fn record_enters_window_as_clock_advances() {
  let registry = Registry::default();
  own(&registry, &person("Alice"), record("Acme", "Intern", 5)).await;

  let clock = Arc::new(FixedClock::new(now()));
  let transport = Arc::new(MockTransport::default());
  let mut ctx = context(&registry, transport.clone(), DedupScope::Record);
  ctx.clock = clock.clone();

  assert_eq!(run_scan(&ctx).await.due, 0);
  clock.advance(TimeDelta::days(3));
  assert_eq!(run_scan(&ctx).await.sent, 1);
  clock.advance(TimeDelta::days(3));
  assert_eq!(run_scan(&ctx).await.due, 0);
}

#[tokio::test]
async fn transport_failure_does_not_stop_the_scan() {
  let registry = Registry::default();
  for (name, company) in [("Alice", "Acme"), ("Bob", "Globex"), ("Carol", "Initech")] {
    own(&registry, &person(name), record(company, "Intern", 1)).await;
  }

  let transport = Arc::new(MockTransport { fail_on: Some(2), ..Default::default() });
  let report = run_scan(&context(&registry, transport.clone(), DedupScope::Record)).await;

  assert_eq!(transport.attempts(), 3);
  assert_eq!(report.attempted(), 3);
  assert_eq!(report.sent, 2);
  assert_eq!(report.failed, 1);
}

#[tokio::test]
async fn slow_transport_times_out_as_failure() {
  let registry = Registry::default();
  own(&registry, &person("Alice"), record("Acme", "Intern", 1)).await;
  own(&registry, &person("Bob"), record("Globex", "Intern", 1)).await;

  let transport = Arc::new(MockTransport {
    delay: Some(Duration::from_millis(500)),
    ..Default::default()
  });
  let mut ctx = context(&registry, transport.clone(), DedupScope::Record);
  ctx.dispatcher = Dispatcher::new(transport.clone(), Duration::from_millis(20));

  let report = run_scan(&ctx).await;
  assert_eq!(report.failed, 2);
  assert_eq!(report.sent, 0);
  assert_eq!(transport.attempts(), 2);
}

#[tokio::test]
async fn record_added_during_scan_waits_for_next_scan() {
  let registry = Registry::default();
  let alice = person("Alice");
  own(&registry, &alice, record("Acme", "Intern", 1)).await;

  let late = record("Globex", "Analyst", 2);
  let late_key = late.key().clone();
  let alice_id = alice.id.clone();
  let transport = Arc::new(MockTransport {
    on_first: Some((
      registry.clone(),
      Box::new(move |g: &mut OwnershipGraph| {
        g.upsert_record(late.clone());
        g.own_record(&alice_id, late.key()).unwrap();
      }),
    )),
    ..Default::default()
  });
  let ctx = context(&registry, transport.clone(), DedupScope::Record);

  let first = run_scan(&ctx).await;
  assert_eq!(first.sent, 1);
  assert!(transport.calls().iter().all(|(_, k)| *k != late_key));

  let second = run_scan(&ctx).await;
  assert_eq!(second.sent, 2);
  assert!(transport.calls().iter().any(|(_, k)| *k == late_key));
}

#[tokio::test]
async fn record_removed_during_scan_is_stale_not_fatal() {
  let registry = Registry::default();
  let alice = person("Alice");
  let bob = person("Bob");
  own(&registry, &alice, record("Acme", "Intern", 1)).await;
  let doomed = record("Globex", "Intern", 1);
  let doomed_key = doomed.key().clone();
  own(&registry, &bob, doomed).await;

  let transport = Arc::new(MockTransport {
    on_first: Some((
      registry.clone(),
      Box::new(move |g: &mut OwnershipGraph| {
        g.remove_record(&doomed_key);
      }),
    )),
    ..Default::default()
  });

  let report = run_scan(&context(&registry, transport.clone(), DedupScope::Record)).await;
  assert_eq!(report.subscribers, 2);
  assert_eq!(report.sent, 1);
  assert_eq!(report.stale, 1);
}

#[tokio::test]
async fn unregistering_mid_scan_does_not_affect_snapshot() {
  let registry = Registry::default();
  let alice = person("Alice");
  let bob = person("Bob");
  own(&registry, &alice, record("Acme", "Intern", 1)).await;
  own(&registry, &bob, record("Globex", "Intern", 1)).await;

  let bob_id = bob.id.clone();
  let transport = Arc::new(MockTransport {
    on_first: Some((
      registry.clone(),
      Box::new(move |g: &mut OwnershipGraph| {
        g.unregister_subscriber(&bob_id);
      }),
    )),
    ..Default::default()
  });
  let ctx = context(&registry, transport.clone(), DedupScope::Record);

  assert_eq!(run_scan(&ctx).await.sent, 2);
  assert_eq!(run_scan(&ctx).await.sent, 1);
}

// ─── Scheduler lifecycle ─────────────────────────────────────────────────────

fn config(period: Duration) -> MonitorConfig {
  MonitorConfig {
    scan_period: period,
    shutdown_grace: Duration::from_secs(5),
    ..MonitorConfig::default()
  }
}

fn scheduler(
  registry: &Registry,
  transport: Arc<MockTransport>,
  config: &MonitorConfig,
) -> ScanScheduler<MockTransport> {
  let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(now()));
  ScanScheduler::new(registry.clone(), transport, config, clock)
}

#[tokio::test]
async fn start_and_stop_are_idempotent() {
  let registry = Registry::default();
  let transport = Arc::new(MockTransport::default());
  let s = scheduler(&registry, transport, &config(Duration::from_secs(3600)));

  assert!(!s.is_running());
  assert!(s.start());
  assert!(!s.start());
  assert!(s.is_running());

  assert!(s.stop().await);
  assert!(!s.stop().await);
  assert!(!s.is_running());

  // A stopped scheduler can be started again.
  assert!(s.start());
  assert!(s.stop().await);
}

#[tokio::test]
async fn first_scan_fires_immediately() {
  let registry = Registry::default();
  own(&registry, &person("Alice"), record("Acme", "Intern", 2)).await;
  let transport = Arc::new(MockTransport::default());
  let s = scheduler(&registry, transport.clone(), &config(Duration::from_secs(3600)));

  s.start();
  tokio::time::sleep(Duration::from_millis(200)).await;
  s.stop().await;

  assert_eq!(transport.attempts(), 1);
  assert_eq!(s.last_report().map(|r| r.sent), Some(1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn slow_scans_never_overlap() {
  let registry = Registry::default();
  own(&registry, &person("Alice"), record("Acme", "Intern", 1)).await;
  own(&registry, &person("Bob"), record("Globex", "Intern", 1)).await;

  let transport = Arc::new(MockTransport {
    delay: Some(Duration::from_millis(40)),
    ..Default::default()
  });
  let s = scheduler(&registry, transport.clone(), &config(Duration::from_millis(10)));

  s.start();
  tokio::time::sleep(Duration::from_millis(400)).await;
  // A manual trigger during a scheduled scan is refused, not run alongside.
  let manual = s.scan_now().await;
  s.stop().await;

  assert_eq!(transport.max_in_flight.load(Ordering::SeqCst), 1);
  assert!(transport.attempts() >= 4, "only {} attempts", transport.attempts());
  if let Some(report) = manual {
    assert_eq!(report.attempted(), 2);
  }
}

#[tokio::test]
async fn scan_now_refused_while_scan_in_flight() {
  let registry = Registry::default();
  own(&registry, &person("Alice"), record("Acme", "Intern", 1)).await;
  let transport = Arc::new(MockTransport {
    delay: Some(Duration::from_millis(300)),
    ..Default::default()
  });
  let s = scheduler(&registry, transport.clone(), &config(Duration::from_secs(3600)));

  s.start();
  tokio::time::sleep(Duration::from_millis(50)).await;
  assert!(s.scan_now().await.is_none());
  s.stop().await;

  // With the loop stopped the gate is free again.
  assert_eq!(s.scan_now().await.map(|r| r.sent), Some(1));
}

#[tokio::test]
async fn stop_abandons_scan_after_grace_period() {
  let registry = Registry::default();
  own(&registry, &person("Alice"), record("Acme", "Intern", 1)).await;
  let transport = Arc::new(MockTransport {
    delay: Some(Duration::from_secs(30)),
    ..Default::default()
  });
  let mut cfg = config(Duration::from_secs(3600));
  cfg.shutdown_grace = Duration::from_millis(50);
  cfg.dispatch_timeout = Duration::from_secs(60);
  let s = scheduler(&registry, transport.clone(), &cfg);

  s.start();
  tokio::time::sleep(Duration::from_millis(20)).await;

  let started = std::time::Instant::now();
  assert!(s.stop().await);
  assert!(started.elapsed() < Duration::from_secs(5));
  assert!(!s.is_running());
  assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn panicking_scan_does_not_kill_the_scheduler() {
  let registry = Registry::default();
  own(&registry, &person("Alice"), record("Acme", "Intern", 1)).await;
  let transport = Arc::new(MockTransport { panic_on: Some(1), ..Default::default() });
  let s = scheduler(&registry, transport.clone(), &config(Duration::from_millis(20)));

  s.start();
  tokio::time::sleep(Duration::from_millis(200)).await;
  assert!(s.is_running());
  s.stop().await;

  assert!(transport.attempts() >= 2);
  assert!(!transport.calls().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn firings_during_an_overrunning_scan_are_dropped() {
  let registry = Registry::default();
  own(&registry, &person("Alice"), record("Acme", "Intern", 1)).await;
  let transport = Arc::new(MockTransport {
    delay: Some(Duration::from_millis(250)),
    ..Default::default()
  });
  let s = scheduler(&registry, transport.clone(), &config(Duration::from_millis(100)));

  s.start();
  tokio::time::sleep(Duration::from_millis(420)).await;
  s.stop().await;

  // Firings at 100 ms and 200 ms fall inside the first scan and are skipped;
  // the next scan waits for the 300 ms boundary instead of starting at 250 ms.
  let started = transport.started();
  assert_eq!(started.len(), 2, "scan starts: {started:?}");
  let gap = started[1] - started[0];
  assert!(gap >= Duration::from_millis(290), "second scan started after {gap:?}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn no_scan_starts_after_stop() {
  for _ in 0..10 {
    let registry = Registry::default();
    own(&registry, &person("Alice"), record("Acme", "Intern", 1)).await;
    let transport = Arc::new(MockTransport {
      delay: Some(Duration::from_millis(60)),
      ..Default::default()
    });
    let s = scheduler(&registry, transport.clone(), &config(Duration::from_millis(20)));

    s.start();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(s.stop().await);
    assert_eq!(transport.attempts(), 1);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(transport.attempts(), 1);
  }
}

#[tokio::test]
async fn dropping_the_scheduler_stops_the_loop() {
  let registry = Registry::default();
  own(&registry, &person("Alice"), record("Acme", "Intern", 1)).await;
  let transport = Arc::new(MockTransport::default());
  let s = scheduler(&registry, transport.clone(), &config(Duration::from_millis(10)));

  s.start();
  tokio::time::sleep(Duration::from_millis(50)).await;
  drop(s);
  tokio::time::sleep(Duration::from_millis(20)).await;

  let after_drop = transport.attempts();
  assert!(after_drop >= 1);
  tokio::time::sleep(Duration::from_millis(100)).await;
  assert_eq!(transport.attempts(), after_drop);
}
