//! Per-scan deduplication of notifications.
//!
//! A tracker lives for exactly one scan. The scheduler asks it before every
//! dispatch; which pairs count as duplicates is the tracker's policy alone.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{record::RecordKey, subscriber::SubscriberId};

/// Gate consulted once per due (subscriber, record) pair during a scan.
pub trait DedupTracker: Send {
  /// Claim the pair. Returns `true` the first time a claim succeeds under this
  /// tracker's policy, `false` for every later duplicate.
  fn try_claim(&mut self, subscriber: &SubscriberId, record: &RecordKey) -> bool;

  /// Number of successful claims so far.
  fn claimed(&self) -> usize;
}

/// One notification per record per scan, whichever subscriber claims it first.
/// Other subscribers reaching the same record are not notified in that scan.
#[derive(Debug, Default)]
pub struct RecordDedup {
  claimed: HashSet<RecordKey>,
}

impl DedupTracker for RecordDedup {
  fn try_claim(&mut self, _subscriber: &SubscriberId, record: &RecordKey) -> bool {
    self.claimed.insert(record.clone())
  }

  fn claimed(&self) -> usize { self.claimed.len() }
}

/// One notification per (subscriber, record) pair per scan.
#[derive(Debug, Default)]
pub struct PairDedup {
  claimed: HashSet<(SubscriberId, RecordKey)>,
}

impl DedupTracker for PairDedup {
  fn try_claim(&mut self, subscriber: &SubscriberId, record: &RecordKey) -> bool {
    self.claimed.insert((subscriber.clone(), record.clone()))
  }

  fn claimed(&self) -> usize { self.claimed.len() }
}

/// Which [`DedupTracker`] a scan uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupScope {
  /// [`RecordDedup`].
  #[default]
  Record,
  /// [`PairDedup`].
  SubscriberRecord,
}

impl DedupScope {
  /// A fresh, empty tracker for one scan.
  pub fn tracker(self) -> Box<dyn DedupTracker> {
    match self {
      Self::Record => Box::<RecordDedup>::default(),
      Self::SubscriberRecord => Box::<PairDedup>::default(),
    }
  }
}
