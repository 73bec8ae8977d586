//! The reminder window: which deadlines are close enough to remind about.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::record::Record;

/// How long before a deadline reminders start, in whole days.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct LeadTime(u32);

impl LeadTime {
  pub const fn days(days: u32) -> Self { Self(days) }

  pub const fn whole_days(self) -> u32 { self.0 }

  pub fn as_delta(self) -> TimeDelta { TimeDelta::days(i64::from(self.0)) }
}

impl Default for LeadTime {
  fn default() -> Self { Self::days(3) }
}

/// The instant a calendar deadline is compared at: midnight UTC.
pub fn deadline_instant(deadline: NaiveDate) -> DateTime<Utc> {
  deadline.and_time(NaiveTime::MIN).and_utc()
}

/// `true` iff `now < deadline < now + lead_time`. Both bounds are exclusive.
pub fn is_due(record: &Record, now: DateTime<Utc>, lead_time: LeadTime) -> bool {
  let deadline = deadline_instant(record.deadline);
  now < deadline && deadline < now + lead_time.as_delta()
}
