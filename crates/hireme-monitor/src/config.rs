//! Monitor configuration with defaults for every field.

use std::time::Duration;

use hireme_core::{dedup::DedupScope, window::LeadTime};
use serde::{Deserialize, Serialize};

/// Configuration for the scan scheduler, deserialised from the `[monitor]`
/// table. Durations are whole seconds in config files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
  /// Time between scan firings (default: one day).
  #[serde(rename = "scan_period_secs", with = "duration_secs")]
  pub scan_period:      Duration,

  /// How far ahead of a deadline reminders start (default: 3 days).
  pub lead_time_days:   u32,

  /// How long `stop()` waits for an in-flight scan (default: 60 s).
  #[serde(rename = "shutdown_grace_secs", with = "duration_secs")]
  pub shutdown_grace:   Duration,

  /// Upper bound on a single transport call (default: 30 s).
  #[serde(rename = "dispatch_timeout_secs", with = "duration_secs")]
  pub dispatch_timeout: Duration,

  /// Which dedup policy scans use (default: one notification per record).
  pub dedup_scope:      DedupScope,
}

impl Default for MonitorConfig {
  fn default() -> Self {
    Self {
      scan_period:      Duration::from_secs(24 * 60 * 60),
      lead_time_days:   LeadTime::default().whole_days(),
      shutdown_grace:   Duration::from_secs(60),
      dispatch_timeout: Duration::from_secs(30),
      dedup_scope:      DedupScope::default(),
    }
  }
}

impl MonitorConfig {
  pub fn lead_time(&self) -> LeadTime { LeadTime::days(self.lead_time_days) }
}

mod duration_secs {
  use std::time::Duration;

  use serde::{Deserialize, Deserializer, Serializer};

  pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_secs())
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
    u64::deserialize(d).map(Duration::from_secs)
  }
}
