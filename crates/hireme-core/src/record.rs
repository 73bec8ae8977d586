//! Deadline records: one internship application per company and position.
//!
//! A record's identity is its [`RecordKey`], computed once at construction
//! from the company and position. Two records with the same key are the same
//! entity even when their other fields differ. Changing the company or
//! position produces a new record with a new key; see
//! [`crate::graph::OwnershipGraph::rekey_record`] for moving edges over.

use std::{
  fmt,
  hash::{Hash, Hasher},
};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ─── Key ─────────────────────────────────────────────────────────────────────

/// Immutable identity of a [`Record`].
#[derive(
  Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct RecordKey {
  company:  String,
  position: String,
}

impl RecordKey {
  pub fn new(company: impl Into<String>, position: impl Into<String>) -> Self {
    Self { company: company.into(), position: position.into() }
  }

  pub fn company(&self) -> &str { &self.company }

  pub fn position(&self) -> &str { &self.position }
}

impl fmt::Display for RecordKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}-{}", self.company, self.position)
  }
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// A company/position application with a due date.
///
/// Equality and hashing consider the key only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
  key:             RecordKey,
  pub description: String,
  /// Application deadline. Time of day is irrelevant.
  pub deadline:    NaiveDate,
  pub url:         String,
  /// Free-text annotation attached by the owner.
  pub annotation:  Option<String>,
}

impl Record {
  pub fn new(
    company: impl Into<String>,
    position: impl Into<String>,
    description: impl Into<String>,
    deadline: NaiveDate,
    url: impl Into<String>,
  ) -> Self {
    Self {
      key: RecordKey::new(company, position),
      description: description.into(),
      deadline,
      url: url.into(),
      annotation: None,
    }
  }

  pub fn key(&self) -> &RecordKey { &self.key }

  pub fn company(&self) -> &str { self.key.company() }

  pub fn position(&self) -> &str { self.key.position() }

  /// A copy of this record under a different company and position.
  ///
  /// The result is a different entity; ownership sets still reference the
  /// old key until the caller re-keys them.
  pub fn with_identity(
    &self,
    company: impl Into<String>,
    position: impl Into<String>,
  ) -> Self {
    Self { key: RecordKey::new(company, position), ..self.clone() }
  }

  pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
    self.annotation = Some(annotation.into());
    self
  }
}

impl PartialEq for Record {
  fn eq(&self, other: &Self) -> bool { self.key == other.key }
}

impl Eq for Record {}

impl Hash for Record {
  fn hash<H: Hasher>(&self, state: &mut H) { self.key.hash(state); }
}

impl fmt::Display for Record {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} - {}", self.company(), self.position())
  }
}
