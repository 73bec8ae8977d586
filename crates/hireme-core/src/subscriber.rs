//! Subscribers and groups.
//!
//! Both are thin identity envelopes. Which records a subscriber owns and
//! which groups it belongs to live as edges in
//! [`crate::graph::OwnershipGraph`], never on the entities themselves.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identity of a subscriber: the email address reminders go to.
#[derive(
  Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SubscriberId(String);

impl SubscriberId {
  pub fn new(email: impl Into<String>) -> Self { Self(email.into()) }

  pub fn email(&self) -> &str { &self.0 }
}

impl fmt::Display for SubscriberId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// A user who receives deadline reminders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
  pub id:   SubscriberId,
  /// Display name used in reminder greetings.
  pub name: String,
}

impl Subscriber {
  pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
    Self { id: SubscriberId::new(email), name: name.into() }
  }

  pub fn email(&self) -> &str { self.id.email() }
}

impl fmt::Display for Subscriber {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} ({})", self.name, self.id)
  }
}

/// Stable identity of a group.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
  Deserialize,
)]
#[serde(transparent)]
pub struct GroupId(pub Uuid);

impl GroupId {
  pub fn new_v4() -> Self { Self(Uuid::new_v4()) }
}

impl fmt::Display for GroupId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.0.fmt(f)
  }
}

/// A set of subscribers sharing internship records with each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
  pub id:   GroupId,
  pub name: String,
}

impl Group {
  pub fn new(name: impl Into<String>) -> Self {
    Self { id: GroupId::new_v4(), name: name.into() }
  }
}
