//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Deadlines are stored as `YYYY-MM-DD`. Group ids are stored as hyphenated
//! lowercase UUID strings. Subscriber ids are the email address verbatim.

use chrono::NaiveDate;
use hireme_core::{
  record::Record,
  subscriber::{Group, GroupId, Subscriber, SubscriberId},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── GroupId ──────────────────────────────────────────────────────────────────

pub fn encode_group_id(id: GroupId) -> String { id.0.hyphenated().to_string() }

pub fn decode_group_id(s: &str) -> Result<GroupId> {
  Ok(GroupId(Uuid::parse_str(s)?))
}

// ─── NaiveDate ────────────────────────────────────────────────────────────────

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn encode_date(d: NaiveDate) -> String { d.format(DATE_FORMAT).to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT)
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Raw row types ────────────────────────────────────────────────────────────

/// A `records` row as read from SQLite, before date decoding.
#[derive(Debug)]
pub struct RawRecord {
  pub company:     String,
  pub position:    String,
  pub description: String,
  pub deadline:    String,
  pub url:         String,
  pub annotation:  Option<String>,
}

impl RawRecord {
  /// Column list matching [`RawRecord::from_row`], prefixed with `alias.`.
  pub const COLUMNS: &'static str =
    "r.company, r.position, r.description, r.deadline, r.url, r.annotation";

  /// Read the six record columns starting at `offset`.
  pub fn from_row(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      company:     row.get(offset)?,
      position:    row.get(offset + 1)?,
      description: row.get(offset + 2)?,
      deadline:    row.get(offset + 3)?,
      url:         row.get(offset + 4)?,
      annotation:  row.get(offset + 5)?,
    })
  }

  pub fn into_record(self) -> Result<Record> {
    let deadline = decode_date(&self.deadline)?;
    let mut record =
      Record::new(self.company, self.position, self.description, deadline, self.url);
    record.annotation = self.annotation;
    Ok(record)
  }
}

/// A record flattened into owned column values, ready for a `params!` list.
#[derive(Debug, Clone)]
pub struct RecordRow {
  pub company:     String,
  pub position:    String,
  pub description: String,
  pub deadline:    String,
  pub url:         String,
  pub annotation:  Option<String>,
}

impl From<&Record> for RecordRow {
  fn from(r: &Record) -> Self {
    Self {
      company:     r.company().to_owned(),
      position:    r.position().to_owned(),
      description: r.description.clone(),
      deadline:    encode_date(r.deadline),
      url:         r.url.clone(),
      annotation:  r.annotation.clone(),
    }
  }
}

#[derive(Debug)]
pub struct RawSubscriber {
  pub subscriber_id: String,
  pub name:          String,
}

impl RawSubscriber {
  pub fn into_subscriber(self) -> Subscriber {
    Subscriber { id: SubscriberId::new(self.subscriber_id), name: self.name }
  }
}

#[derive(Debug)]
pub struct RawGroup {
  pub group_id: String,
  pub name:     String,
}

impl RawGroup {
  pub fn into_group(self) -> Result<Group> {
    Ok(Group { id: decode_group_id(&self.group_id)?, name: self.name })
  }
}
