//! [`SqliteStore`] — the SQLite implementation of [`DeadlineStore`].

use std::{collections::HashMap, path::Path};

use hireme_core::{
  record::Record,
  store::{DeadlineStore, Entity, StoredGroup, StoredSubscriber},
  subscriber::SubscriberId,
};

use crate::{
  Result,
  encode::{RawGroup, RawRecord, RawSubscriber, RecordRow, encode_group_id},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A deadline store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — used for tests and as the startup fallback
  /// when the configured file cannot be opened.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Write helpers ───────────────────────────────────────────────────────────

fn upsert_record(conn: &rusqlite::Connection, row: &RecordRow) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO records (company, position, description, deadline, url, annotation)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
     ON CONFLICT (company, position) DO UPDATE SET
       description = excluded.description,
       deadline    = excluded.deadline,
       url         = excluded.url,
       annotation  = excluded.annotation",
    rusqlite::params![
      row.company,
      row.position,
      row.description,
      row.deadline,
      row.url,
      row.annotation,
    ],
  )?;
  Ok(())
}

fn group_records_by_owner(
  rows: Vec<(String, RawRecord)>,
) -> Result<HashMap<String, Vec<Record>>> {
  let mut by_owner: HashMap<String, Vec<Record>> = HashMap::new();
  for (owner, raw) in rows {
    by_owner.entry(owner).or_default().push(raw.into_record()?);
  }
  Ok(by_owner)
}

// ─── DeadlineStore impl ──────────────────────────────────────────────────────

impl DeadlineStore for SqliteStore {
  type Error = crate::Error;

  async fn load_subscribers(&self) -> Result<Vec<StoredSubscriber>> {
    let (subscribers, owned) = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT subscriber_id, name FROM subscribers ORDER BY subscriber_id")?;
        let subscribers = stmt
          .query_map([], |row| {
            Ok(RawSubscriber { subscriber_id: row.get(0)?, name: row.get(1)? })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(&format!(
          "SELECT o.subscriber_id, {}
           FROM owned_records o
           JOIN records r ON r.company = o.company AND r.position = o.position",
          RawRecord::COLUMNS
        ))?;
        let owned = stmt
          .query_map([], |row| Ok((row.get::<_, String>(0)?, RawRecord::from_row(row, 1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((subscribers, owned))
      })
      .await?;

    let mut owned = group_records_by_owner(owned)?;

    Ok(
      subscribers
        .into_iter()
        .map(|raw| {
          let records = owned.remove(&raw.subscriber_id).unwrap_or_default();
          StoredSubscriber { subscriber: raw.into_subscriber(), records }
        })
        .collect(),
    )
  }

  async fn load_groups(&self) -> Result<Vec<StoredGroup>> {
    let (groups, members, shared) = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare("SELECT group_id, name FROM user_groups ORDER BY name")?;
        let groups = stmt
          .query_map([], |row| Ok(RawGroup { group_id: row.get(0)?, name: row.get(1)? }))?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare("SELECT group_id, subscriber_id FROM group_members")?;
        let members = stmt
          .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(&format!(
          "SELECT g.group_id, {}
           FROM group_records g
           JOIN records r ON r.company = g.company AND r.position = g.position",
          RawRecord::COLUMNS
        ))?;
        let shared = stmt
          .query_map([], |row| Ok((row.get::<_, String>(0)?, RawRecord::from_row(row, 1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((groups, members, shared))
      })
      .await?;

    let mut members_by_group: HashMap<String, Vec<SubscriberId>> = HashMap::new();
    for (group_id, subscriber_id) in members {
      members_by_group
        .entry(group_id)
        .or_default()
        .push(SubscriberId::new(subscriber_id));
    }
    let mut shared = group_records_by_owner(shared)?;

    groups
      .into_iter()
      .map(|raw| {
        let members = members_by_group.remove(&raw.group_id).unwrap_or_default();
        let records = shared.remove(&raw.group_id).unwrap_or_default();
        Ok(StoredGroup { group: raw.into_group()?, members, records })
      })
      .collect()
  }

  async fn persist(&self, entity: &Entity) -> Result<()> {
    match entity {
      Entity::Record(record) => {
        let row = RecordRow::from(record);
        self
          .conn
          .call(move |conn| {
            upsert_record(conn, &row)?;
            Ok(())
          })
          .await?;
      }

      Entity::Subscriber(stored) => {
        let id = stored.subscriber.id.email().to_owned();
        let name = stored.subscriber.name.clone();
        let rows: Vec<RecordRow> = stored.records.iter().map(RecordRow::from).collect();

        self
          .conn
          .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
              "INSERT INTO subscribers (subscriber_id, name) VALUES (?1, ?2)
               ON CONFLICT (subscriber_id) DO UPDATE SET name = excluded.name",
              rusqlite::params![id, name],
            )?;
            tx.execute(
              "DELETE FROM owned_records WHERE subscriber_id = ?1",
              rusqlite::params![id],
            )?;
            for row in &rows {
              upsert_record(&tx, row)?;
              tx.execute(
                "INSERT INTO owned_records (subscriber_id, company, position)
                 VALUES (?1, ?2, ?3)",
                rusqlite::params![id, row.company, row.position],
              )?;
            }
            tx.commit()?;
            Ok(())
          })
          .await?;
      }

      Entity::Group(stored) => {
        let gid = encode_group_id(stored.group.id);
        let name = stored.group.name.clone();
        let members: Vec<String> =
          stored.members.iter().map(|m| m.email().to_owned()).collect();
        let rows: Vec<RecordRow> = stored.records.iter().map(RecordRow::from).collect();

        self
          .conn
          .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
              "INSERT INTO user_groups (group_id, name) VALUES (?1, ?2)
               ON CONFLICT (group_id) DO UPDATE SET name = excluded.name",
              rusqlite::params![gid, name],
            )?;
            tx.execute("DELETE FROM group_members WHERE group_id = ?1", rusqlite::params![gid])?;
            tx.execute("DELETE FROM group_records WHERE group_id = ?1", rusqlite::params![gid])?;
            for member in &members {
              tx.execute(
                "INSERT INTO group_members (group_id, subscriber_id) VALUES (?1, ?2)",
                rusqlite::params![gid, member],
              )?;
            }
            for row in &rows {
              upsert_record(&tx, row)?;
              tx.execute(
                "INSERT INTO group_records (group_id, company, position) VALUES (?1, ?2, ?3)",
                rusqlite::params![gid, row.company, row.position],
              )?;
            }
            tx.commit()?;
            Ok(())
          })
          .await?;
      }
    }
    Ok(())
  }

  async fn delete_subscriber(&self, id: &SubscriberId) -> Result<()> {
    let id = id.email().to_owned();
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM group_members WHERE subscriber_id = ?1", rusqlite::params![id])?;
        // owned_records rows go with the subscriber via ON DELETE CASCADE.
        tx.execute("DELETE FROM subscribers WHERE subscriber_id = ?1", rusqlite::params![id])?;
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
