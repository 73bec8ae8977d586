//! The ownership graph: who can see which deadline records.
//!
//! Subscribers, groups and records live in an arena addressed by their stable
//! identifiers. Relationships are explicit edge tables:
//!
//! | Table       | Direction                      |
//! |-------------|--------------------------------|
//! | `owned`     | subscriber → record keys       |
//! | `member_of` | subscriber → groups            |
//! | `members`   | group → subscribers            |
//! | `shared`    | group → record keys            |
//!
//! `member_of` and `members` are two views of one relation and are only ever
//! changed together, by [`OwnershipGraph::join_group`],
//! [`OwnershipGraph::leave_group`] and the removal operations.
//!
//! All maps are ordered so that snapshots iterate deterministically.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  record::{Record, RecordKey},
  store::{StoredGroup, StoredSubscriber},
  subscriber::{Group, GroupId, Subscriber, SubscriberId},
};

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// What one subscriber could see when a scan started.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriberSnapshot {
  pub subscriber: Subscriber,
  pub owned:      Vec<RecordKey>,
  /// Shared record keys, per group the subscriber belonged to.
  pub groups:     Vec<(GroupId, Vec<RecordKey>)>,
}

impl SubscriberSnapshot {
  /// Owned keys first, then each group's shared keys. A key reachable through
  /// several paths is yielded once per path.
  pub fn reachable(&self) -> impl Iterator<Item = &RecordKey> {
    self
      .owned
      .iter()
      .chain(self.groups.iter().flat_map(|(_, keys)| keys.iter()))
  }
}

/// A point-in-time copy of the subscriber set and its edges. Record data is
/// not copied; a scan resolves each key against the live graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanSnapshot {
  pub subscribers: Vec<SubscriberSnapshot>,
}

// ─── Graph ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct OwnershipGraph {
  subscribers: BTreeMap<SubscriberId, Subscriber>,
  groups:      BTreeMap<GroupId, Group>,
  records:     HashMap<RecordKey, Record>,
  owned:       BTreeMap<SubscriberId, BTreeSet<RecordKey>>,
  member_of:   BTreeMap<SubscriberId, BTreeSet<GroupId>>,
  members:     BTreeMap<GroupId, BTreeSet<SubscriberId>>,
  shared:      BTreeMap<GroupId, BTreeSet<RecordKey>>,
}

impl OwnershipGraph {
  pub fn new() -> Self { Self::default() }

  /// Rebuild a graph from what the storage collaborator returned.
  ///
  /// Group members that are not among `subscribers` are skipped: the store
  /// may hold membership rows for subscribers removed since.
  pub fn from_stored(
    subscribers: Vec<StoredSubscriber>,
    groups: Vec<StoredGroup>,
  ) -> Self {
    let mut graph = Self::new();

    for stored in subscribers {
      let id = stored.subscriber.id.clone();
      graph.register_subscriber(stored.subscriber);
      for record in stored.records {
        let key = record.key().clone();
        graph.upsert_record(record);
        graph.owned.entry(id.clone()).or_default().insert(key);
      }
    }

    for stored in groups {
      let gid = stored.group.id;
      graph.insert_group(stored.group);
      for record in stored.records {
        let key = record.key().clone();
        graph.upsert_record(record);
        graph.shared.entry(gid).or_default().insert(key);
      }
      for member in stored.members {
        if let Err(e) = graph.join_group(&member, gid) {
          tracing::debug!(group = %gid, member = %member, error = %e, "skipping stored group member");
        }
      }
    }

    graph
  }

  // ── Subscribers ──────────────────────────────────────────────────────────

  /// Register a subscriber. Returns `true` if it was not registered before;
  /// re-registering only refreshes the display name.
  pub fn register_subscriber(&mut self, subscriber: Subscriber) -> bool {
    let id = subscriber.id.clone();
    let inserted = self.subscribers.insert(id.clone(), subscriber).is_none();
    self.owned.entry(id.clone()).or_default();
    self.member_of.entry(id).or_default();
    inserted
  }

  /// Remove a subscriber together with its owned edges and both sides of its
  /// group memberships. Records stay in the graph.
  pub fn unregister_subscriber(
    &mut self,
    id: &SubscriberId,
  ) -> Option<Subscriber> {
    let subscriber = self.subscribers.remove(id)?;
    self.owned.remove(id);
    for gid in self.member_of.remove(id).unwrap_or_default() {
      if let Some(members) = self.members.get_mut(&gid) {
        members.remove(id);
      }
    }
    Some(subscriber)
  }

  pub fn subscriber(&self, id: &SubscriberId) -> Option<&Subscriber> {
    self.subscribers.get(id)
  }

  pub fn subscribers(&self) -> impl Iterator<Item = &Subscriber> {
    self.subscribers.values()
  }

  pub fn subscriber_count(&self) -> usize { self.subscribers.len() }

  // ── Records ──────────────────────────────────────────────────────────────

  /// Insert a record, or replace the data of the record with the same key.
  pub fn upsert_record(&mut self, record: Record) {
    self.records.insert(record.key().clone(), record);
  }

  /// Remove a record and every edge pointing at it.
  pub fn remove_record(&mut self, key: &RecordKey) -> Option<Record> {
    let record = self.records.remove(key)?;
    for keys in self.owned.values_mut().chain(self.shared.values_mut()) {
      keys.remove(key);
    }
    Some(record)
  }

  pub fn record(&self, key: &RecordKey) -> Option<&Record> {
    self.records.get(key)
  }

  pub fn records(&self) -> impl Iterator<Item = &Record> {
    self.records.values()
  }

  /// Move every ownership and sharing edge from `old` to `record`'s key.
  ///
  /// This is the only way a record changes identity: the old record is
  /// removed and `record` takes its place in every set that held `old`.
  pub fn rekey_record(&mut self, old: &RecordKey, record: Record) -> Result<()> {
    let new = record.key().clone();
    if !self.records.contains_key(old) {
      return Err(Error::RecordNotFound(old.clone()));
    }
    if new == *old {
      self.upsert_record(record);
      return Ok(());
    }
    if self.records.contains_key(&new) {
      return Err(Error::RecordExists(new));
    }

    self.records.remove(old);
    self.records.insert(new.clone(), record);
    for keys in self.owned.values_mut().chain(self.shared.values_mut()) {
      if keys.remove(old) {
        keys.insert(new.clone());
      }
    }
    Ok(())
  }

  // ── Ownership ────────────────────────────────────────────────────────────

  /// Add `key` to the subscriber's owned set. Returns `false` if it was
  /// already owned.
  pub fn own_record(
    &mut self,
    id: &SubscriberId,
    key: &RecordKey,
  ) -> Result<bool> {
    self.require_subscriber(id)?;
    self.require_record(key)?;
    Ok(self.owned.entry(id.clone()).or_default().insert(key.clone()))
  }

  /// Drop `key` from the subscriber's owned set. The record itself stays.
  pub fn disown_record(
    &mut self,
    id: &SubscriberId,
    key: &RecordKey,
  ) -> Result<bool> {
    self.require_subscriber(id)?;
    Ok(self.owned.get_mut(id).is_some_and(|keys| keys.remove(key)))
  }

  pub fn owned_records(&self, id: &SubscriberId) -> Vec<&Record> {
    self
      .owned
      .get(id)
      .into_iter()
      .flatten()
      .filter_map(|key| self.records.get(key))
      .collect()
  }

  // ── Groups ───────────────────────────────────────────────────────────────

  pub fn create_group(&mut self, name: impl Into<String>) -> GroupId {
    let group = Group::new(name);
    let gid = group.id;
    self.insert_group(group);
    gid
  }

  /// Insert a group with a known id, keeping any existing edges.
  pub fn insert_group(&mut self, group: Group) {
    let gid = group.id;
    self.groups.insert(gid, group);
    self.members.entry(gid).or_default();
    self.shared.entry(gid).or_default();
  }

  /// Remove a group, both sides of its memberships and its shared edges.
  pub fn remove_group(&mut self, gid: GroupId) -> Option<Group> {
    let group = self.groups.remove(&gid)?;
    self.shared.remove(&gid);
    for id in self.members.remove(&gid).unwrap_or_default() {
      if let Some(groups) = self.member_of.get_mut(&id) {
        groups.remove(&gid);
      }
    }
    Some(group)
  }

  pub fn group(&self, gid: GroupId) -> Option<&Group> { self.groups.get(&gid) }

  pub fn groups(&self) -> impl Iterator<Item = &Group> { self.groups.values() }

  /// Make `id` a member of `gid`, updating both directions. Returns `false`
  /// if it already was.
  pub fn join_group(&mut self, id: &SubscriberId, gid: GroupId) -> Result<bool> {
    self.require_subscriber(id)?;
    self.require_group(gid)?;
    let added = self.members.entry(gid).or_default().insert(id.clone());
    self.member_of.entry(id.clone()).or_default().insert(gid);
    Ok(added)
  }

  /// Remove `id` from `gid`, updating both directions.
  pub fn leave_group(
    &mut self,
    id: &SubscriberId,
    gid: GroupId,
  ) -> Result<bool> {
    self.require_subscriber(id)?;
    self.require_group(gid)?;
    let removed = self.members.get_mut(&gid).is_some_and(|m| m.remove(id));
    if let Some(groups) = self.member_of.get_mut(id) {
      groups.remove(&gid);
    }
    Ok(removed)
  }

  pub fn is_member(&self, id: &SubscriberId, gid: GroupId) -> bool {
    self.members.get(&gid).is_some_and(|m| m.contains(id))
  }

  pub fn groups_of(&self, id: &SubscriberId) -> Vec<&Group> {
    self
      .member_of
      .get(id)
      .into_iter()
      .flatten()
      .filter_map(|gid| self.groups.get(gid))
      .collect()
  }

  pub fn members_of(&self, gid: GroupId) -> Vec<&Subscriber> {
    self
      .members
      .get(&gid)
      .into_iter()
      .flatten()
      .filter_map(|id| self.subscribers.get(id))
      .collect()
  }

  pub fn share_record(&mut self, gid: GroupId, key: &RecordKey) -> Result<bool> {
    self.require_group(gid)?;
    self.require_record(key)?;
    Ok(self.shared.entry(gid).or_default().insert(key.clone()))
  }

  pub fn unshare_record(
    &mut self,
    gid: GroupId,
    key: &RecordKey,
  ) -> Result<bool> {
    self.require_group(gid)?;
    Ok(self.shared.get_mut(&gid).is_some_and(|keys| keys.remove(key)))
  }

  pub fn shared_records(&self, gid: GroupId) -> Vec<&Record> {
    self
      .shared
      .get(&gid)
      .into_iter()
      .flatten()
      .filter_map(|key| self.records.get(key))
      .collect()
  }

  // ── Reachability ─────────────────────────────────────────────────────────

  /// Every record key reachable for `id`: owned keys, then each group's
  /// shared keys. Keys reachable through several paths repeat.
  pub fn reachable_records(&self, id: &SubscriberId) -> Vec<RecordKey> {
    self
      .snapshot_subscriber(id)
      .map(|snap| snap.reachable().cloned().collect())
      .unwrap_or_default()
  }

  /// Copy the subscriber set and its edges for one scan.
  pub fn snapshot(&self) -> ScanSnapshot {
    ScanSnapshot {
      subscribers: self
        .subscribers
        .keys()
        .filter_map(|id| self.snapshot_subscriber(id))
        .collect(),
    }
  }

  fn snapshot_subscriber(&self, id: &SubscriberId) -> Option<SubscriberSnapshot> {
    let subscriber = self.subscribers.get(id)?.clone();
    let owned = self
      .owned
      .get(id)
      .map(|keys| keys.iter().cloned().collect())
      .unwrap_or_default();
    let groups = self
      .member_of
      .get(id)
      .into_iter()
      .flatten()
      .map(|gid| {
        let keys = self
          .shared
          .get(gid)
          .map(|keys| keys.iter().cloned().collect())
          .unwrap_or_default();
        (*gid, keys)
      })
      .collect();
    Some(SubscriberSnapshot { subscriber, owned, groups })
  }

  // ── Persistence views ────────────────────────────────────────────────────

  pub fn stored_subscriber(&self, id: &SubscriberId) -> Option<StoredSubscriber> {
    let subscriber = self.subscribers.get(id)?.clone();
    let records = self.owned_records(id).into_iter().cloned().collect();
    Some(StoredSubscriber { subscriber, records })
  }

  pub fn stored_group(&self, gid: GroupId) -> Option<StoredGroup> {
    let group = self.groups.get(&gid)?.clone();
    let members = self
      .members
      .get(&gid)
      .map(|m| m.iter().cloned().collect())
      .unwrap_or_default();
    let records = self.shared_records(gid).into_iter().cloned().collect();
    Some(StoredGroup { group, members, records })
  }

  // ── Helpers ──────────────────────────────────────────────────────────────

  fn require_subscriber(&self, id: &SubscriberId) -> Result<()> {
    if self.subscribers.contains_key(id) {
      Ok(())
    } else {
      Err(Error::SubscriberNotFound(id.clone()))
    }
  }

  fn require_group(&self, gid: GroupId) -> Result<()> {
    if self.groups.contains_key(&gid) {
      Ok(())
    } else {
      Err(Error::GroupNotFound(gid))
    }
  }

  fn require_record(&self, key: &RecordKey) -> Result<()> {
    if self.records.contains_key(key) {
      Ok(())
    } else {
      Err(Error::RecordNotFound(key.clone()))
    }
  }
}
