//! SQL schema for the HireME SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS subscribers (
    subscriber_id TEXT PRIMARY KEY,   -- email address
    name          TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS user_groups (
    group_id TEXT PRIMARY KEY,
    name     TEXT NOT NULL
);

-- Identity is (company, position); every other column may change.
CREATE TABLE IF NOT EXISTS records (
    company     TEXT NOT NULL,
    position    TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    deadline    TEXT NOT NULL,         -- YYYY-MM-DD
    url         TEXT NOT NULL DEFAULT '',
    annotation  TEXT,
    PRIMARY KEY (company, position)
);

CREATE TABLE IF NOT EXISTS owned_records (
    subscriber_id TEXT NOT NULL REFERENCES subscribers(subscriber_id) ON DELETE CASCADE,
    company       TEXT NOT NULL,
    position      TEXT NOT NULL,
    PRIMARY KEY (subscriber_id, company, position),
    FOREIGN KEY (company, position) REFERENCES records(company, position) ON DELETE CASCADE
);

-- No foreign key on subscriber_id: a group may be persisted before its
-- members are. Loaders skip members they do not know.
CREATE TABLE IF NOT EXISTS group_members (
    group_id      TEXT NOT NULL REFERENCES user_groups(group_id) ON DELETE CASCADE,
    subscriber_id TEXT NOT NULL,
    PRIMARY KEY (group_id, subscriber_id)
);

CREATE TABLE IF NOT EXISTS group_records (
    group_id TEXT NOT NULL REFERENCES user_groups(group_id) ON DELETE CASCADE,
    company  TEXT NOT NULL,
    position TEXT NOT NULL,
    PRIMARY KEY (group_id, company, position),
    FOREIGN KEY (company, position) REFERENCES records(company, position) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS group_members_subscriber_idx ON group_members(subscriber_id);
CREATE INDEX IF NOT EXISTS records_deadline_idx         ON records(deadline);

PRAGMA user_version = 1;
";
