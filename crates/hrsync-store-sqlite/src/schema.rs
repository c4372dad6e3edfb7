//! SQL schema for the hrsync SQLite directory.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS classes (
    uuid      TEXT PRIMARY KEY,
    facet     TEXT NOT NULL,   -- snake_case Facet name
    user_key  TEXT NOT NULL,
    name      TEXT NOT NULL,
    UNIQUE (facet, user_key)
);

CREATE TABLE IF NOT EXISTS persons (
    uuid        TEXT PRIMARY KEY,
    national_id TEXT NOT NULL UNIQUE,
    name        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS org_units (
    uuid       TEXT PRIMARY KEY,
    user_key   TEXT NOT NULL,
    name       TEXT NOT NULL,
    unit_type  TEXT NOT NULL REFERENCES classes(uuid),
    parent     TEXT REFERENCES org_units(uuid),
    valid_from TEXT NOT NULL,
    valid_to   TEXT
);

-- One row per validity slice. Slices of one detail share `uuid` and never
-- overlap; an edit rewrites all rows of the uuid in one transaction.
CREATE TABLE IF NOT EXISTS details (
    row_id     INTEGER PRIMARY KEY AUTOINCREMENT,
    uuid       TEXT NOT NULL,
    kind       TEXT NOT NULL,   -- snake_case DetailKind name
    person     TEXT REFERENCES persons(uuid),
    payload    TEXT NOT NULL,   -- JSON-encoded Detail
    valid_from TEXT NOT NULL,   -- YYYY-MM-DD
    valid_to   TEXT             -- YYYY-MM-DD, inclusive; NULL = open
);

CREATE INDEX IF NOT EXISTS details_uuid_idx   ON details(uuid);
CREATE INDEX IF NOT EXISTS details_person_idx ON details(person, kind);

PRAGMA user_version = 1;
";
