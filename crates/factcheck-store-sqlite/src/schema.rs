//! SQL schema for the factcheck SQLite store.
//!
//! Executed at every connection startup. The script ends by stamping
//! `PRAGMA user_version`; a database stamped with a newer version than
//! [`SCHEMA_VERSION`] is refused rather than downgraded.

/// Version written by [`SCHEMA`].
pub const SCHEMA_VERSION: i64 = 1;

/// Full schema DDL plus lookup-table seeds; idempotent thanks to
/// `IF NOT EXISTS` and `INSERT OR IGNORE`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS roles (
    id          INTEGER PRIMARY KEY,
    key         TEXT NOT NULL UNIQUE,
    name        TEXT NOT NULL,
    permissions TEXT NOT NULL DEFAULT '[]'   -- JSON array of permission tags
);

CREATE TABLE IF NOT EXISTS users (
    id                 INTEGER PRIMARY KEY,
    email              TEXT NOT NULL UNIQUE COLLATE NOCASE,
    first_name         TEXT NOT NULL,
    last_name          TEXT NOT NULL,
    password_hash      TEXT,                 -- argon2 PHC string
    role_id            INTEGER NOT NULL REFERENCES roles(id),
    active             INTEGER NOT NULL DEFAULT 1,
    notify_on_approval INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS speakers (
    id         INTEGER PRIMARY KEY,
    first_name TEXT NOT NULL,
    last_name  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sources (
    id         INTEGER PRIMARY KEY,
    name       TEXT NOT NULL,
    deleted_at TEXT
);

CREATE TABLE IF NOT EXISTS source_experts (
    source_id INTEGER NOT NULL REFERENCES sources(id),
    user_id   INTEGER NOT NULL REFERENCES users(id),
    PRIMARY KEY (source_id, user_id)
);

CREATE TABLE IF NOT EXISTS tags (
    id   INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

-- Static lookup tables, seeded below.
CREATE TABLE IF NOT EXISTS veracities (
    id   INTEGER PRIMARY KEY,
    key  TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS promise_ratings (
    id   INTEGER PRIMARY KEY,
    key  TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL
);

-- Statements are soft-deleted via deleted_at; rows are never removed.
CREATE TABLE IF NOT EXISTS statements (
    id                  INTEGER PRIMARY KEY,
    content             TEXT NOT NULL,
    title               TEXT,
    statement_type      TEXT NOT NULL,        -- 'factual' | 'promise'
    speaker_id          INTEGER NOT NULL REFERENCES speakers(id),
    source_id           INTEGER REFERENCES sources(id),
    published           INTEGER NOT NULL DEFAULT 0,
    important           INTEGER NOT NULL DEFAULT 0,
    count_in_statistics INTEGER NOT NULL DEFAULT 1,
    source_order        INTEGER,
    excerpted_at        TEXT NOT NULL,        -- RFC 3339 UTC, fixed width
    deleted_at          TEXT
);

CREATE TABLE IF NOT EXISTS statement_tags (
    statement_id INTEGER NOT NULL REFERENCES statements(id),
    tag_id       INTEGER NOT NULL REFERENCES tags(id),
    PRIMARY KEY (statement_id, tag_id)
);

-- Exactly one assessment per statement.
CREATE TABLE IF NOT EXISTS assessments (
    id                    INTEGER PRIMARY KEY,
    statement_id          INTEGER NOT NULL UNIQUE REFERENCES statements(id),
    evaluation_status     TEXT,
    veracity_id           INTEGER REFERENCES veracities(id),
    promise_rating_id     INTEGER REFERENCES promise_ratings(id),
    short_explanation     TEXT,
    explanation_html      TEXT,
    explanation_slatejson TEXT,               -- JSON document
    evaluator_id          INTEGER REFERENCES users(id)
);

CREATE TABLE IF NOT EXISTS notifications (
    id             INTEGER PRIMARY KEY,
    recipient_id   INTEGER NOT NULL REFERENCES users(id),
    statement_id   INTEGER NOT NULL REFERENCES statements(id),
    statement_text TEXT NOT NULL,
    full_text      TEXT NOT NULL,
    created_at     TEXT NOT NULL,
    read_at        TEXT
);

CREATE INDEX IF NOT EXISTS statements_source_idx     ON statements(source_id);
CREATE INDEX IF NOT EXISTS statements_speaker_idx    ON statements(speaker_id);
CREATE INDEX IF NOT EXISTS assessments_status_idx    ON assessments(evaluation_status);
CREATE INDEX IF NOT EXISTS notifications_recipient_idx ON notifications(recipient_id);

INSERT OR IGNORE INTO veracities (key, name) VALUES
    ('true',         'True'),
    ('untrue',       'Untrue'),
    ('misleading',   'Misleading'),
    ('unverifiable', 'Unverifiable');

INSERT OR IGNORE INTO promise_ratings (key, name) VALUES
    ('fulfilled',           'Fulfilled'),
    ('in_progress',         'In progress'),
    ('partially_fulfilled', 'Partially fulfilled'),
    ('broken',              'Broken'),
    ('stalled',             'Stalled');

PRAGMA user_version = 1;
";
