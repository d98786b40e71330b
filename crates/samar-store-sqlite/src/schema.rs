//! SQL schema for the Samar SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One document per identity. Never deleted.
CREATE TABLE IF NOT EXISTS profiles (
    user_id       TEXT PRIMARY KEY,
    email         TEXT    NOT NULL DEFAULT '',
    display_name  TEXT    NOT NULL DEFAULT '',
    avatar_url    TEXT    NOT NULL DEFAULT '',
    status        TEXT    NOT NULL DEFAULT '',
    is_online     INTEGER NOT NULL DEFAULT 0,
    last_seen     TEXT    NOT NULL,   -- RFC 3339 UTC, fixed width
    created_at    TEXT    NOT NULL,
    updated_at    TEXT    NOT NULL
);

-- No uniqueness constraint on participants: callers look up before create.
CREATE TABLE IF NOT EXISTS conversations (
    conversation_id   TEXT PRIMARY KEY,
    participants      TEXT NOT NULL,             -- JSON array of user ids
    last_message_text TEXT NOT NULL DEFAULT '',
    last_message_time TEXT,                      -- NULL until the first send
    created_at        TEXT NOT NULL
);

-- Messages are strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS messages (
    seq             INTEGER PRIMARY KEY AUTOINCREMENT,
    message_id      TEXT NOT NULL UNIQUE,
    conversation_id TEXT NOT NULL REFERENCES conversations(conversation_id),
    text            TEXT NOT NULL,
    sender_id       TEXT NOT NULL,
    sender_name     TEXT NOT NULL,
    sent_at         TEXT NOT NULL                -- server-assigned
);

CREATE TABLE IF NOT EXISTS blobs (
    path         TEXT PRIMARY KEY,
    media_type   TEXT NOT NULL,
    content_hash TEXT NOT NULL,                  -- SHA-256 hex
    bytes        BLOB NOT NULL,
    created_at   TEXT NOT NULL
);

-- Local identity-provider accounts.
CREATE TABLE IF NOT EXISTS accounts (
    user_id          TEXT PRIMARY KEY,
    email            TEXT NOT NULL,
    display_name     TEXT NOT NULL DEFAULT '',
    avatar_url       TEXT NOT NULL DEFAULT '',
    password_hash    TEXT,                       -- argon2 PHC; NULL if federated
    provider         TEXT NOT NULL,              -- 'password' or federated provider
    provider_subject TEXT,
    created_at       TEXT NOT NULL,
    UNIQUE (provider, provider_subject)
);

-- The signed-in account, if any. At most one row.
CREATE TABLE IF NOT EXISTS auth_session (
    slot       INTEGER PRIMARY KEY CHECK (slot = 0),
    user_id    TEXT NOT NULL REFERENCES accounts(user_id),
    started_at TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS accounts_password_email_idx
    ON accounts(email) WHERE provider = 'password';
CREATE INDEX IF NOT EXISTS messages_conversation_idx
    ON messages(conversation_id, sent_at);
CREATE INDEX IF NOT EXISTS profiles_updated_idx ON profiles(updated_at);

PRAGMA user_version = 1;
";
