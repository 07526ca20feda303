//! SQL schema for the Yuletide SQLite store.
//!
//! Executed once at connection startup. Timestamps are integer microseconds
//! since the Unix epoch (UTC) so windows and distances are plain arithmetic.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS accounts (
    account_id     INTEGER PRIMARY KEY AUTOINCREMENT,
    username       TEXT NOT NULL UNIQUE,
    email          TEXT NOT NULL UNIQUE,
    password_hash  TEXT NOT NULL,
    is_superuser   INTEGER NOT NULL DEFAULT 0,
    joined_at_us   INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS sessions (
    token_hash     TEXT PRIMARY KEY,   -- hex SHA-256 of the bearer token
    account_id     INTEGER NOT NULL REFERENCES accounts(account_id) ON DELETE CASCADE,
    created_at_us  INTEGER NOT NULL,
    expires_at_us  INTEGER NOT NULL
);

-- One row per IP is enforced by the insert transaction, not a constraint:
-- superusers may post repeatedly from the same address.
CREATE TABLE IF NOT EXISTS snowballs (
    snowball_id    INTEGER PRIMARY KEY AUTOINCREMENT,
    content        TEXT NOT NULL,
    ip_address     TEXT NOT NULL,
    created_at_us  INTEGER NOT NULL,
    account_id     INTEGER REFERENCES accounts(account_id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS strikes (
    strike_id      INTEGER PRIMARY KEY AUTOINCREMENT,
    account_id     INTEGER NOT NULL REFERENCES accounts(account_id) ON DELETE CASCADE,
    pressed_at_us  INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS chat_messages (
    message_id     INTEGER PRIMARY KEY AUTOINCREMENT,
    account_id     INTEGER NOT NULL REFERENCES accounts(account_id) ON DELETE CASCADE,
    content        TEXT NOT NULL,
    created_at_us  INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS presence (
    account_id     INTEGER PRIMARY KEY REFERENCES accounts(account_id) ON DELETE CASCADE,
    last_seen_us   INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS snowballs_ip_idx        ON snowballs(ip_address);
CREATE INDEX IF NOT EXISTS strikes_account_idx     ON strikes(account_id);
CREATE INDEX IF NOT EXISTS sessions_account_idx    ON sessions(account_id);
CREATE INDEX IF NOT EXISTS presence_last_seen_idx  ON presence(last_seen_us);

PRAGMA user_version = 1;
";
