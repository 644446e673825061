//! SQL schema for the rivalry SQLite store.
//!
//! Executed in full on every `open`; each statement is idempotent. The
//! `user_version` it sets is recorded but nothing reads it yet.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id       TEXT PRIMARY KEY,
    name          TEXT NOT NULL,
    email         TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    icon          TEXT NOT NULL,
    rival_code    TEXT NOT NULL,   -- at most two rows share a code
    created_at    TEXT NOT NULL
);

-- Lectures, practice sets and school lessons share one table.
CREATE TABLE IF NOT EXISTS items (
    item_id    TEXT PRIMARY KEY,
    kind       TEXT NOT NULL,      -- 'lecture' | 'practice_set' | 'school_lesson'
    subject    TEXT NOT NULL,
    item_group TEXT NOT NULL,      -- chapter, or month range for lessons
    number     TEXT NOT NULL,
    name       TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- A row means the item is done; toggling off deletes the row.
CREATE TABLE IF NOT EXISTS completions (
    item_id      TEXT NOT NULL REFERENCES items(item_id) ON DELETE CASCADE,
    user_id      TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    completed_at TEXT NOT NULL,
    PRIMARY KEY (item_id, user_id)
);

CREATE TABLE IF NOT EXISTS streaks (
    user_id            TEXT PRIMARY KEY REFERENCES users(user_id) ON DELETE CASCADE,
    current_streak     INTEGER NOT NULL DEFAULT 0,
    longest_streak     INTEGER NOT NULL DEFAULT 0,
    last_activity_date TEXT,             -- YYYY-MM-DD in the reference timezone
    updated_at         TEXT NOT NULL
);

-- Write-once unlock records.
CREATE TABLE IF NOT EXISTS user_achievements (
    user_id          TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    achievement_name TEXT NOT NULL,
    unlocked_at      TEXT NOT NULL,
    PRIMARY KEY (user_id, achievement_name)
);

CREATE TABLE IF NOT EXISTS chat_messages (
    message_id TEXT PRIMARY KEY,
    user_id    TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    rival_code TEXT NOT NULL,
    body       TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS users_rival_code_idx    ON users(rival_code);
CREATE INDEX IF NOT EXISTS items_kind_idx          ON items(kind);
CREATE INDEX IF NOT EXISTS completions_user_idx    ON completions(user_id);
CREATE INDEX IF NOT EXISTS chat_messages_code_idx  ON chat_messages(rival_code, created_at);

PRAGMA user_version = 1;
";
