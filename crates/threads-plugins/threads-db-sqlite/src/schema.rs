//! Table layout. Ordered lists (a user's threads, a thread's replies, a
//! community's members) are derived from foreign keys and read back in
//! `rowid` order, which is insertion order.
//!
//! The `*_search` columns hold the Unicode-lowercased form of the column they
//! shadow. SQLite's `LOWER` and `LIKE` only fold ASCII, so searches match
//! against these instead.

use sqlx::sqlite::SqlitePool;

const STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id          BLOB PRIMARY KEY NOT NULL,
        user_id     TEXT NOT NULL UNIQUE,
        name        TEXT NOT NULL,
        name_search TEXT NOT NULL,
        username    TEXT NOT NULL UNIQUE,
        image       TEXT,
        bio         TEXT,
        onboarded   BOOLEAN NOT NULL DEFAULT 0,
        created_at  TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS communities (
        id           BLOB PRIMARY KEY NOT NULL,
        community_id TEXT NOT NULL UNIQUE,
        name         TEXT NOT NULL UNIQUE,
        name_search  TEXT NOT NULL,
        alias        TEXT NOT NULL UNIQUE,
        alias_search TEXT NOT NULL,
        image        TEXT,
        description  TEXT,
        created_by   BLOB NOT NULL REFERENCES users(id),
        created_at   TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS threads (
        id           BLOB PRIMARY KEY NOT NULL,
        content      TEXT NOT NULL,
        author_id    BLOB NOT NULL REFERENCES users(id),
        community_id BLOB REFERENCES communities(id),
        parent_id    BLOB REFERENCES threads(id),
        created_at   TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_threads_parent ON threads(parent_id)",
    "CREATE INDEX IF NOT EXISTS idx_threads_author ON threads(author_id)",
    "CREATE INDEX IF NOT EXISTS idx_threads_community ON threads(community_id)",
    "CREATE TABLE IF NOT EXISTS thread_likes (
        thread_id BLOB NOT NULL REFERENCES threads(id) ON DELETE CASCADE,
        user_id   TEXT NOT NULL,
        PRIMARY KEY (thread_id, user_id)
    )",
    "CREATE TABLE IF NOT EXISTS community_members (
        community_id BLOB NOT NULL REFERENCES communities(id) ON DELETE CASCADE,
        user_id      BLOB NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        PRIMARY KEY (community_id, user_id)
    )",
    "CREATE INDEX IF NOT EXISTS idx_members_user ON community_members(user_id)",
    "CREATE TABLE IF NOT EXISTS user_tags (
        user_id   BLOB NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        thread_id BLOB NOT NULL REFERENCES threads(id) ON DELETE CASCADE,
        tagged_by BLOB NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        PRIMARY KEY (user_id, thread_id, tagged_by)
    )",
];

/// Idempotent; run once when the pool is opened.
pub(crate) async fn apply(pool: &SqlitePool) -> anyhow::Result<()> {
    for statement in STATEMENTS {
        sqlx::query(*statement).execute(pool).await?;
    }
    Ok(())
}
