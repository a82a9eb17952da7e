//! Data mapping between the SQLite relational model and the `threads-core`
//! domain models, plus the lookups every repo method shares.
//!
//! All helpers take a bare `&mut SqliteConnection` so they run unchanged on a
//! pooled connection or inside a transaction.

use chrono::Utc;
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;
use threads_core::error::{AppError, Result};
use threads_core::models::{
    AuthorSummary, Community, CommunitySummary, Thread, ThreadCard, ThreadNode, User,
};
use threads_core::tree::DescendantWalk;
use uuid::Uuid;

use crate::db_error;

/// Value stored in a `*_search` column and compared against a `SearchTerm`.
pub(crate) fn search_key(text: &str) -> String {
    text.trim().to_lowercase()
}

// Helpers for UUID conversion
pub(crate) fn uuid_to_blob(id: Uuid) -> Vec<u8> {
    id.as_bytes().to_vec()
}

pub(crate) fn blob_to_uuid(blob: &[u8]) -> Result<Uuid> {
    Uuid::from_slice(blob).map_err(|e| AppError::Internal(format!("malformed id column: {e}")))
}

fn uuid_col(row: &SqliteRow, column: &str) -> Result<Uuid> {
    let blob: Vec<u8> = row.try_get(column).map_err(db_error("decode row"))?;
    blob_to_uuid(&blob)
}

fn opt_uuid_col(row: &SqliteRow, column: &str) -> Result<Option<Uuid>> {
    let blob: Option<Vec<u8>> = row.try_get(column).map_err(db_error("decode row"))?;
    blob.map(|b| blob_to_uuid(&b)).transpose()
}

fn col<'r, T>(row: &'r SqliteRow, column: &str) -> Result<T>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(column).map_err(db_error("decode row"))
}

async fn id_list(conn: &mut SqliteConnection, sql: &str, key: Vec<u8>) -> Result<Vec<Uuid>> {
    let rows = sqlx::query(sql)
        .bind(key)
        .fetch_all(&mut *conn)
        .await
        .map_err(db_error("load id list"))?;
    rows.iter().map(|row| uuid_col(row, "id")).collect()
}

// ── Threads ───────────────────────────────────────────────────────────────────

/// Replies to `id` in insertion order.
pub(crate) async fn child_ids(conn: &mut SqliteConnection, id: Uuid) -> Result<Vec<Uuid>> {
    id_list(
        conn,
        "SELECT id FROM threads WHERE parent_id = ? ORDER BY rowid ASC",
        uuid_to_blob(id),
    )
    .await
}

/// Maps a `threads` row and fills in its replies and likes.
pub(crate) async fn thread_from_row(conn: &mut SqliteConnection, row: &SqliteRow) -> Result<Thread> {
    let id = uuid_col(row, "id")?;
    let children = child_ids(conn, id).await?;
    let likes: Vec<String> =
        sqlx::query_scalar("SELECT user_id FROM thread_likes WHERE thread_id = ? ORDER BY rowid ASC")
            .bind(uuid_to_blob(id))
            .fetch_all(&mut *conn)
            .await
            .map_err(db_error("load likes"))?;

    Ok(Thread {
        id,
        content: col(row, "content")?,
        author_id: uuid_col(row, "author_id")?,
        community_id: opt_uuid_col(row, "community_id")?,
        parent_id: opt_uuid_col(row, "parent_id")?,
        children,
        likes,
        created_at: col(row, "created_at")?,
    })
}

pub(crate) async fn threads_from_rows(conn: &mut SqliteConnection, rows: &[SqliteRow]) -> Result<Vec<Thread>> {
    let mut threads = Vec::with_capacity(rows.len());
    for row in rows {
        threads.push(thread_from_row(conn, row).await?);
    }
    Ok(threads)
}

pub(crate) async fn load_thread(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<Thread>> {
    let row = sqlx::query("SELECT * FROM threads WHERE id = ?")
        .bind(uuid_to_blob(id))
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_error("load thread"))?;
    match row {
        Some(row) => Ok(Some(thread_from_row(conn, &row).await?)),
        None => Ok(None),
    }
}

pub(crate) async fn require_thread(conn: &mut SqliteConnection, id: Uuid) -> Result<Thread> {
    load_thread(conn, id)
        .await?
        .ok_or_else(|| AppError::not_found("Thread", id))
}

/// Inserts a thread row. Callers check that the referenced rows exist.
pub(crate) async fn insert_thread(
    conn: &mut SqliteConnection,
    content: &str,
    author_id: Uuid,
    community_id: Option<Uuid>,
    parent_id: Option<Uuid>,
) -> Result<Thread> {
    let thread = Thread {
        id: Uuid::now_v7(),
        content: content.to_string(),
        author_id,
        community_id,
        parent_id,
        children: Vec::new(),
        likes: Vec::new(),
        created_at: Utc::now(),
    };

    sqlx::query("INSERT INTO threads (id, content, author_id, community_id, parent_id, created_at) VALUES (?, ?, ?, ?, ?, ?)")
        .bind(uuid_to_blob(thread.id))
        .bind(thread.content.as_str())
        .bind(uuid_to_blob(thread.author_id))
        .bind(thread.community_id.map(uuid_to_blob))
        .bind(thread.parent_id.map(uuid_to_blob))
        .bind(thread.created_at)
        .execute(&mut *conn)
        .await
        .map_err(db_error("insert thread"))?;

    Ok(thread)
}

/// All descendants of `root`, parents before replies.
pub(crate) async fn descendant_ids(conn: &mut SqliteConnection, root: Uuid) -> Result<Vec<Uuid>> {
    let mut walk = DescendantWalk::new(root);
    while let Some(id) = walk.next_pending() {
        let children = child_ids(conn, id).await?;
        walk.expand(id, children)?;
    }
    Ok(walk.into_descendants())
}

/// Deletes threads one by one in the given order. Likes and tags go with them
/// through `ON DELETE CASCADE`.
pub(crate) async fn delete_threads(conn: &mut SqliteConnection, ordered: &[Uuid]) -> Result<()> {
    for id in ordered {
        sqlx::query("DELETE FROM threads WHERE id = ?")
            .bind(uuid_to_blob(*id))
            .execute(&mut *conn)
            .await
            .map_err(db_error("delete thread"))?;
    }
    Ok(())
}

// ── Users ─────────────────────────────────────────────────────────────────────

pub(crate) async fn user_from_row(conn: &mut SqliteConnection, row: &SqliteRow) -> Result<User> {
    let id = uuid_col(row, "id")?;
    let threads = id_list(
        conn,
        "SELECT id FROM threads WHERE author_id = ? AND parent_id IS NULL ORDER BY rowid ASC",
        uuid_to_blob(id),
    )
    .await?;
    let communities = id_list(
        conn,
        "SELECT community_id AS id FROM community_members WHERE user_id = ? ORDER BY rowid ASC",
        uuid_to_blob(id),
    )
    .await?;

    Ok(User {
        id,
        user_id: col(row, "user_id")?,
        name: col(row, "name")?,
        username: col(row, "username")?,
        image: col(row, "image")?,
        bio: col(row, "bio")?,
        onboarded: col(row, "onboarded")?,
        threads,
        communities,
        created_at: col(row, "created_at")?,
    })
}

pub(crate) fn author_from_row(row: &SqliteRow) -> Result<AuthorSummary> {
    Ok(AuthorSummary {
        id: uuid_col(row, "id")?,
        user_id: col(row, "user_id")?,
        name: col(row, "name")?,
        username: col(row, "username")?,
        image: col(row, "image")?,
    })
}

pub(crate) async fn load_user(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<User>> {
    let row = sqlx::query("SELECT * FROM users WHERE id = ?")
        .bind(uuid_to_blob(id))
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_error("load user"))?;
    match row {
        Some(row) => Ok(Some(user_from_row(conn, &row).await?)),
        None => Ok(None),
    }
}

pub(crate) async fn load_user_by_external(conn: &mut SqliteConnection, user_id: &str) -> Result<Option<User>> {
    let row = sqlx::query("SELECT * FROM users WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_error("load user"))?;
    match row {
        Some(row) => Ok(Some(user_from_row(conn, &row).await?)),
        None => Ok(None),
    }
}

/// Internal id of the user with external id `user_id`.
pub(crate) async fn user_id_by_external(conn: &mut SqliteConnection, user_id: &str) -> Result<Uuid> {
    let blob: Option<Vec<u8>> = sqlx::query_scalar("SELECT id FROM users WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_error("find user"))?;
    match blob {
        Some(blob) => blob_to_uuid(&blob),
        None => Err(AppError::not_found("User", user_id)),
    }
}

pub(crate) async fn require_user(conn: &mut SqliteConnection, id: Uuid) -> Result<()> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM users WHERE id = ?")
        .bind(uuid_to_blob(id))
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_error("find user"))?;
    found.map(|_| ()).ok_or_else(|| AppError::not_found("User", id))
}

pub(crate) async fn author_summary(conn: &mut SqliteConnection, id: Uuid) -> Result<AuthorSummary> {
    let row = sqlx::query("SELECT id, user_id, name, username, image FROM users WHERE id = ?")
        .bind(uuid_to_blob(id))
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_error("load author"))?
        .ok_or_else(|| AppError::Internal(format!("dangling author reference {id}")))?;
    author_from_row(&row)
}

// ── Communities ───────────────────────────────────────────────────────────────

pub(crate) async fn community_from_row(conn: &mut SqliteConnection, row: &SqliteRow) -> Result<Community> {
    let id = uuid_col(row, "id")?;
    let members = id_list(
        conn,
        "SELECT user_id AS id FROM community_members WHERE community_id = ? ORDER BY rowid ASC",
        uuid_to_blob(id),
    )
    .await?;
    let threads = id_list(
        conn,
        "SELECT id FROM threads WHERE community_id = ? AND parent_id IS NULL ORDER BY rowid ASC",
        uuid_to_blob(id),
    )
    .await?;

    Ok(Community {
        id,
        community_id: col(row, "community_id")?,
        name: col(row, "name")?,
        alias: col(row, "alias")?,
        image: col(row, "image")?,
        description: col(row, "description")?,
        created_by: uuid_col(row, "created_by")?,
        members,
        threads,
        created_at: col(row, "created_at")?,
    })
}

pub(crate) fn community_summary_from_row(row: &SqliteRow) -> Result<CommunitySummary> {
    Ok(CommunitySummary {
        id: uuid_col(row, "id")?,
        community_id: col(row, "community_id")?,
        name: col(row, "name")?,
        alias: col(row, "alias")?,
        image: col(row, "image")?,
    })
}

pub(crate) async fn load_community(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<Community>> {
    let row = sqlx::query("SELECT * FROM communities WHERE id = ?")
        .bind(uuid_to_blob(id))
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_error("load community"))?;
    match row {
        Some(row) => Ok(Some(community_from_row(conn, &row).await?)),
        None => Ok(None),
    }
}

pub(crate) async fn load_community_by_external(
    conn: &mut SqliteConnection,
    community_id: &str,
) -> Result<Option<Community>> {
    let row = sqlx::query("SELECT * FROM communities WHERE community_id = ?")
        .bind(community_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_error("load community"))?;
    match row {
        Some(row) => Ok(Some(community_from_row(conn, &row).await?)),
        None => Ok(None),
    }
}

pub(crate) async fn require_community(conn: &mut SqliteConnection, id: Uuid) -> Result<()> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM communities WHERE id = ?")
        .bind(uuid_to_blob(id))
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_error("find community"))?;
    found.map(|_| ()).ok_or_else(|| AppError::not_found("Community", id))
}

async fn community_summary(conn: &mut SqliteConnection, id: Uuid) -> Result<CommunitySummary> {
    let row = sqlx::query("SELECT id, community_id, name, alias, image FROM communities WHERE id = ?")
        .bind(uuid_to_blob(id))
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_error("load community"))?
        .ok_or_else(|| AppError::Internal(format!("dangling community reference {id}")))?;
    community_summary_from_row(&row)
}

/// Members of a community as author summaries, in join order.
pub(crate) async fn member_summaries(conn: &mut SqliteConnection, community: Uuid) -> Result<Vec<AuthorSummary>> {
    let rows = sqlx::query(
        "SELECT u.id, u.user_id, u.name, u.username, u.image
         FROM community_members m JOIN users u ON u.id = m.user_id
         WHERE m.community_id = ? ORDER BY m.rowid ASC",
    )
    .bind(uuid_to_blob(community))
    .fetch_all(&mut *conn)
    .await
    .map_err(db_error("load members"))?;
    rows.iter().map(author_from_row).collect()
}

// ── Populated views ───────────────────────────────────────────────────────────

pub(crate) async fn thread_card(conn: &mut SqliteConnection, thread: Thread) -> Result<ThreadCard> {
    let author = author_summary(conn, thread.author_id).await?;
    let community = match thread.community_id {
        Some(id) => Some(community_summary(conn, id).await?),
        None => None,
    };
    let rows = sqlx::query(
        "SELECT u.id, u.user_id, u.name, u.username, u.image
         FROM threads t JOIN users u ON u.id = t.author_id
         WHERE t.parent_id = ? ORDER BY t.rowid ASC",
    )
    .bind(uuid_to_blob(thread.id))
    .fetch_all(&mut *conn)
    .await
    .map_err(db_error("load reply authors"))?;
    let reply_authors = rows.iter().map(author_from_row).collect::<Result<Vec<_>>>()?;

    Ok(ThreadCard { thread, author, community, reply_authors })
}

pub(crate) async fn thread_cards(conn: &mut SqliteConnection, rows: &[SqliteRow]) -> Result<Vec<ThreadCard>> {
    let threads = threads_from_rows(conn, rows).await?;
    let mut cards = Vec::with_capacity(threads.len());
    for thread in threads {
        cards.push(thread_card(conn, thread).await?);
    }
    Ok(cards)
}

/// A node with author and community but no populated replies.
pub(crate) async fn leaf_node(conn: &mut SqliteConnection, thread: Thread) -> Result<ThreadNode> {
    let author = author_summary(conn, thread.author_id).await?;
    let community = match thread.community_id {
        Some(id) => Some(community_summary(conn, id).await?),
        None => None,
    };
    Ok(ThreadNode { thread, author, community, children: Vec::new() })
}
