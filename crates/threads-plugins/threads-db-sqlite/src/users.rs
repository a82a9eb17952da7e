//! `UserRepo`: profiles, search, tags and the activity feed.

use async_trait::async_trait;
use chrono::Utc;
use threads_core::error::{AppError, Result};
use threads_core::models::{
    ActivityItem, CommunitySummary, TaggedThread, ThreadCard, User, UserProfile, UserUpdate,
};
use threads_core::query::{Page, UserQuery};
use threads_core::traits::UserRepo;
use uuid::Uuid;

use crate::rows::{
    author_summary, blob_to_uuid, community_summary_from_row, load_user, load_user_by_external,
    require_thread, require_user, search_key, thread_cards, thread_from_row, user_from_row, uuid_to_blob,
};
use crate::{commit, db_error, SqliteThreadsRepo};

#[async_trait]
impl UserRepo for SqliteThreadsRepo {
    /// Everyone but the caller, optionally filtered on username or name.
    async fn fetch_all_users(&self, query: UserQuery) -> Result<Page<User>> {
        let mut conn = self.conn().await?;

        let filter = if query.search.is_some() {
            "WHERE user_id != ? AND (username LIKE ? ESCAPE '\\' OR name_search LIKE ? ESCAPE '\\')"
        } else {
            "WHERE user_id != ?"
        };
        let pattern = query.search.as_ref().map(|s| s.like_pattern());

        let count_sql = format!("SELECT COUNT(*) FROM users {filter}");
        let mut count = sqlx::query_scalar::<_, i64>(&count_sql).bind(query.exclude_user_id.as_str());
        if let Some(pattern) = &pattern {
            count = count.bind(pattern.as_str()).bind(pattern.as_str());
        }
        let total = count
            .fetch_one(&mut *conn)
            .await
            .map_err(db_error("count users"))?;

        let list_sql = format!(
            "SELECT * FROM users {filter} ORDER BY rowid {} LIMIT ? OFFSET ?",
            query.sort.as_sql()
        );
        let mut list = sqlx::query(&list_sql).bind(query.exclude_user_id.as_str());
        if let Some(pattern) = &pattern {
            list = list.bind(pattern.as_str()).bind(pattern.as_str());
        }
        let rows = list
            .bind(query.page.limit())
            .bind(query.page.skip())
            .fetch_all(&mut *conn)
            .await
            .map_err(db_error("fetch users"))?;

        let mut users = Vec::with_capacity(rows.len());
        for row in &rows {
            users.push(user_from_row(&mut conn, row).await?);
        }
        Ok(Page::from_total(users, total, &query.page))
    }

    async fn fetch_user_data(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let mut conn = self.conn().await?;
        let Some(user) = load_user_by_external(&mut conn, user_id).await? else {
            return Ok(None);
        };
        let communities = member_communities(&mut conn, user.id).await?;
        Ok(Some(UserProfile { user, communities }))
    }

    async fn fetch_user_data_by_db_id(&self, id: Uuid) -> Result<Option<User>> {
        let mut conn = self.conn().await?;
        load_user(&mut conn, id).await
    }

    /// Inserts on first submission, updates afterwards. The username is stored
    /// lowercased and a clash with another account is a `Conflict`.
    async fn update_user(&self, update: UserUpdate) -> Result<User> {
        let username = search_key(&update.username);
        if username.is_empty() {
            return Err(AppError::ValidationError("username is required".into()));
        }
        let mut tx = self.begin().await?;

        let existing: Option<Vec<u8>> = sqlx::query_scalar("SELECT id FROM users WHERE user_id = ?")
            .bind(update.user_id.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error("find user"))?;

        let id = match existing {
            Some(blob) => {
                let id = blob_to_uuid(&blob)?;
                sqlx::query(
                    "UPDATE users SET name = ?, name_search = ?, username = ?, bio = ?, image = ?, onboarded = 1
                     WHERE id = ?",
                )
                .bind(update.name.as_str())
                .bind(search_key(&update.name))
                .bind(username.as_str())
                .bind(update.bio.as_deref())
                .bind(update.image.as_deref())
                .bind(uuid_to_blob(id))
                .execute(&mut *tx)
                .await
                .map_err(db_error("update user"))?;
                id
            }
            None => {
                let id = Uuid::now_v7();
                sqlx::query(
                    "INSERT INTO users (id, user_id, name, name_search, username, image, bio, onboarded, created_at)
                     VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?)",
                )
                .bind(uuid_to_blob(id))
                .bind(update.user_id.as_str())
                .bind(update.name.as_str())
                .bind(search_key(&update.name))
                .bind(username.as_str())
                .bind(update.image.as_deref())
                .bind(update.bio.as_deref())
                .bind(Utc::now())
                .execute(&mut *tx)
                .await
                .map_err(db_error("create user"))?;
                log::info!("user {} registered as @{}", update.user_id, username);
                id
            }
        };

        let user = load_user(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("user {id} vanished during update")))?;
        commit(tx).await?;
        Ok(user)
    }

    /// Records that `tagged_by` tagged each of `tagged_users` in `thread_id`.
    /// Repeated tags are ignored.
    async fn update_user_tags(&self, thread_id: Uuid, tagged_by: Uuid, tagged_users: Vec<Uuid>) -> Result<()> {
        let mut tx = self.begin().await?;

        require_thread(&mut tx, thread_id).await?;
        require_user(&mut tx, tagged_by).await?;
        for tagged in &tagged_users {
            require_user(&mut tx, *tagged).await?;
            sqlx::query("INSERT OR IGNORE INTO user_tags (user_id, thread_id, tagged_by) VALUES (?, ?, ?)")
                .bind(uuid_to_blob(*tagged))
                .bind(uuid_to_blob(thread_id))
                .bind(uuid_to_blob(tagged_by))
                .execute(&mut *tx)
                .await
                .map_err(db_error("tag user"))?;
        }

        commit(tx).await?;
        log::debug!("{} tagged {} users in {}", tagged_by, tagged_users.len(), thread_id);
        Ok(())
    }

    /// Newest tag first.
    async fn fetch_user_tags(&self, id: Uuid) -> Result<Vec<TaggedThread>> {
        let mut conn = self.conn().await?;
        require_user(&mut conn, id).await?;

        let rows = sqlx::query("SELECT thread_id, tagged_by FROM user_tags WHERE user_id = ? ORDER BY rowid DESC")
            .bind(uuid_to_blob(id))
            .fetch_all(&mut *conn)
            .await
            .map_err(db_error("fetch user tags"))?;

        let mut tags = Vec::with_capacity(rows.len());
        for row in &rows {
            let thread_blob: Vec<u8> = sqlx::Row::try_get(row, "thread_id").map_err(db_error("decode row"))?;
            let tagger_blob: Vec<u8> = sqlx::Row::try_get(row, "tagged_by").map_err(db_error("decode row"))?;
            let thread = require_thread(&mut conn, blob_to_uuid(&thread_blob)?).await?;
            let tagged_by = author_summary(&mut conn, blob_to_uuid(&tagger_blob)?).await?;
            tags.push(TaggedThread { thread, tagged_by });
        }
        Ok(tags)
    }

    /// The user's top-level threads, newest first.
    async fn fetch_profile_threads(&self, id: Uuid) -> Result<Vec<ThreadCard>> {
        let mut conn = self.conn().await?;
        require_user(&mut conn, id).await?;

        let rows = sqlx::query("SELECT * FROM threads WHERE author_id = ? AND parent_id IS NULL ORDER BY rowid DESC")
            .bind(uuid_to_blob(id))
            .fetch_all(&mut *conn)
            .await
            .map_err(db_error("fetch profile threads"))?;
        thread_cards(&mut conn, &rows).await
    }

    async fn fetch_user_communities(&self, id: Uuid) -> Result<Vec<CommunitySummary>> {
        let mut conn = self.conn().await?;
        require_user(&mut conn, id).await?;
        member_communities(&mut conn, id).await
    }

    /// Direct replies on the user's threads written by somebody else.
    async fn get_user_activity(&self, id: Uuid) -> Result<Vec<ActivityItem>> {
        let mut conn = self.conn().await?;
        require_user(&mut conn, id).await?;

        let rows = sqlx::query(
            "SELECT c.* FROM threads c JOIN threads p ON c.parent_id = p.id
             WHERE p.author_id = ? AND c.author_id != ?
             ORDER BY c.rowid DESC",
        )
        .bind(uuid_to_blob(id))
        .bind(uuid_to_blob(id))
        .fetch_all(&mut *conn)
        .await
        .map_err(db_error("fetch user activity"))?;

        let mut activity = Vec::with_capacity(rows.len());
        for row in &rows {
            let comment = thread_from_row(&mut conn, row).await?;
            let author = author_summary(&mut conn, comment.author_id).await?;
            activity.push(ActivityItem { comment, author });
        }
        Ok(activity)
    }
}

async fn member_communities(conn: &mut sqlx::sqlite::SqliteConnection, user: Uuid) -> Result<Vec<CommunitySummary>> {
    let rows = sqlx::query(
        "SELECT c.id, c.community_id, c.name, c.alias, c.image
         FROM community_members m JOIN communities c ON c.id = m.community_id
         WHERE m.user_id = ? ORDER BY m.rowid ASC",
    )
    .bind(uuid_to_blob(user))
    .fetch_all(&mut *conn)
    .await
    .map_err(db_error("load user communities"))?;
    rows.iter().map(community_summary_from_row).collect()
}
