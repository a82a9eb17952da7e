//! `ThreadRepo`: posting, replying, the comment tree and likes.

use async_trait::async_trait;
use threads_core::error::{AppError, Result};
use threads_core::models::{NewComment, NewThread, Thread, ThreadCard, ThreadNode};
use threads_core::query::{Page, PageRequest};
use threads_core::traits::ThreadRepo;
use threads_core::tree::deletion_order;
use uuid::Uuid;

use crate::rows::{
    descendant_ids, delete_threads, insert_thread, leaf_node, load_thread, require_community,
    require_thread, require_user, thread_cards, uuid_to_blob,
};
use crate::{commit, db_error, require_content, SqliteThreadsRepo};

#[async_trait]
impl ThreadRepo for SqliteThreadsRepo {
    /// Posts a top-level thread. Author and community are checked inside the
    /// same transaction as the insert.
    async fn create_thread(&self, new: NewThread) -> Result<Thread> {
        require_content(&new.content)?;
        let mut tx = self.begin().await?;

        require_user(&mut tx, new.author_id).await?;
        if let Some(community_id) = new.community_id {
            require_community(&mut tx, community_id).await?;
        }
        let thread = insert_thread(&mut tx, &new.content, new.author_id, new.community_id, None).await?;

        commit(tx).await?;
        log::info!("thread {} posted by {}", thread.id, thread.author_id);
        Ok(thread)
    }

    async fn repost_thread(&self, thread_id: Uuid, author_id: Uuid) -> Result<Thread> {
        let source = {
            let mut conn = self.conn().await?;
            require_thread(&mut conn, thread_id).await?
        };
        log::debug!("reposting {} for {}", thread_id, author_id);
        self.create_thread(NewThread {
            content: source.content,
            author_id,
            community_id: None,
        })
        .await
    }

    /// Appends a reply to `new.parent_id`; it lands last in the parent's children.
    async fn comment_thread(&self, new: NewComment) -> Result<Thread> {
        require_content(&new.content)?;
        let mut tx = self.begin().await?;

        if load_thread(&mut tx, new.parent_id).await?.is_none() {
            return Err(AppError::not_found("Thread", new.parent_id));
        }
        require_user(&mut tx, new.author_id).await?;
        let comment = insert_thread(&mut tx, &new.content, new.author_id, None, Some(new.parent_id)).await?;

        commit(tx).await?;
        log::info!("comment {} added to {}", comment.id, new.parent_id);
        Ok(comment)
    }

    /// Top-level threads, newest first.
    async fn fetch_threads(&self, page: PageRequest) -> Result<Page<ThreadCard>> {
        let mut conn = self.conn().await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM threads WHERE parent_id IS NULL")
            .fetch_one(&mut *conn)
            .await
            .map_err(db_error("count threads"))?;
        let rows = sqlx::query("SELECT * FROM threads WHERE parent_id IS NULL ORDER BY rowid DESC LIMIT ? OFFSET ?")
            .bind(page.limit())
            .bind(page.skip())
            .fetch_all(&mut *conn)
            .await
            .map_err(db_error("fetch threads"))?;

        let cards = thread_cards(&mut conn, &rows).await?;
        Ok(Page::from_total(cards, total, &page))
    }

    async fn fetch_threads_by_community(&self, community_id: Uuid, page: PageRequest) -> Result<Page<ThreadCard>> {
        let mut conn = self.conn().await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM threads WHERE parent_id IS NULL AND community_id = ?")
                .bind(uuid_to_blob(community_id))
                .fetch_one(&mut *conn)
                .await
                .map_err(db_error("count community threads"))?;
        let rows = sqlx::query(
            "SELECT * FROM threads WHERE parent_id IS NULL AND community_id = ?
             ORDER BY rowid DESC LIMIT ? OFFSET ?",
        )
        .bind(uuid_to_blob(community_id))
        .bind(page.limit())
        .bind(page.skip())
        .fetch_all(&mut *conn)
        .await
        .map_err(db_error("fetch community threads"))?;

        let cards = thread_cards(&mut conn, &rows).await?;
        Ok(Page::from_total(cards, total, &page))
    }

    async fn fetch_thread(&self, id: Uuid) -> Result<Option<Thread>> {
        let mut conn = self.conn().await?;
        load_thread(&mut conn, id).await
    }

    /// Populates two reply levels; deeper replies stay as ids in
    /// `thread.children` of the second level.
    async fn fetch_thread_by_id(&self, id: Uuid) -> Result<Option<ThreadNode>> {
        let mut conn = self.conn().await?;
        let Some(thread) = load_thread(&mut conn, id).await? else {
            return Ok(None);
        };

        let mut children = Vec::with_capacity(thread.children.len());
        for child_id in &thread.children {
            let child = require_thread(&mut conn, *child_id).await?;
            let mut grandchildren = Vec::with_capacity(child.children.len());
            for grandchild_id in &child.children {
                let grandchild = require_thread(&mut conn, *grandchild_id).await?;
                grandchildren.push(leaf_node(&mut conn, grandchild).await?);
            }
            let mut node = leaf_node(&mut conn, child).await?;
            node.children = grandchildren;
            children.push(node);
        }

        let mut root = leaf_node(&mut conn, thread).await?;
        root.children = children;
        Ok(Some(root))
    }

    async fn fetch_all_comments(&self, id: Uuid) -> Result<Vec<Thread>> {
        let mut conn = self.conn().await?;
        if load_thread(&mut conn, id).await?.is_none() {
            return Err(AppError::not_found("Thread", id));
        }

        let ids = descendant_ids(&mut conn, id).await?;
        let mut comments = Vec::with_capacity(ids.len());
        for comment_id in ids {
            comments.push(require_thread(&mut conn, comment_id).await?);
        }
        Ok(comments)
    }

    /// Removes the thread and its whole reply tree in one transaction. Author
    /// and community thread lists are derived from the rows, so nothing else
    /// can keep pointing at a removed id.
    async fn delete_thread(&self, id: Uuid) -> Result<Vec<Uuid>> {
        let mut tx = self.begin().await?;

        if load_thread(&mut tx, id).await?.is_none() {
            return Err(AppError::not_found("Thread", id));
        }
        let descendants = descendant_ids(&mut tx, id).await?;
        delete_threads(&mut tx, &deletion_order(id, &descendants)).await?;

        commit(tx).await?;
        log::info!("thread {} deleted with {} replies", id, descendants.len());

        let mut removed = Vec::with_capacity(descendants.len() + 1);
        removed.push(id);
        removed.extend(descendants);
        Ok(removed)
    }

    async fn toggle_like_thread(&self, thread_id: Uuid, user_id: &str) -> Result<Thread> {
        let mut tx = self.begin().await?;

        if load_thread(&mut tx, thread_id).await?.is_none() {
            return Err(AppError::not_found("Thread", thread_id));
        }
        let removed = sqlx::query("DELETE FROM thread_likes WHERE thread_id = ? AND user_id = ?")
            .bind(uuid_to_blob(thread_id))
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("unlike thread"))?
            .rows_affected();
        if removed == 0 {
            sqlx::query("INSERT INTO thread_likes (thread_id, user_id) VALUES (?, ?)")
                .bind(uuid_to_blob(thread_id))
                .bind(user_id)
                .execute(&mut *tx)
                .await
                .map_err(db_error("like thread"))?;
        }
        let thread = require_thread(&mut tx, thread_id).await?;

        commit(tx).await?;
        log::debug!("thread {} like toggled by {} (liked: {})", thread_id, user_id, removed == 0);
        Ok(thread)
    }
}
