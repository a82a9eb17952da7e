//! `CommunityRepo`: communities, membership and community deletion.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use threads_core::error::{AppError, Result};
use threads_core::models::{
    Community, CommunityDetails, CommunityListing, CommunityUpdate, NewCommunity, ThreadCard,
};
use threads_core::query::{CommunityQuery, Page};
use threads_core::traits::CommunityRepo;
use threads_core::tree::deletion_order;
use uuid::Uuid;

use crate::rows::{
    author_summary, blob_to_uuid, community_from_row, delete_threads, descendant_ids, load_community,
    load_community_by_external, member_summaries, require_community, search_key, thread_cards,
    user_id_by_external, uuid_to_blob,
};
use crate::{commit, db_error, SqliteThreadsRepo};

#[async_trait]
impl CommunityRepo for SqliteThreadsRepo {
    /// The creator becomes the first member.
    async fn create_community(&self, new: NewCommunity) -> Result<Community> {
        let mut tx = self.begin().await?;

        let creator = user_id_by_external(&mut tx, &new.created_by_user_id).await?;
        let id = Uuid::now_v7();
        sqlx::query(
            "INSERT INTO communities
                 (id, community_id, name, name_search, alias, alias_search, image, description, created_by, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(uuid_to_blob(id))
        .bind(new.community_id.as_str())
        .bind(new.name.as_str())
        .bind(search_key(&new.name))
        .bind(new.alias.as_str())
        .bind(search_key(&new.alias))
        .bind(new.image.as_deref())
        .bind(new.description.as_deref())
        .bind(uuid_to_blob(creator))
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(db_error("create community"))?;

        sqlx::query("INSERT INTO community_members (community_id, user_id) VALUES (?, ?)")
            .bind(uuid_to_blob(id))
            .bind(uuid_to_blob(creator))
            .execute(&mut *tx)
            .await
            .map_err(db_error("add community creator"))?;

        let community = load_community(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("community {id} vanished during creation")))?;
        commit(tx).await?;

        log::info!("community {} ({}) created", community.name, community.community_id);
        Ok(community)
    }

    async fn update_community_info(&self, community_id: &str, update: CommunityUpdate) -> Result<Community> {
        let mut tx = self.begin().await?;

        let updated = sqlx::query(
            "UPDATE communities SET name = ?, name_search = ?, alias = ?, alias_search = ?, image = ?
             WHERE community_id = ?",
        )
        .bind(update.name.as_str())
        .bind(search_key(&update.name))
        .bind(update.alias.as_str())
        .bind(search_key(&update.alias))
        .bind(update.image.as_deref())
        .bind(community_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error("update community"))?
        .rows_affected();
        if updated == 0 {
            return Err(AppError::not_found("Community", community_id));
        }

        let community = load_community_by_external(&mut tx, community_id)
            .await?
            .ok_or_else(|| AppError::not_found("Community", community_id))?;
        commit(tx).await?;
        Ok(community)
    }

    /// Deletes the community, every thread posted in it (with their reply
    /// trees) and all memberships, atomically.
    async fn delete_community(&self, community_id: &str) -> Result<Community> {
        let mut tx = self.begin().await?;

        let community = load_community_by_external(&mut tx, community_id)
            .await?
            .ok_or_else(|| AppError::not_found("Community", community_id))?;

        let roots: Vec<Vec<u8>> = sqlx::query_scalar("SELECT id FROM threads WHERE community_id = ? ORDER BY rowid ASC")
            .bind(uuid_to_blob(community.id))
            .fetch_all(&mut *tx)
            .await
            .map_err(db_error("list community threads"))?;

        let mut removed = HashSet::new();
        for blob in roots {
            let root = blob_to_uuid(&blob)?;
            if removed.contains(&root) {
                continue;
            }
            let descendants = descendant_ids(&mut tx, root).await?;
            let order: Vec<Uuid> = deletion_order(root, &descendants)
                .into_iter()
                .filter(|id| removed.insert(*id))
                .collect();
            delete_threads(&mut tx, &order).await?;
        }

        sqlx::query("DELETE FROM community_members WHERE community_id = ?")
            .bind(uuid_to_blob(community.id))
            .execute(&mut *tx)
            .await
            .map_err(db_error("remove community members"))?;
        sqlx::query("DELETE FROM communities WHERE id = ?")
            .bind(uuid_to_blob(community.id))
            .execute(&mut *tx)
            .await
            .map_err(db_error("delete community"))?;

        commit(tx).await?;
        log::info!(
            "community {} deleted with {} threads, {} members released",
            community.community_id,
            removed.len(),
            community.members.len()
        );
        Ok(community)
    }

    async fn add_member_to_community(&self, community_id: &str, user_id: &str) -> Result<Community> {
        let mut tx = self.begin().await?;

        let community = load_community_by_external(&mut tx, community_id)
            .await?
            .ok_or_else(|| AppError::not_found("Community", community_id))?;
        let member = user_id_by_external(&mut tx, user_id).await?;
        if community.members.contains(&member) {
            return Err(AppError::Conflict(format!(
                "user {user_id} is already a member of community {community_id}"
            )));
        }

        sqlx::query("INSERT INTO community_members (community_id, user_id) VALUES (?, ?)")
            .bind(uuid_to_blob(community.id))
            .bind(uuid_to_blob(member))
            .execute(&mut *tx)
            .await
            .map_err(db_error("add community member"))?;

        let community = load_community(&mut tx, community.id)
            .await?
            .ok_or_else(|| AppError::not_found("Community", community_id))?;
        commit(tx).await?;
        Ok(community)
    }

    /// Removing a user who is not a member succeeds without changes.
    async fn remove_user_from_community(&self, user_id: &str, community_id: &str) -> Result<()> {
        let mut tx = self.begin().await?;

        let member = user_id_by_external(&mut tx, user_id).await?;
        let community = load_community_by_external(&mut tx, community_id)
            .await?
            .ok_or_else(|| AppError::not_found("Community", community_id))?;

        sqlx::query("DELETE FROM community_members WHERE community_id = ? AND user_id = ?")
            .bind(uuid_to_blob(community.id))
            .bind(uuid_to_blob(member))
            .execute(&mut *tx)
            .await
            .map_err(db_error("remove community member"))?;

        commit(tx).await
    }

    async fn fetch_communities(&self, query: CommunityQuery) -> Result<Page<CommunityListing>> {
        let mut conn = self.conn().await?;

        let filter = if query.search.is_some() {
            "WHERE name_search LIKE ? ESCAPE '\\' OR alias_search LIKE ? ESCAPE '\\'"
        } else {
            ""
        };
        let pattern = query.search.as_ref().map(|s| s.like_pattern());

        let count_sql = format!("SELECT COUNT(*) FROM communities {filter}");
        let mut count = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some(pattern) = &pattern {
            count = count.bind(pattern.as_str()).bind(pattern.as_str());
        }
        let total = count
            .fetch_one(&mut *conn)
            .await
            .map_err(db_error("count communities"))?;

        let list_sql = format!(
            "SELECT * FROM communities {filter} ORDER BY rowid {} LIMIT ? OFFSET ?",
            query.sort.as_sql()
        );
        let mut list = sqlx::query(&list_sql);
        if let Some(pattern) = &pattern {
            list = list.bind(pattern.as_str()).bind(pattern.as_str());
        }
        let rows = list
            .bind(query.page.limit())
            .bind(query.page.skip())
            .fetch_all(&mut *conn)
            .await
            .map_err(db_error("fetch communities"))?;

        let mut listings = Vec::with_capacity(rows.len());
        for row in &rows {
            let community = community_from_row(&mut conn, row).await?;
            let members = member_summaries(&mut conn, community.id).await?;
            listings.push(CommunityListing { community, members });
        }
        Ok(Page::from_total(listings, total, &query.page))
    }

    async fn fetch_community_details(&self, community_id: &str) -> Result<Option<CommunityDetails>> {
        let mut conn = self.conn().await?;
        let Some(community) = load_community_by_external(&mut conn, community_id).await? else {
            return Ok(None);
        };

        let created_by = author_summary(&mut conn, community.created_by).await?;
        let members = member_summaries(&mut conn, community.id).await?;
        Ok(Some(CommunityDetails { community, created_by, members }))
    }

    /// Top-level threads of the community, newest first.
    async fn fetch_community_posts(&self, id: Uuid) -> Result<Vec<ThreadCard>> {
        let mut conn = self.conn().await?;
        require_community(&mut conn, id).await?;

        let rows = sqlx::query("SELECT * FROM threads WHERE community_id = ? AND parent_id IS NULL ORDER BY rowid DESC")
            .bind(uuid_to_blob(id))
            .fetch_all(&mut *conn)
            .await
            .map_err(db_error("fetch community posts"))?;
        thread_cards(&mut conn, &rows).await
    }
}
