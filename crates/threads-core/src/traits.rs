//! # Core Traits (Ports)
//!
//! Any persistence plugin must implement these traits to be used by the binary.
//! Multi-record mutations are expected to be atomic: a failure leaves no
//! half-linked thread, membership or tag behind.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    ActivityItem, Community, CommunityDetails, CommunityListing, CommunitySummary,
    CommunityUpdate, NewComment, NewCommunity, NewThread, TaggedThread, Thread, ThreadCard,
    ThreadNode, User, UserProfile, UserUpdate,
};
use crate::query::{CommunityQuery, Page, PageRequest, UserQuery};

/// Thread tree persistence: posting, replying, reading and cascading deletes.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ThreadRepo: Send + Sync {
    async fn create_thread(&self, new: NewThread) -> Result<Thread>;
    /// Posts a copy of `thread_id`'s content as a new top-level thread by `author_id`.
    async fn repost_thread(&self, thread_id: Uuid, author_id: Uuid) -> Result<Thread>;
    async fn comment_thread(&self, new: NewComment) -> Result<Thread>;

    async fn fetch_threads(&self, page: PageRequest) -> Result<Page<ThreadCard>>;
    async fn fetch_threads_by_community(&self, community_id: Uuid, page: PageRequest) -> Result<Page<ThreadCard>>;
    /// The bare thread record; replies stay as ids.
    async fn fetch_thread(&self, id: Uuid) -> Result<Option<Thread>>;
    /// The thread with its children and grandchildren populated.
    async fn fetch_thread_by_id(&self, id: Uuid) -> Result<Option<ThreadNode>>;
    /// Every descendant at any depth, parents before their replies.
    async fn fetch_all_comments(&self, id: Uuid) -> Result<Vec<Thread>>;

    /// Removes the thread and all its descendants; returns the removed ids.
    async fn delete_thread(&self, id: Uuid) -> Result<Vec<Uuid>>;
    async fn toggle_like_thread(&self, thread_id: Uuid, user_id: &str) -> Result<Thread>;
}

/// Community persistence. Communities are addressed by their external id
/// except where a method takes a `Uuid`.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CommunityRepo: Send + Sync {
    async fn create_community(&self, new: NewCommunity) -> Result<Community>;
    async fn update_community_info(&self, community_id: &str, update: CommunityUpdate) -> Result<Community>;
    async fn delete_community(&self, community_id: &str) -> Result<Community>;

    async fn add_member_to_community(&self, community_id: &str, user_id: &str) -> Result<Community>;
    async fn remove_user_from_community(&self, user_id: &str, community_id: &str) -> Result<()>;

    async fn fetch_communities(&self, query: CommunityQuery) -> Result<Page<CommunityListing>>;
    async fn fetch_community_details(&self, community_id: &str) -> Result<Option<CommunityDetails>>;
    async fn fetch_community_posts(&self, id: Uuid) -> Result<Vec<ThreadCard>>;
}

/// User persistence. `user_id: &str` is the external id, `Uuid` the internal one.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn fetch_all_users(&self, query: UserQuery) -> Result<Page<User>>;
    async fn fetch_user_data(&self, user_id: &str) -> Result<Option<UserProfile>>;
    async fn fetch_user_data_by_db_id(&self, id: Uuid) -> Result<Option<User>>;
    /// Upserts the profile and marks the user onboarded.
    async fn update_user(&self, update: UserUpdate) -> Result<User>;

    async fn update_user_tags(&self, thread_id: Uuid, tagged_by: Uuid, tagged_users: Vec<Uuid>) -> Result<()>;
    async fn fetch_user_tags(&self, id: Uuid) -> Result<Vec<TaggedThread>>;
    async fn fetch_profile_threads(&self, id: Uuid) -> Result<Vec<ThreadCard>>;
    async fn fetch_user_communities(&self, id: Uuid) -> Result<Vec<CommunitySummary>>;
    /// Replies by other users to threads authored by `id`, newest first.
    async fn get_user_activity(&self, id: Uuid) -> Result<Vec<ActivityItem>>;
}
