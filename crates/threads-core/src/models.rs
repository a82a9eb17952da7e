//! # Domain Models
//!
//! These structs represent the core entities of Threads.
//! We use UUID v7 for time-ordered, globally unique identification.
//!
//! Relations are kept as identifier lists rather than nested objects; the
//! `*Summary`, `ThreadNode` and `ThreadCard` types are the populated read
//! models handed to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered account, correlated with the identity provider by `user_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Opaque identifier issued by the external identity provider
    pub user_id: String,
    pub name: String,
    /// Globally unique, always stored lowercased
    pub username: String,
    /// Hosted avatar URL returned by the media service
    pub image: Option<String>,
    pub bio: Option<String>,
    pub onboarded: bool,
    /// Top-level threads authored by this user, oldest first
    pub threads: Vec<Uuid>,
    /// Communities this user belongs to, in join order
    pub communities: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// "`tagged_by` tagged the owning user in `thread_id`"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTag {
    pub thread_id: Uuid,
    pub tagged_by: Uuid,
}

/// A post. With a `parent_id` it is a comment; without one it is a top-level thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub id: Uuid,
    pub content: String,
    pub author_id: Uuid,
    pub community_id: Option<Uuid>,
    pub parent_id: Option<Uuid>,
    /// Direct replies in insertion order
    pub children: Vec<Uuid>,
    /// External user ids, each present at most once
    pub likes: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Thread {
    pub fn is_comment(&self) -> bool {
        self.parent_id.is_some()
    }

    pub fn is_liked_by(&self, user_id: &str) -> bool {
        self.likes.iter().any(|u| u == user_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Community {
    pub id: Uuid,
    /// External identifier (organisation id at the identity provider)
    pub community_id: String,
    pub name: String,
    pub alias: String,
    pub image: Option<String>,
    pub description: Option<String>,
    pub created_by: Uuid,
    pub members: Vec<Uuid>,
    /// Top-level threads posted in this community, oldest first
    pub threads: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

// ── Write models ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewThread {
    pub content: String,
    pub author_id: Uuid,
    pub community_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewComment {
    pub parent_id: Uuid,
    pub content: String,
    pub author_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCommunity {
    pub community_id: String,
    pub name: String,
    pub alias: String,
    pub image: Option<String>,
    pub description: Option<String>,
    /// External id of the creating user
    pub created_by_user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityUpdate {
    pub name: String,
    pub alias: String,
    pub image: Option<String>,
}

/// Profile submission; inserts the user on first call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserUpdate {
    pub user_id: String,
    pub name: String,
    pub username: String,
    pub bio: Option<String>,
    pub image: Option<String>,
}

// ── Read models ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorSummary {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub username: String,
    pub image: Option<String>,
}

impl From<&User> for AuthorSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            user_id: user.user_id.clone(),
            name: user.name.clone(),
            username: user.username.clone(),
            image: user.image.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunitySummary {
    pub id: Uuid,
    pub community_id: String,
    pub name: String,
    pub alias: String,
    pub image: Option<String>,
}

impl From<&Community> for CommunitySummary {
    fn from(community: &Community) -> Self {
        Self {
            id: community.id,
            community_id: community.community_id.clone(),
            name: community.name.clone(),
            alias: community.alias.clone(),
            image: community.image.clone(),
        }
    }
}

/// A thread with its author and a bounded number of populated reply levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadNode {
    pub thread: Thread,
    pub author: AuthorSummary,
    pub community: Option<CommunitySummary>,
    pub children: Vec<ThreadNode>,
}

/// Feed entry: a thread plus who replied to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadCard {
    pub thread: Thread,
    pub author: AuthorSummary,
    pub community: Option<CommunitySummary>,
    /// Author of each direct reply, in reply order
    pub reply_authors: Vec<AuthorSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityDetails {
    pub community: Community,
    pub created_by: AuthorSummary,
    pub members: Vec<AuthorSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityListing {
    pub community: Community,
    pub members: Vec<AuthorSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user: User,
    pub communities: Vec<CommunitySummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedThread {
    pub thread: Thread,
    pub tagged_by: AuthorSummary,
}

/// A reply somebody else left on one of the user's threads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityItem {
    pub comment: Thread,
    pub author: AuthorSummary,
}
