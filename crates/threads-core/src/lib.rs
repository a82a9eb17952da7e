//! threads/crates/threads-core/src/lib.rs
//!
//! The central domain logic and interface definitions for Threads.

pub mod error;
pub mod models;
pub mod query;
pub mod traits;
pub mod tree;
pub mod validation;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use query::*;
pub use traits::*;

#[cfg(test)]
mod tests {
    use super::models::*;
    use uuid::Uuid;

    #[test]
    fn test_thread_creation_v7() {
        let id = Uuid::now_v7();
        let thread = Thread {
            id,
            content: "Hello Rust!".to_string(),
            author_id: Uuid::now_v7(),
            community_id: None,
            parent_id: None,
            children: vec![],
            likes: vec!["user_1".to_string()],
            created_at: chrono::Utc::now(),
        };
        assert_eq!(thread.id, id);
        assert!(!thread.is_comment());
        assert!(thread.is_liked_by("user_1"));
        assert!(!thread.is_liked_by("user_2"));
    }

    #[test]
    fn author_summary_from_user() {
        let user = User {
            id: Uuid::now_v7(),
            user_id: "user_1".into(),
            name: "Ada".into(),
            username: "ada".into(),
            image: None,
            bio: None,
            onboarded: true,
            threads: vec![],
            communities: vec![],
            created_at: chrono::Utc::now(),
        };
        let summary = AuthorSummary::from(&user);
        assert_eq!(summary.id, user.id);
        assert_eq!(summary.username, "ada");
    }
}
