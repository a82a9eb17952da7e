//! # AppError
//!
//! Failures shared by every port. Storage plugins translate their driver
//! errors into these variants; the HTTP layer picks a status code from them.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// A user, thread or community id that resolves to nothing.
    /// Holds the entity name and the id as given by the caller.
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Rejected input: blank or over-long content, malformed profile fields
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Missing caller identity, unfinished onboarding, or acting on
    /// somebody else's thread or community
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Storage failure or corrupt data, such as a cycle in a reply tree
    #[error("internal service error: {0}")]
    Internal(String),

    /// Taken username, community name or alias; repeated membership
    #[error("conflict: {0}")]
    Conflict(String),
}

impl AppError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        AppError::NotFound(entity.to_string(), id.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_entity_and_id() {
        let err = AppError::not_found("Thread", "abc");
        assert_eq!(err.to_string(), "Thread not found with ID abc");
    }
}
