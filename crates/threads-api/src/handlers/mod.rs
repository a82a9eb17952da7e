//! # threads-api handlers
//!
//! Each handler validates the request, resolves the caller and hands off to
//! one of the core ports. No handler touches storage directly.

pub mod communities;
pub mod threads;
pub mod users;

use std::sync::Arc;

use serde::Deserialize;
use threads_core::error::AppError;
use threads_core::models::{CommunityDetails, User};
use threads_core::query::{PageRequest, SearchTerm, SortOrder, DEFAULT_PAGE_SIZE};
use threads_core::traits::{CommunityRepo, ThreadRepo, UserRepo};

use crate::error::{unauthorized, ApiError};
use crate::identity::CurrentUser;

/// State shared across all Actix-web workers.
pub struct AppState {
    pub threads: Arc<dyn ThreadRepo>,
    pub communities: Arc<dyn CommunityRepo>,
    pub users: Arc<dyn UserRepo>,
}

/// `?page=&size=&sort=&q=` on listing routes.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort: Option<SortOrder>,
    pub q: Option<String>,
}

impl ListParams {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page.unwrap_or(1), self.size.unwrap_or(DEFAULT_PAGE_SIZE))
    }

    pub fn search(&self) -> Option<SearchTerm> {
        self.q.as_deref().and_then(SearchTerm::parse)
    }

    pub fn sort(&self) -> SortOrder {
        self.sort.unwrap_or_default()
    }
}

/// Loads the caller's account. Users who have not finished onboarding may
/// only read and edit their own profile.
pub(crate) async fn onboarded_caller(state: &AppState, current: &CurrentUser) -> Result<User, ApiError> {
    let profile = state
        .users
        .fetch_user_data(current.as_str())
        .await?
        .ok_or_else(|| unauthorized(format!("user {} has no profile", current.as_str())))?;

    if !profile.user.onboarded {
        return Err(unauthorized(format!("user {} has not finished onboarding", current.as_str())));
    }
    Ok(profile.user)
}

pub(crate) async fn community_or_404(state: &AppState, community_id: &str) -> Result<CommunityDetails, ApiError> {
    state
        .communities
        .fetch_community_details(community_id)
        .await?
        .ok_or_else(|| ApiError(AppError::not_found("Community", community_id)))
}
