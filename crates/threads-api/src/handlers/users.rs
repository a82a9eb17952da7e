//! Profile routes. `/users/me` resolves the caller from the identity header
//! and is the only place a user who has not finished onboarding may write.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use threads_core::error::AppError;
use threads_core::models::UserUpdate;
use threads_core::query::UserQuery;
use threads_core::validation::validate_profile;
use uuid::Uuid;

use super::{AppState, ListParams};
use crate::error::ApiError;
use crate::identity::CurrentUser;

/// Onboarding / edit-profile form. The external id always comes from the
/// caller's identity, never from the body.
#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    pub name: String,
    pub username: String,
    pub bio: Option<String>,
    pub image: Option<String>,
}

pub async fn list_users(
    data: web::Data<AppState>,
    current: CurrentUser,
    params: web::Query<ListParams>,
) -> Result<HttpResponse, ApiError> {
    let query = UserQuery {
        exclude_user_id: current.0,
        search: params.search(),
        page: params.page_request(),
        sort: params.sort(),
    };
    let page = data.users.fetch_all_users(query).await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn me(data: web::Data<AppState>, current: CurrentUser) -> Result<HttpResponse, ApiError> {
    match data.users.fetch_user_data(current.as_str()).await? {
        Some(profile) => Ok(HttpResponse::Ok().json(profile)),
        None => Err(AppError::not_found("User", current.as_str()).into()),
    }
}

pub async fn update_me(
    data: web::Data<AppState>,
    current: CurrentUser,
    form: web::Json<ProfileForm>,
) -> Result<HttpResponse, ApiError> {
    let form = form.into_inner();
    let update = UserUpdate {
        user_id: current.0,
        name: form.name.trim().to_string(),
        username: form.username.trim().to_string(),
        bio: form.bio.map(|b| b.trim().to_string()).filter(|b| !b.is_empty()),
        image: form.image.filter(|i| !i.trim().is_empty()),
    };
    validate_profile(&update)?;

    let user = data.users.update_user(update).await?;
    Ok(HttpResponse::Ok().json(user))
}

pub async fn view_user(data: web::Data<AppState>, path: web::Path<Uuid>) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    match data.users.fetch_user_data_by_db_id(id).await? {
        Some(user) => Ok(HttpResponse::Ok().json(user)),
        None => Err(AppError::not_found("User", id).into()),
    }
}

pub async fn user_threads(data: web::Data<AppState>, path: web::Path<Uuid>) -> Result<HttpResponse, ApiError> {
    let cards = data.users.fetch_profile_threads(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(cards))
}

pub async fn user_tags(data: web::Data<AppState>, path: web::Path<Uuid>) -> Result<HttpResponse, ApiError> {
    let tags = data.users.fetch_user_tags(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(tags))
}

pub async fn user_communities(data: web::Data<AppState>, path: web::Path<Uuid>) -> Result<HttpResponse, ApiError> {
    let communities = data.users.fetch_user_communities(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(communities))
}

pub async fn user_activity(data: web::Data<AppState>, path: web::Path<Uuid>) -> Result<HttpResponse, ApiError> {
    let activity = data.users.get_user_activity(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(activity))
}
