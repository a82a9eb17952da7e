//! Thread routes: the public feed, posting, the reply tree, likes, reposts
//! and user tags. Deleting is reserved for the thread's author.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use threads_core::error::AppError;
use threads_core::models::{NewComment, NewThread};
use threads_core::validation::validate_content;
use uuid::Uuid;

use super::{community_or_404, onboarded_caller, AppState, ListParams};
use crate::error::{unauthorized, ApiError};
use crate::identity::CurrentUser;

#[derive(Debug, Deserialize)]
pub struct ThreadForm {
    pub content: String,
    /// External community id; omitted for a personal thread.
    pub community_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CommentForm {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct TagForm {
    pub user_ids: Vec<Uuid>,
}

pub async fn list_threads(
    data: web::Data<AppState>,
    params: web::Query<ListParams>,
) -> Result<HttpResponse, ApiError> {
    let page = data.threads.fetch_threads(params.page_request()).await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn create_thread(
    data: web::Data<AppState>,
    current: CurrentUser,
    form: web::Json<ThreadForm>,
) -> Result<HttpResponse, ApiError> {
    let form = form.into_inner();
    validate_content(&form.content)?;
    let author = onboarded_caller(&data, &current).await?;

    let community_id = match form.community_id.as_deref() {
        Some(external) => Some(community_or_404(&data, external).await?.community.id),
        None => None,
    };

    let thread = data
        .threads
        .create_thread(NewThread {
            content: form.content.trim().to_string(),
            author_id: author.id,
            community_id,
        })
        .await?;
    Ok(HttpResponse::Created().json(thread))
}

pub async fn view_thread(data: web::Data<AppState>, path: web::Path<Uuid>) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    match data.threads.fetch_thread_by_id(id).await? {
        Some(node) => Ok(HttpResponse::Ok().json(node)),
        None => Err(AppError::not_found("Thread", id).into()),
    }
}

/// Only the author may delete a thread; the whole reply tree goes with it.
pub async fn delete_thread(
    data: web::Data<AppState>,
    current: CurrentUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let caller = onboarded_caller(&data, &current).await?;

    let thread = data
        .threads
        .fetch_thread(id)
        .await?
        .ok_or_else(|| ApiError(AppError::not_found("Thread", id)))?;
    if thread.author_id != caller.id {
        return Err(unauthorized(format!("thread {id} belongs to another user")));
    }

    let removed = data.threads.delete_thread(id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "deleted": removed })))
}

pub async fn add_comment(
    data: web::Data<AppState>,
    current: CurrentUser,
    path: web::Path<Uuid>,
    form: web::Json<CommentForm>,
) -> Result<HttpResponse, ApiError> {
    validate_content(&form.content)?;
    let author = onboarded_caller(&data, &current).await?;

    let comment = data
        .threads
        .comment_thread(NewComment {
            parent_id: path.into_inner(),
            content: form.content.trim().to_string(),
            author_id: author.id,
        })
        .await?;
    Ok(HttpResponse::Created().json(comment))
}

pub async fn list_comments(data: web::Data<AppState>, path: web::Path<Uuid>) -> Result<HttpResponse, ApiError> {
    let comments = data.threads.fetch_all_comments(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(comments))
}

pub async fn toggle_like(
    data: web::Data<AppState>,
    current: CurrentUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let thread = data.threads.toggle_like_thread(path.into_inner(), current.as_str()).await?;
    Ok(HttpResponse::Ok().json(thread))
}

pub async fn repost(
    data: web::Data<AppState>,
    current: CurrentUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let author = onboarded_caller(&data, &current).await?;
    let thread = data.threads.repost_thread(path.into_inner(), author.id).await?;
    Ok(HttpResponse::Created().json(thread))
}

pub async fn tag_users(
    data: web::Data<AppState>,
    current: CurrentUser,
    path: web::Path<Uuid>,
    form: web::Json<TagForm>,
) -> Result<HttpResponse, ApiError> {
    let tagger = onboarded_caller(&data, &current).await?;
    data.users
        .update_user_tags(path.into_inner(), tagger.id, form.into_inner().user_ids)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}
