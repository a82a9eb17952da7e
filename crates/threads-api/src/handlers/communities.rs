//! Community routes. Anyone may browse; only the creator may rename or
//! delete a community, and members may leave on their own.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use threads_core::models::{CommunityDetails, CommunityUpdate, NewCommunity};
use threads_core::query::CommunityQuery;

use super::{community_or_404, onboarded_caller, AppState, ListParams};
use crate::error::{unauthorized, ApiError};
use crate::identity::CurrentUser;

#[derive(Debug, Deserialize)]
pub struct CommunityForm {
    pub community_id: String,
    pub name: String,
    pub alias: String,
    pub image: Option<String>,
    pub description: Option<String>,
}

fn require_creator(details: &CommunityDetails, current: &CurrentUser) -> Result<(), ApiError> {
    if details.created_by.user_id != current.as_str() {
        return Err(unauthorized(format!(
            "only the creator may manage community {}",
            details.community.community_id
        )));
    }
    Ok(())
}

pub async fn list_communities(
    data: web::Data<AppState>,
    params: web::Query<ListParams>,
) -> Result<HttpResponse, ApiError> {
    let query = CommunityQuery {
        search: params.search(),
        page: params.page_request(),
        sort: params.sort(),
    };
    let page = data.communities.fetch_communities(query).await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn create_community(
    data: web::Data<AppState>,
    current: CurrentUser,
    form: web::Json<CommunityForm>,
) -> Result<HttpResponse, ApiError> {
    let creator = onboarded_caller(&data, &current).await?;
    let form = form.into_inner();

    let community = data
        .communities
        .create_community(NewCommunity {
            community_id: form.community_id,
            name: form.name,
            alias: form.alias,
            image: form.image,
            description: form.description,
            created_by_user_id: creator.user_id,
        })
        .await?;
    Ok(HttpResponse::Created().json(community))
}

pub async fn view_community(data: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let details = community_or_404(&data, &path).await?;
    Ok(HttpResponse::Ok().json(details))
}

pub async fn update_community(
    data: web::Data<AppState>,
    current: CurrentUser,
    path: web::Path<String>,
    form: web::Json<CommunityUpdate>,
) -> Result<HttpResponse, ApiError> {
    let details = community_or_404(&data, &path).await?;
    require_creator(&details, &current)?;

    let community = data
        .communities
        .update_community_info(&path, form.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(community))
}

pub async fn delete_community(
    data: web::Data<AppState>,
    current: CurrentUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let details = community_or_404(&data, &path).await?;
    require_creator(&details, &current)?;

    let community = data.communities.delete_community(&path).await?;
    Ok(HttpResponse::Ok().json(community))
}

pub async fn community_threads(
    data: web::Data<AppState>,
    path: web::Path<String>,
    params: web::Query<ListParams>,
) -> Result<HttpResponse, ApiError> {
    let details = community_or_404(&data, &path).await?;
    let page = data
        .threads
        .fetch_threads_by_community(details.community.id, params.page_request())
        .await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn community_posts(data: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let details = community_or_404(&data, &path).await?;
    let posts = data.communities.fetch_community_posts(details.community.id).await?;
    Ok(HttpResponse::Ok().json(posts))
}

/// The caller joins the community.
pub async fn join_community(
    data: web::Data<AppState>,
    current: CurrentUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let member = onboarded_caller(&data, &current).await?;
    let community = data
        .communities
        .add_member_to_community(&path, &member.user_id)
        .await?;
    Ok(HttpResponse::Ok().json(community))
}

/// Members may leave on their own; the creator may remove anyone.
pub async fn remove_member(
    data: web::Data<AppState>,
    current: CurrentUser,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (community_id, user_id) = path.into_inner();
    if user_id != current.as_str() {
        let details = community_or_404(&data, &community_id).await?;
        require_creator(&details, &current)?;
    }

    data.communities
        .remove_user_from_community(&user_id, &community_id)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}
