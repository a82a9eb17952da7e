//! # threads-api
//!
//! The JSON routing and orchestration layer for Threads.

pub mod error;
pub mod handlers;
pub mod identity;
pub mod middleware;

pub use handlers::AppState;

use actix_web::web;

/// Mounts every route. The binary decides the prefix by wrapping this in a
/// scope, so the same table can serve `/` or `/api/v1/`.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    use handlers::{communities, threads, users};

    cfg.app_data(web::JsonConfig::default().error_handler(error::json_error))
        .app_data(web::QueryConfig::default().error_handler(error::query_error))
        .app_data(web::PathConfig::default().error_handler(error::path_error));

    cfg.service(
        web::scope("/threads")
            .route("", web::get().to(threads::list_threads))
            .route("", web::post().to(threads::create_thread))
            .route("/{id}", web::get().to(threads::view_thread))
            .route("/{id}", web::delete().to(threads::delete_thread))
            .route("/{id}/comments", web::get().to(threads::list_comments))
            .route("/{id}/comments", web::post().to(threads::add_comment))
            .route("/{id}/like", web::post().to(threads::toggle_like))
            .route("/{id}/repost", web::post().to(threads::repost))
            .route("/{id}/tags", web::post().to(threads::tag_users)),
    )
    .service(
        web::scope("/communities")
            .route("", web::get().to(communities::list_communities))
            .route("", web::post().to(communities::create_community))
            .route("/{cid}", web::get().to(communities::view_community))
            .route("/{cid}", web::put().to(communities::update_community))
            .route("/{cid}", web::delete().to(communities::delete_community))
            .route("/{cid}/threads", web::get().to(communities::community_threads))
            .route("/{cid}/posts", web::get().to(communities::community_posts))
            .route("/{cid}/members", web::post().to(communities::join_community))
            .route("/{cid}/members/{uid}", web::delete().to(communities::remove_member)),
    )
    .service(
        web::scope("/users")
            .route("", web::get().to(users::list_users))
            // Registered before `/{id}` so "me" is never parsed as an id
            .route("/me", web::get().to(users::me))
            .route("/me", web::put().to(users::update_me))
            .route("/{id}", web::get().to(users::view_user))
            .route("/{id}/threads", web::get().to(users::user_threads))
            .route("/{id}/tags", web::get().to(users::user_tags))
            .route("/{id}/communities", web::get().to(users::user_communities))
            .route("/{id}/activity", web::get().to(users::user_activity)),
    );
}
