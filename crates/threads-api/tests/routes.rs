use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use chrono::Utc;
use threads_api::{configure_routes, AppState};
use threads_core::error::AppError;
use threads_core::models::{AuthorSummary, Community, CommunityDetails, Thread, User, UserProfile};
use threads_core::query::{Page, SortOrder};
use threads_core::traits::{MockCommunityRepo, MockThreadRepo, MockUserRepo};
use uuid::Uuid;

struct Mocks {
    threads: MockThreadRepo,
    communities: MockCommunityRepo,
    users: MockUserRepo,
}

impl Mocks {
    fn new() -> Self {
        Self {
            threads: MockThreadRepo::new(),
            communities: MockCommunityRepo::new(),
            users: MockUserRepo::new(),
        }
    }

    fn into_state(self) -> web::Data<AppState> {
        web::Data::new(AppState {
            threads: Arc::new(self.threads),
            communities: Arc::new(self.communities),
            users: Arc::new(self.users),
        })
    }
}

fn user(external: &str, onboarded: bool) -> User {
    User {
        id: Uuid::now_v7(),
        user_id: external.to_string(),
        name: format!("User {external}"),
        username: external.to_string(),
        image: None,
        bio: None,
        onboarded,
        threads: vec![],
        communities: vec![],
        created_at: Utc::now(),
    }
}

fn thread(author_id: Uuid, content: &str) -> Thread {
    Thread {
        id: Uuid::now_v7(),
        content: content.to_string(),
        author_id,
        community_id: None,
        parent_id: None,
        children: vec![],
        likes: vec![],
        created_at: Utc::now(),
    }
}

fn expect_caller(users: &mut MockUserRepo, caller: User) {
    users.expect_fetch_user_data().returning(move |_| {
        Ok(Some(UserProfile { user: caller.clone(), communities: vec![] }))
    });
}

fn community_details(external: &str, creator: &User) -> CommunityDetails {
    CommunityDetails {
        community: Community {
            id: Uuid::now_v7(),
            community_id: external.to_string(),
            name: "Rustaceans".into(),
            alias: "rust".into(),
            image: None,
            description: None,
            created_by: creator.id,
            members: vec![creator.id],
            threads: vec![],
            created_at: Utc::now(),
        },
        created_by: AuthorSummary::from(creator),
        members: vec![AuthorSummary::from(creator)],
    }
}

macro_rules! app {
    ($mocks:expr) => {
        test::init_service(App::new().app_data($mocks.into_state()).configure(configure_routes)).await
    };
}

#[actix_web::test]
async fn test_missing_identity_is_unauthorized() {
    let app = app!(Mocks::new());
    let req = test::TestRequest::post()
        .uri("/threads")
        .set_json(serde_json::json!({ "content": "Hello world" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_create_thread_rejects_short_content() {
    let app = app!(Mocks::new());
    let req = test::TestRequest::post()
        .uri("/threads")
        .insert_header(("X-User-Id", "u1"))
        .set_json(serde_json::json!({ "content": "hi" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("at least 3"));
}

#[actix_web::test]
async fn test_malformed_json_body_is_validation_error() {
    let app = app!(Mocks::new());
    let req = test::TestRequest::post()
        .uri("/threads")
        .insert_header(("X-User-Id", "u1"))
        .insert_header(("content-type", "application/json"))
        .set_payload("{\"content\": ")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().starts_with("validation error"));
}

#[actix_web::test]
async fn test_negative_page_is_validation_error() {
    let app = app!(Mocks::new());
    let req = test::TestRequest::get().uri("/threads?page=-1").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().starts_with("validation error"));
}

#[actix_web::test]
async fn test_malformed_thread_id_is_validation_error() {
    let app = app!(Mocks::new());
    let req = test::TestRequest::get().uri("/threads/not-a-uuid").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert!(body["error"].is_string());
}

#[actix_web::test]
async fn test_create_thread_for_onboarded_user() {
    let mut mocks = Mocks::new();
    let author = user("u1", true);
    let author_id = author.id;
    expect_caller(&mut mocks.users, author);
    mocks
        .threads
        .expect_create_thread()
        .withf(move |new| new.author_id == author_id && new.content == "Hello world" && new.community_id.is_none())
        .times(1)
        .returning(|new| Ok(thread(new.author_id, &new.content)));

    let app = app!(mocks);
    let req = test::TestRequest::post()
        .uri("/threads")
        .insert_header(("X-User-Id", "u1"))
        .set_json(serde_json::json!({ "content": "  Hello world  " }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Thread = test::read_body_json(resp).await;
    assert_eq!(body.author_id, author_id);
}

#[actix_web::test]
async fn test_create_thread_in_community_resolves_external_id() {
    let mut mocks = Mocks::new();
    let author = user("u1", true);
    let details = community_details("org_1", &author);
    let community_id = details.community.id;
    expect_caller(&mut mocks.users, author);
    mocks
        .communities
        .expect_fetch_community_details()
        .returning(move |_| Ok(Some(details.clone())));
    mocks
        .threads
        .expect_create_thread()
        .withf(move |new| new.community_id == Some(community_id))
        .times(1)
        .returning(|new| {
            let mut created = thread(new.author_id, &new.content);
            created.community_id = new.community_id;
            Ok(created)
        });

    let app = app!(mocks);
    let req = test::TestRequest::post()
        .uri("/threads")
        .insert_header(("X-User-Id", "u1"))
        .set_json(serde_json::json!({ "content": "Welcome all", "community_id": "org_1" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
}

#[actix_web::test]
async fn test_user_without_onboarding_cannot_post() {
    let mut mocks = Mocks::new();
    expect_caller(&mut mocks.users, user("u1", false));

    let app = app!(mocks);
    let req = test::TestRequest::post()
        .uri("/threads")
        .insert_header(("X-User-Id", "u1"))
        .set_json(serde_json::json!({ "content": "Hello world" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_view_missing_thread_is_404() {
    let mut mocks = Mocks::new();
    mocks.threads.expect_fetch_thread_by_id().returning(|_| Ok(None));

    let app = app!(mocks);
    let req = test::TestRequest::get().uri(&format!("/threads/{}", Uuid::now_v7())).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_only_author_can_delete_thread() {
    let mut mocks = Mocks::new();
    let owner = user("owner", true);
    let mine = thread(owner.id, "mine");
    let thread_id = mine.id;
    expect_caller(&mut mocks.users, user("intruder", true));
    mocks.threads.expect_fetch_thread().returning(move |_| Ok(Some(mine.clone())));
    mocks.threads.expect_delete_thread().never();

    let app = app!(mocks);
    let req = test::TestRequest::delete()
        .uri(&format!("/threads/{thread_id}"))
        .insert_header(("X-User-Id", "intruder"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_author_deletes_thread_tree() {
    let mut mocks = Mocks::new();
    let owner = user("owner", true);
    let mine = thread(owner.id, "mine");
    let thread_id = mine.id;
    let reply_id = Uuid::now_v7();
    expect_caller(&mut mocks.users, owner);
    mocks.threads.expect_fetch_thread().returning(move |_| Ok(Some(mine.clone())));
    mocks.threads.expect_fetch_thread_by_id().never();
    mocks
        .threads
        .expect_delete_thread()
        .times(1)
        .returning(move |id| Ok(vec![id, reply_id]));

    let app = app!(mocks);
    let req = test::TestRequest::delete()
        .uri(&format!("/threads/{thread_id}"))
        .insert_header(("X-User-Id", "owner"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["deleted"].as_array().unwrap().len(), 2);
}

#[actix_web::test]
async fn test_like_uses_caller_identity() {
    let mut mocks = Mocks::new();
    let author = Uuid::now_v7();
    mocks
        .threads
        .expect_toggle_like_thread()
        .times(1)
        .returning(move |_, user_id| {
            let mut liked = thread(author, "liked");
            liked.likes.push(user_id.to_string());
            Ok(liked)
        });

    let app = app!(mocks);
    let req = test::TestRequest::post()
        .uri(&format!("/threads/{}/like", Uuid::now_v7()))
        .insert_header(("X-User-Id", "fan"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Thread = test::read_body_json(resp).await;
    assert_eq!(body.likes, vec!["fan".to_string()]);
}

#[actix_web::test]
async fn test_list_communities_passes_search_and_paging() {
    let mut mocks = Mocks::new();
    mocks
        .communities
        .expect_fetch_communities()
        .withf(|query| {
            query.search.as_ref().map(|s| s.as_str()) == Some("rust")
                && query.page.number == 2
                && query.page.size == 5
                && query.sort == SortOrder::Asc
        })
        .times(1)
        .returning(|_| Ok(Page::empty()));

    let app = app!(mocks);
    let req = test::TestRequest::get()
        .uri("/communities?q=%20Rust%20&page=2&size=5&sort=asc")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 0);
    assert_eq!(body["is_next"], false);
}

#[actix_web::test]
async fn test_joining_twice_is_conflict() {
    let mut mocks = Mocks::new();
    expect_caller(&mut mocks.users, user("u1", true));
    mocks
        .communities
        .expect_add_member_to_community()
        .returning(|community_id, user_id| {
            Err(AppError::Conflict(format!("{user_id} already in {community_id}")))
        });

    let app = app!(mocks);
    let req = test::TestRequest::post()
        .uri("/communities/org_1/members")
        .insert_header(("X-User-Id", "u1"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn test_only_creator_updates_community() {
    let mut mocks = Mocks::new();
    let creator = user("creator", true);
    let details = community_details("org_1", &creator);
    mocks
        .communities
        .expect_fetch_community_details()
        .returning(move |_| Ok(Some(details.clone())));
    mocks.communities.expect_update_community_info().never();

    let app = app!(mocks);
    let req = test::TestRequest::put()
        .uri("/communities/org_1")
        .insert_header(("X-User-Id", "someone"))
        .set_json(serde_json::json!({ "name": "Taken over", "alias": "mine", "image": null }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_community_posts_resolve_internal_id() {
    let mut mocks = Mocks::new();
    let creator = user("creator", true);
    let details = community_details("org_1", &creator);
    let internal = details.community.id;
    mocks
        .communities
        .expect_fetch_community_details()
        .returning(move |_| Ok(Some(details.clone())));
    mocks
        .communities
        .expect_fetch_community_posts()
        .withf(move |id| *id == internal)
        .times(1)
        .returning(|_| Ok(vec![]));

    let app = app!(mocks);
    let req = test::TestRequest::get().uri("/communities/org_1/posts").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_unknown_community_is_404() {
    let mut mocks = Mocks::new();
    mocks.communities.expect_fetch_community_details().returning(|_| Ok(None));

    let app = app!(mocks);
    let req = test::TestRequest::get().uri("/communities/nope").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_update_me_validates_profile() {
    let mut mocks = Mocks::new();
    mocks.users.expect_update_user().never();

    let app = app!(mocks);
    let req = test::TestRequest::put()
        .uri("/users/me")
        .insert_header(("X-User-Id", "u1"))
        .set_json(serde_json::json!({ "name": "Ada", "username": "ada", "bio": "short" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_update_me_takes_id_from_header() {
    let mut mocks = Mocks::new();
    mocks
        .users
        .expect_update_user()
        .withf(|update| update.user_id == "u1" && update.username == "ada_l")
        .times(1)
        .returning(|update| {
            let mut saved = user(&update.user_id, true);
            saved.username = update.username;
            Ok(saved)
        });

    let app = app!(mocks);
    let req = test::TestRequest::put()
        .uri("/users/me")
        .insert_header(("X-User-Id", "u1"))
        .set_json(serde_json::json!({ "name": "Ada", "username": " ada_l ", "bio": null, "image": null }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: User = test::read_body_json(resp).await;
    assert!(body.onboarded);
}

#[actix_web::test]
async fn test_me_without_profile_is_404() {
    let mut mocks = Mocks::new();
    mocks.users.expect_fetch_user_data().returning(|_| Ok(None));

    let app = app!(mocks);
    let req = test::TestRequest::get()
        .uri("/users/me")
        .insert_header(("X-User-Id", "u1"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_internal_errors_are_not_leaked() {
    let mut mocks = Mocks::new();
    mocks
        .threads
        .expect_fetch_all_comments()
        .returning(|_| Err(AppError::Internal("disk on fire".into())));

    let app = app!(mocks);
    let req = test::TestRequest::get()
        .uri(&format!("/threads/{}/comments", Uuid::now_v7()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "internal server error");
}
