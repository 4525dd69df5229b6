//! Integration Tests: HTTP routes under /api
//!
//! Runs the real handlers against in-memory collaborators.

mod common;

use actix_web::{http::StatusCode, test, web, App};
use common::{harness, Harness, World};
use feed_service::handlers::{self, AppState};
use feed_service::jobs::CacheWarmerConfig;
use serde_json::{json, Value};

fn world() -> std::sync::Arc<World> {
    let world = World::new();
    for user in ["a", "b", "c"] {
        world.add_user(user);
    }
    world.follow("a", "b");
    world.add_item("b0", "b", 1, 3, 2);
    world.add_item("c0", "c", 2, 20, 0);
    world
}

fn state(h: &Harness) -> web::Data<AppState> {
    web::Data::new(AppState {
        feed: h.feed.clone(),
        engagement: h.engagement.clone(),
        users: h.world.clone(),
        warmer: CacheWarmerConfig::default(),
    })
}

#[actix_web::test]
async fn test_feed_route_returns_ranked_items() {
    let h = harness(world());
    let app = test::init_service(App::new().app_data(state(&h)).configure(handlers::configure)).await;

    let req = test::TestRequest::get()
        .uri("/api/feed?userId=a&page=1&limit=10")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["page"], 1);
    assert_eq!(body["limit"], 10);
    assert_eq!(body["hasMore"], false);
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["type"], "post");
    assert!(items[0]["likesCount"].is_number());
}

#[actix_web::test]
async fn test_feed_route_has_more_is_exact_on_full_last_page() {
    let h = harness(world());
    let app = test::init_service(App::new().app_data(state(&h)).configure(handlers::configure)).await;

    let req = test::TestRequest::get()
        .uri("/api/feed?userId=a&limit=2")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["hasMore"], false);

    let req = test::TestRequest::get()
        .uri("/api/feed?userId=a&limit=1")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["hasMore"], true);

    let req = test::TestRequest::get()
        .uri("/api/feed?userId=a&page=2&limit=1")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["hasMore"], false);
}

#[actix_web::test]
async fn test_feed_route_requires_user_id() {
    let h = harness(world());
    let app = test::init_service(App::new().app_data(state(&h)).configure(handlers::configure)).await;

    let req = test::TestRequest::get().uri("/api/feed").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_feed_route_hides_store_failures() {
    let h = harness(world());
    h.world.set_content_down(true);
    let app = test::init_service(App::new().app_data(state(&h)).configure(handlers::configure)).await;

    let req = test::TestRequest::get().uri("/api/feed?userId=a").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Internal server error");
}

#[actix_web::test]
async fn test_explore_route_without_viewer() {
    let h = harness(world());
    let app = test::init_service(App::new().app_data(state(&h)).configure(handlers::configure)).await;

    let req = test::TestRequest::get().uri("/api/explore?limit=1").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], "c0");
}

#[actix_web::test]
async fn test_create_post_and_shot() {
    let h = harness(world());
    let app = test::init_service(App::new().app_data(state(&h)).configure(handlers::configure)).await;

    let req = test::TestRequest::post()
        .uri("/api/posts")
        .set_json(json!({ "userId": "a", "caption": "hi", "image": "p.jpg" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let post: Value = test::read_body_json(resp).await;
    assert_eq!(post["kind"], "post");
    assert_eq!(post["mediaUrl"], "p.jpg");

    let req = test::TestRequest::post()
        .uri("/api/posts")
        .set_json(json!({ "userId": "a", "video": "v.mp4" }))
        .to_request();
    let shot: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(shot["kind"], "shot");

    let req = test::TestRequest::post()
        .uri("/api/posts")
        .set_json(json!({ "userId": "a", "caption": "no media" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_like_route_toggles() {
    let h = harness(world());
    let app = test::init_service(App::new().app_data(state(&h)).configure(handlers::configure)).await;

    let like = || {
        test::TestRequest::post()
            .uri("/api/posts/c0/like")
            .set_json(json!({ "userId": "a" }))
            .to_request()
    };

    let first: Value = test::call_and_read_body_json(&app, like()).await;
    assert_eq!(first, json!({ "liked": true, "message": "Like added" }));

    let second: Value = test::call_and_read_body_json(&app, like()).await;
    assert_eq!(second, json!({ "liked": false, "message": "Like removed" }));

    let req = test::TestRequest::post()
        .uri("/api/posts/missing/like")
        .set_json(json!({ "userId": "a" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::post()
        .uri("/api/posts/c0/like")
        .set_json(json!({}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_comment_route_creates_comment() {
    let h = harness(world());
    let app = test::init_service(App::new().app_data(state(&h)).configure(handlers::configure)).await;

    let req = test::TestRequest::post()
        .uri("/api/posts/b0/comments")
        .set_json(json!({ "userId": "a", "text": "great" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let comment: Value = test::read_body_json(resp).await;
    assert_eq!(comment["userId"], "a");
    assert_eq!(comment["text"], "great");
}

#[actix_web::test]
async fn test_cron_route_reports_each_user() {
    let h = harness(world());
    let app = test::init_service(App::new().app_data(state(&h)).configure(handlers::configure)).await;

    let req = test::TestRequest::get()
        .uri("/api/cron/feed-precompute")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["message"], "Feed pre-computation complete");
    assert_eq!(body["processed"], 2);
    let details = body["details"].as_array().unwrap();
    assert!(details.iter().all(|d| d["status"] == "success"));
}
