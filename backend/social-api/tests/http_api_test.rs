//! HTTP surface: routing, auth extraction, status codes and body shapes

mod common;

use actix_web::{test, web, App};
use serde_json::{json, Value};

use common::{bearer, build_graph};
use social_api::middleware::BearerAuth;

macro_rules! app {
    () => {{
        let (graph, _images) = build_graph();
        test::init_service(
            App::new()
                .app_data(web::Data::new(graph))
                .wrap(BearerAuth)
                .configure(social_api::configure),
        )
        .await
    }};
}

macro_rules! register {
    ($app:expr, $name:expr) => {{
        let req = test::TestRequest::post()
            .uri("/api/auth/register")
            .set_json(json!({
                "username": $name,
                "email": format!("{}@example.com", $name),
                "password": "secret123",
                "fullName": "Test User",
            }))
            .to_request();
        let resp = test::call_service(&$app, req).await;
        assert_eq!(resp.status(), 201);
        let body: Value = test::read_body_json(resp).await;
        (
            body["token"].as_str().unwrap().to_string(),
            body["user"]["id"].as_str().unwrap().to_string(),
        )
    }};
}

#[actix_web::test]
async fn test_banner_and_health() {
    let app = app!();

    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert!(resp.status().is_success());
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "running");

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/api/health").to_request(),
    )
    .await;
    assert!(resp.status().is_success());
}

#[actix_web::test]
async fn test_register_login_me() {
    let app = app!();
    let (token, user_id) = register!(app, "alice");

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let me: Value = test::read_body_json(resp).await;
    assert_eq!(me["id"], user_id.as_str());
    assert_eq!(me["full_name"], "Test User");
    assert!(me.get("password_hash").is_none());

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": "ALICE@example.com", "password": "secret123" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["token"].as_str().is_some());

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": "  alice@example.com ", "password": "secret123" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": "alice@example.com", "password": "wrong-password" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
}

#[actix_web::test]
async fn test_register_validation_and_duplicates() {
    let app = app!();
    register!(app, "alice");

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({ "username": "alice", "email": "other@example.com", "password": "secret123" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 409);

    // Surrounding whitespace is trimmed, not rejected
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({ "username": "carol", "email": " carol@example.com", "password": "secret123" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["user"]["email"], "carol@example.com");

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({ "username": "al", "email": "not-an-email", "password": "123" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], 400);
    assert!(body["error"].as_str().unwrap().contains("Password must be at least 6 characters"));
}

#[actix_web::test]
async fn test_protected_routes_require_token() {
    let app = app!();

    let req = test::TestRequest::post()
        .uri("/api/posts")
        .set_json(json!({ "text": "hello" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Unauthorized: No token provided");

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(bearer("not.a.jwt"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 401);

    // A bad token does not break public routes
    let req = test::TestRequest::get()
        .uri("/api/posts")
        .insert_header(bearer("not.a.jwt"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);
}

#[actix_web::test]
async fn test_malformed_ids_and_unknown_routes() {
    let app = app!();

    let req = test::TestRequest::get().uri("/api/posts/not-a-uuid").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    let req = test::TestRequest::get()
        .uri(&format!("/api/users/{}", uuid::Uuid::new_v4()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);

    let req = test::TestRequest::get().uri("/api/nothing-here").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
}

#[actix_web::test]
async fn test_search_requires_query() {
    let app = app!();
    register!(app, "alice");

    let req = test::TestRequest::get().uri("/api/users/search").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    let req = test::TestRequest::get()
        .uri("/api/users/search?query=ALI")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let users: Value = test::read_body_json(resp).await;
    assert_eq!(users.as_array().unwrap().len(), 1);

    register!(app, "bobby");
    let req = test::TestRequest::get().uri("/api/users").to_request();
    let users: Value = test::call_and_read_body_json(&app, req).await;
    let names: Vec<&str> = users
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap())
        .collect();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"alice") && names.contains(&"bobby"));
    assert!(users[0].get("password_hash").is_none());
}

#[actix_web::test]
async fn test_follow_over_http() {
    let app = app!();
    let (alice_token, alice_id) = register!(app, "alice");
    let (_, bob_id) = register!(app, "bobby");

    let follow = |token: &str, target: &str| {
        test::TestRequest::post()
            .uri(&format!("/api/users/{}/follow", target))
            .insert_header(bearer(token))
            .to_request()
    };

    assert_eq!(test::call_service(&app, follow(&alice_token, &bob_id)).await.status(), 200);
    assert_eq!(test::call_service(&app, follow(&alice_token, &bob_id)).await.status(), 409);
    assert_eq!(test::call_service(&app, follow(&alice_token, &alice_id)).await.status(), 400);

    let req = test::TestRequest::get()
        .uri(&format!("/api/users/{}", bob_id))
        .to_request();
    let bob: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(bob["followers"][0]["id"], alice_id.as_str());
    assert_eq!(bob["followers"][0]["username"], "alice");
    assert!(bob["followers"][0].get("email").is_none());
    assert!(bob["followers"][0].get("password_hash").is_none());
    assert_eq!(bob["following"], json!([]));
}

#[actix_web::test]
async fn test_post_comment_like_flow() {
    let app = app!();
    let (t1, u1) = register!(app, "user1");
    let (t2, u2) = register!(app, "user2");

    // U1 posts
    let req = test::TestRequest::post()
        .uri("/api/posts")
        .insert_header(bearer(&t1))
        .set_json(json!({ "text": "hello" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Post created successfully");
    assert_eq!(body["post"]["user_id"], u1.as_str());
    assert_eq!(body["post"]["likes"], json!([]));
    let post_id = body["post"]["id"].as_str().unwrap().to_string();

    // U2 likes, twice
    let like = || {
        test::TestRequest::post()
            .uri(&format!("/api/posts/{}/like", post_id))
            .insert_header(bearer(&t2))
            .to_request()
    };
    let body: Value = test::call_and_read_body_json(&app, like()).await;
    assert_eq!(body["likes"], json!([u2]));
    assert_eq!(test::call_service(&app, like()).await.status(), 409);

    // U2 comments
    let req = test::TestRequest::post()
        .uri(&format!("/api/comments/{}", post_id))
        .insert_header(bearer(&t2))
        .set_json(json!({ "text": "nice" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let body: Value = test::read_body_json(resp).await;
    let comment_id = body["comment"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri(&format!("/api/posts/{}", post_id))
        .to_request();
    let post: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(post["comments"].as_array().unwrap().len(), 1);
    assert_eq!(post["comments"][0]["id"], comment_id.as_str());
    assert_eq!(post["comments"][0]["user"]["id"], u2.as_str());
    assert_eq!(post["likes"][0]["id"], u2.as_str());

    // U2 may not edit or delete U1's post
    let req = test::TestRequest::put()
        .uri(&format!("/api/posts/{}", post_id))
        .insert_header(bearer(&t2))
        .set_json(json!({ "text": "hijacked" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/posts/{}", post_id))
        .insert_header(bearer(&t2))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    // U1 deletes; post and comment are gone
    let req = test::TestRequest::delete()
        .uri(&format!("/api/posts/{}", post_id))
        .insert_header(bearer(&t1))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    let req = test::TestRequest::get()
        .uri(&format!("/api/posts/{}", post_id))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);

    let req = test::TestRequest::post()
        .uri(&format!("/api/comments/{}/like", comment_id))
        .insert_header(bearer(&t1))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
}

#[actix_web::test]
async fn test_comment_update_and_unlike() {
    let app = app!();
    let (t1, _) = register!(app, "user1");

    let req = test::TestRequest::post()
        .uri("/api/posts")
        .insert_header(bearer(&t1))
        .set_json(json!({ "text": "hello" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let post_id = body["post"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri(&format!("/api/comments/{}", post_id))
        .insert_header(bearer(&t1))
        .set_json(json!({ "text": "first" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let comment_id = body["comment"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::put()
        .uri(&format!("/api/comments/{}", comment_id))
        .insert_header(bearer(&t1))
        .set_json(json!({ "text": "edited" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["comment"]["text"], "edited");

    let req = test::TestRequest::post()
        .uri(&format!("/api/comments/{}/unlike", comment_id))
        .insert_header(bearer(&t1))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 409);

    let req = test::TestRequest::get()
        .uri(&format!("/api/comments/{}", post_id))
        .to_request();
    let comments: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(comments.as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn test_read_endpoints_embed_authors() {
    let app = app!();
    let (t1, u1) = register!(app, "writer");
    let (t2, _) = register!(app, "reader");

    let req = test::TestRequest::post()
        .uri("/api/posts")
        .insert_header(bearer(&t1))
        .set_json(json!({ "text": "hello" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let post_id = body["post"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri(&format!("/api/comments/{}", post_id))
        .insert_header(bearer(&t2))
        .set_json(json!({ "text": "nice" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 201);

    let req = test::TestRequest::get().uri("/api/posts").to_request();
    let posts: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(posts[0]["user"]["username"], "writer");
    assert_eq!(posts[0]["user"]["full_name"], "Test User");
    assert_eq!(posts[0]["comments"][0]["user"]["username"], "reader");
    assert!(!posts.to_string().contains("password_hash"));

    let req = test::TestRequest::get()
        .uri(&format!("/api/posts/user/{}", u1))
        .to_request();
    let posts: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(posts[0]["user"]["id"], u1.as_str());

    let req = test::TestRequest::get()
        .uri(&format!("/api/comments/{}", post_id))
        .to_request();
    let comments: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(comments[0]["user"]["username"], "reader");
    assert_eq!(comments[0]["text"], "nice");
    assert_eq!(comments[0]["likes"], json!([]));
}
