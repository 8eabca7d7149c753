mod common;

use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Method, Request, StatusCode},
};
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn registering_twice_conflicts() {
    let app = TestApp::new();

    let (status, body) = app.register("alice", "pw1").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Registration successful");

    let (status, body) = app.register("alice", "other").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("taken"));
}

#[tokio::test]
async fn register_requires_both_fields() {
    let app = TestApp::new();

    let (status, body) = app
        .request(Method::POST, "/api/register", Some(json!({ "username": "alice" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("password"));

    let (status, _) = app.register("", "pw").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_with_argon2_hashes() {
    let app = TestApp::with_argon2();
    assert_eq!(app.register("alice", "pw1").await.0, StatusCode::CREATED);

    let (status, body) = app
        .request(
            Method::POST,
            "/api/login",
            Some(json!({ "username": "alice", "password": "pw1" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["message"], "Login successful");
}

#[tokio::test]
async fn bad_password_and_unknown_user_look_the_same() {
    let app = TestApp::new();
    app.register("alice", "pw1").await;

    let (wrong_status, wrong_body) = app
        .request(
            Method::POST,
            "/api/login",
            Some(json!({ "username": "alice", "password": "nope" })),
        )
        .await;
    let (unknown_status, unknown_body) = app
        .request(
            Method::POST,
            "/api/login",
            Some(json!({ "username": "mallory", "password": "pw1" })),
        )
        .await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body, unknown_body);
}

#[tokio::test]
async fn login_requires_both_fields() {
    let app = TestApp::new();
    let (status, _) = app
        .request(Method::POST, "/api/login", Some(json!({ "password": "pw1" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_json_uses_error_body() {
    let app = TestApp::new();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/register")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Invalid JSON body." }));
}

#[tokio::test]
async fn wrongly_typed_field_gets_the_same_fixed_message() {
    let app = TestApp::new();
    let (status, body) = app
        .request(
            Method::POST,
            "/api/chat",
            Some(json!({ "idChat": 5, "question": "hi", "username": "alice" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Invalid JSON body." }));
}
