//! Router tests: drive the full axum app in-process against an in-memory database.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use chrono::Duration;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use messagely_api::auth::{AppStateInner, decode_token};
use messagely_api::router;
use messagely_api::store::UserStore;
use messagely_db::Database;

const SECRET: &str = "test-secret";

fn app() -> Router {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let state = Arc::new(AppStateInner {
        db: db.clone(),
        users: UserStore::new(db, 1),
        jwt_secret: SECRET.to_string(),
        token_ttl: Duration::hours(1),
    });
    router(state)
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let req = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn register(app: &Router, username: &str, password: &str) -> String {
    let (status, body) = call(
        app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({
            "username": username,
            "password": password,
            "first_name": format!("{}-first", username),
            "last_name": format!("{}-last", username),
            "phone": "555-0100",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn register_and_login_issue_tokens() {
    let app = app();

    let token = register(&app, "alice", "p1").await;
    assert_eq!(decode_token(SECRET, &token).unwrap().username, "alice");

    let (status, body) = call(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "username": "alice", "password": "p1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let login_token = body["token"].as_str().unwrap();
    assert_eq!(decode_token(SECRET, login_token).unwrap().username, "alice");

    for (username, password) in [("alice", "wrong"), ("ghost", "p1")] {
        let (status, body) = call(
            &app,
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "username": username, "password": password })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "Invalid username/password");
        assert_eq!(body["error"]["status"], 400);
    }
}

#[tokio::test]
async fn register_rejects_missing_fields_and_duplicates() {
    let app = app();

    let (status, body) = call(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({ "username": "alice", "password": "p1" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"].as_str().unwrap().starts_with("Missing data"));

    register(&app, "alice", "p1").await;

    let (status, _) = call(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({
            "username": "alice",
            "password": "p2",
            "first_name": "A",
            "last_name": "B",
            "phone": "1",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn register_treats_null_fields_as_missing() {
    let app = app();

    let (status, body) = call(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({
            "username": "alice",
            "password": "p1",
            "first_name": null,
            "last_name": "Liddell",
            "phone": null,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Missing data: first_name, phone");
    assert_eq!(body["error"]["status"], 400);

    let (status, body) = call(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "username": null, "password": null })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Invalid username/password");
}

#[tokio::test]
async fn user_routes_require_a_valid_token() {
    let app = app();
    let alice = register(&app, "alice", "p1").await;
    register(&app, "bob", "p2").await;

    let (status, _) = call(&app, Method::GET, "/users", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&app, Method::GET, "/users", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(&app, Method::GET, "/users", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    let users = body["users"].as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[0]["username"], "alice");
    assert!(users[0].get("password").is_none());
    assert!(users[0].get("join_at").is_none());
}

#[tokio::test]
async fn user_detail_is_only_visible_to_its_owner() {
    let app = app();
    let alice = register(&app, "alice", "p1").await;
    register(&app, "bob", "p2").await;

    let (status, _) = call(&app, Method::GET, "/users/bob", Some(&alice), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(&app, Method::GET, "/users/alice", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    let user = &body["user"];
    assert_eq!(user["username"], "alice");
    assert_eq!(user["first_name"], "alice-first");
    assert!(user["join_at"].is_string());
    assert!(user["last_login_at"].is_string());
    assert!(user.get("password").is_none());
}

#[tokio::test]
async fn messages_flow_between_users() {
    let app = app();
    let alice = register(&app, "alice", "p1").await;
    let bob = register(&app, "bob", "p2").await;
    let carol = register(&app, "carol", "p3").await;

    let (status, body) = call(&app, Method::GET, "/users/alice/from", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["messages"].as_array().unwrap().is_empty());

    let (status, body) = call(
        &app,
        Method::POST,
        "/messages",
        Some(&alice),
        Some(json!({ "to_username": "bob", "body": "hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["message"]["id"].as_i64().unwrap();
    assert_eq!(body["message"]["from_username"], "alice");

    let (_, body) = call(&app, Method::GET, "/users/alice/from", Some(&alice), None).await;
    let sent = body["messages"].as_array().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["to_user"]["username"], "bob");
    assert_eq!(sent[0]["body"], "hi");
    assert!(sent[0]["read_at"].is_null());

    let (_, body) = call(&app, Method::GET, "/users/bob/to", Some(&bob), None).await;
    let received = body["messages"].as_array().unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0]["from_user"]["username"], "alice");

    let uri = format!("/messages/{}", id);
    let (status, _) = call(&app, Method::GET, &uri, Some(&carol), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, body) = call(&app, Method::GET, &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"]["to_user"]["username"], "bob");

    let read_uri = format!("/messages/{}/read", id);
    let (status, _) = call(&app, Method::POST, &read_uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, body) = call(&app, Method::POST, &read_uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"]["read_at"].is_string());

    let (status, _) = call(&app, Method::GET, "/messages/9999", Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn sending_to_unknown_user_is_not_found() {
    let app = app();
    let alice = register(&app, "alice", "p1").await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/messages",
        Some(&alice),
        Some(json!({ "to_username": "ghost", "body": "hello?" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "No such user: ghost");
}
