use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use lingo_api::auth::AppStateInner;
use lingo_api::router;
use lingo_db::Database;

fn app() -> Router {
    let db = Database::open_in_memory().unwrap();
    router(Arc::new(AppStateInner {
        db,
        jwt_secret: "test-secret".into(),
        token_ttl_days: 7,
    }))
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
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(v) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };

    let resp = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

struct TestUser {
    id: String,
    token: String,
}

async fn signup(app: &Router, name: &str) -> TestUser {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/auth/signup",
        None,
        Some(json!({
            "email": format!("{}@example.com", name.to_lowercase()),
            "password": "hunter22",
            "fullName": name,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["user"].get("passwordHash").is_none());
    TestUser {
        id: body["user"]["_id"].as_str().unwrap().to_string(),
        token: body["token"].as_str().unwrap().to_string(),
    }
}

async fn onboarded(app: &Router, name: &str) -> TestUser {
    let user = signup(app, name).await;
    let (status, body) = call(
        app,
        Method::POST,
        "/api/auth/onboarding",
        Some(&user.token),
        Some(json!({
            "fullName": name,
            "bio": "Learning every day",
            "nativeLanguage": "english",
            "learningLanguage": "portuguese",
            "location": "Porto",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["user"]["isOnboarded"], json!(true));
    user
}

async fn send_request(app: &Router, from: &TestUser, to: &TestUser) -> (StatusCode, Value) {
    call(
        app,
        Method::POST,
        &format!("/api/users/friend-request/{}", to.id),
        Some(&from.token),
        None,
    )
    .await
}

#[tokio::test]
async fn request_accept_flow_updates_both_sides() {
    let app = app();
    let alice = onboarded(&app, "Alice").await;
    let bob = onboarded(&app, "Bob").await;

    let (status, request) = send_request(&app, &alice, &bob).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(request["status"], "pending");
    assert_eq!(request["sender"], alice.id.as_str());
    assert_eq!(request["recipient"], bob.id.as_str());
    let request_id = request["_id"].as_str().unwrap().to_string();

    let (status, lists) = call(&app, Method::GET, "/api/users/friend-requests", Some(&bob.token), None).await;
    assert_eq!(status, StatusCode::OK);
    let incoming = lists["incoming"].as_array().unwrap();
    assert_eq!(incoming.len(), 1);
    assert_eq!(incoming[0]["sender"]["_id"], alice.id.as_str());
    assert_eq!(incoming[0]["sender"]["fullName"], "Alice");

    let (status, outgoing) = call(
        &app,
        Method::GET,
        "/api/users/outgoing-friend-requests",
        Some(&alice.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outgoing.as_array().unwrap().len(), 1);
    assert_eq!(outgoing[0]["recipient"]["nativeLanguage"], "english");

    let (status, body) = call(
        &app,
        Method::PUT,
        &format!("/api/users/friend-request/{request_id}/accept"),
        Some(&bob.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Friend Request accepted");

    let (_, alice_friends) = call(&app, Method::GET, "/api/users/friends", Some(&alice.token), None).await;
    let (_, bob_friends) = call(&app, Method::GET, "/api/users/friends", Some(&bob.token), None).await;
    assert_eq!(alice_friends.as_array().unwrap().len(), 1);
    assert_eq!(alice_friends[0]["_id"], bob.id.as_str());
    assert_eq!(bob_friends.as_array().unwrap().len(), 1);
    assert_eq!(bob_friends[0]["_id"], alice.id.as_str());

    let (_, me) = call(&app, Method::GET, "/api/auth/me", Some(&alice.token), None).await;
    assert_eq!(me["user"]["friends"], json!([bob.id]));

    let (_, lists) = call(&app, Method::GET, "/api/users/friend-requests", Some(&bob.token), None).await;
    assert!(lists["incoming"].as_array().unwrap().is_empty());

    let (_, lists) = call(&app, Method::GET, "/api/users/friend-requests", Some(&alice.token), None).await;
    assert_eq!(lists["accepted"].as_array().unwrap().len(), 1);
    assert_eq!(lists["accepted"][0]["recipient"]["fullName"], "Bob");

    let (_, outgoing) = call(
        &app,
        Method::GET,
        "/api/users/outgoing-friend-requests",
        Some(&alice.token),
        None,
    )
    .await;
    assert!(outgoing.as_array().unwrap().is_empty());

    // Accepting again leaves the friend lists untouched.
    let (status, _) = call(
        &app,
        Method::PUT,
        &format!("/api/users/friend-request/{request_id}/accept"),
        Some(&bob.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, bob_friends) = call(&app, Method::GET, "/api/users/friends", Some(&bob.token), None).await;
    assert_eq!(bob_friends.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn duplicate_requests_are_rejected() {
    let app = app();
    let alice = onboarded(&app, "Alice").await;
    let bob = onboarded(&app, "Bob").await;

    let (status, _) = send_request(&app, &alice, &bob).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send_request(&app, &alice, &bob).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("already exists"));

    let (status, body) = send_request(&app, &bob, &alice).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("already exists"));
}

#[tokio::test]
async fn only_the_recipient_can_accept() {
    let app = app();
    let alice = onboarded(&app, "Alice").await;
    let bob = onboarded(&app, "Bob").await;
    let carol = onboarded(&app, "Carol").await;

    let (_, request) = send_request(&app, &alice, &bob).await;
    let uri = format!("/api/users/friend-request/{}/accept", request["_id"].as_str().unwrap());

    let (status, body) = call(&app, Method::PUT, &uri, Some(&carol.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "You are not authorized to accept this request");

    let (status, _) = call(&app, Method::PUT, &uri, Some(&alice.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(
        &app,
        Method::PUT,
        &format!("/api/users/friend-request/{}/accept", uuid::Uuid::new_v4()),
        Some(&bob.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_targets_are_reported() {
    let app = app();
    let alice = onboarded(&app, "Alice").await;

    let (status, body) = send_request(&app, &alice, &alice).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "You can't send friend request to yourself.");

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/api/users/friend-request/{}", uuid::Uuid::new_v4()),
        Some(&alice.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Recipient not found");

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/users/friend-request/not-an-id",
        Some(&alice.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn candidates_skip_self_friends_and_non_onboarded() {
    let app = app();
    let alice = onboarded(&app, "Alice").await;
    let bob = onboarded(&app, "Bob").await;
    let carol = onboarded(&app, "Carol").await;
    let _dave = signup(&app, "Dave").await;

    let (_, request) = send_request(&app, &alice, &bob).await;
    call(
        &app,
        Method::PUT,
        &format!("/api/users/friend-request/{}/accept", request["_id"].as_str().unwrap()),
        Some(&bob.token),
        None,
    )
    .await;

    let (status, candidates) = call(&app, Method::GET, "/api/users/candidates", Some(&alice.token), None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = candidates
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![carol.id.as_str()]);
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let app = app();

    let (status, body) = call(&app, Method::GET, "/api/users/friends", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["message"].is_string());

    let (status, _) = call(&app, Method::GET, "/api/users/friends", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn signup_login_and_onboarding_validation() {
    let app = app();
    let alice = signup(&app, "Alice").await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/auth/signup",
        None,
        Some(json!({ "email": "alice@example.com", "password": "another1", "fullName": "A" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User already exists");

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/auth/signup",
        None,
        Some(json!({ "email": "x@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "alice@example.com", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "nobody@example.com", "password": "hunter22" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Incorrect email or password");

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "alice@example.com", "password": "hunter22" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["_id"], alice.id.as_str());
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = call(&app, Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["isOnboarded"], json!(false));

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/auth/onboarding",
        Some(&token),
        Some(json!({ "fullName": "Alice", "nativeLanguage": "english" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["missingFields"], json!(["bio", "learningLanguage", "location"]));
}

#[tokio::test]
async fn signup_rejects_short_password_and_bad_email() {
    let app = app();

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/auth/signup",
        None,
        Some(json!({ "email": "zed@example.com", "password": "x", "fullName": "Zed" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Password must be at least 6 characters");

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/auth/signup",
        None,
        Some(json!({ "email": "not-an-email", "password": "hunter22", "fullName": "Zed" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Email is not valid");

    // Nothing was stored by the rejected attempts.
    let (status, _) = call(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "not-an-email", "password": "hunter22" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_bodies_get_a_message_response() {
    let app = app();

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/auth/signup",
        None,
        Some(json!({ "email": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "message": "Invalid request body" }));

    let alice = signup(&app, "Alice").await;
    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/onboarding")
        .header(header::AUTHORIZATION, format!("Bearer {}", alice.token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["message"], "Invalid request body");
}
