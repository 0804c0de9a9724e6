use axum::{
    Json, Router, middleware,
    routing::{get, post, put},
};
use serde_json::{Value, json};

use crate::auth::{self, AppState};
use crate::middleware::require_auth;
use crate::users;

/// All API routes. Everything except signup, login, logout and health sits
/// behind the session gate.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout));

    let protected_routes = Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/onboarding", post(auth::onboarding))
        .route("/api/users/candidates", get(users::get_candidates))
        .route("/api/users/friends", get(users::get_friends))
        .route("/api/users/friend-request/{id}", post(users::send_friend_request))
        .route("/api/users/friend-request/{id}/accept", put(users::accept_friend_request))
        .route("/api/users/friend-requests", get(users::get_friend_requests))
        .route(
            "/api/users/outgoing-friend-requests",
            get(users::get_outgoing_friend_requests),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
