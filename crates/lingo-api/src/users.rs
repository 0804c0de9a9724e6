use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use lingo_types::api::MessageResponse;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::relationships;
use crate::run_db;

/// GET /api/users/candidates
pub async fn get_candidates(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let users = run_db(&state, move |db| relationships::list_candidates(db, auth.id)).await?;
    Ok(Json(users))
}

/// GET /api/users/friends
pub async fn get_friends(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let friends = run_db(&state, move |db| relationships::list_friends(db, auth.id)).await?;
    Ok(Json(friends))
}

/// POST /api/users/friend-request/{id}
pub async fn send_friend_request(
    State(state): State<AppState>,
    Path(recipient_id): Path<String>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    // An id that does not parse cannot name an existing user.
    let recipient: Uuid = recipient_id
        .parse()
        .map_err(|_| ApiError::NotFound("Recipient not found".into()))?;

    let request =
        run_db(&state, move |db| relationships::create_request(db, auth.id, recipient)).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// PUT /api/users/friend-request/{id}/accept
pub async fn accept_friend_request(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let request_id: Uuid = request_id
        .parse()
        .map_err(|_| ApiError::NotFound("Friend request not found.".into()))?;

    run_db(&state, move |db| relationships::accept_request(db, auth.id, request_id)).await?;
    Ok(Json(MessageResponse {
        message: "Friend Request accepted".into(),
    }))
}

/// GET /api/users/friend-requests
pub async fn get_friend_requests(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let requests =
        run_db(&state, move |db| relationships::list_incoming_and_accepted(db, auth.id)).await?;
    Ok(Json(requests))
}

/// GET /api/users/outgoing-friend-requests
pub async fn get_outgoing_friend_requests(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let requests = run_db(&state, move |db| relationships::list_outgoing(db, auth.id)).await?;
    Ok(Json(requests))
}
