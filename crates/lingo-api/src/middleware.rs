use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::debug;
use uuid::Uuid;

use lingo_types::api::Claims;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::run_db;

/// The caller identity the session gate resolved. Handlers read it from
/// request extensions and pass it explicitly to every operation.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

/// Extract and validate JWT from Authorization header, then confirm the
/// user still exists.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Unauthorized("Unauthorized - No token provided".into()))?;

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        debug!("Rejected token: {}", e);
        ApiError::Unauthorized("Unauthorized - Invalid token".into())
    })?
    .claims;

    let user_id = claims.sub;
    let exists = run_db(&state, move |db| {
        Ok(db.get_user_by_id(&user_id.to_string())?.is_some())
    })
    .await?;
    if !exists {
        return Err(ApiError::Unauthorized("Unauthorized - User not found".into()));
    }

    req.extensions_mut().insert(AuthUser {
        id: claims.sub,
        email: claims.email,
    });
    Ok(next.run(req).await)
}
