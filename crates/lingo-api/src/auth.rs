use std::sync::{Arc, LazyLock};

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use rand::Rng;
use regex::Regex;
use tracing::info;
use uuid::Uuid;

use lingo_db::Database;
use lingo_db::models::{NewUser, ProfileUpdate};
use lingo_types::api::{
    AuthResponse, Claims, LoginRequest, MissingFieldsResponse, OnboardingRequest, SignupRequest,
    SuccessMessage, UserResponse,
};

use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::middleware::AuthUser;
use crate::relationships::load_user;
use crate::run_db;

const MIN_PASSWORD_LEN: usize = 6;
const INCORRECT_CREDENTIALS: &str = "Incorrect email or password";

#[allow(clippy::expect_used)] // literal pattern, cannot fail
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static regex should not panic")
});

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub token_ttl_days: i64,
}

pub async fn signup(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_string();
    let full_name = req.full_name.trim().to_string();
    if email.is_empty() || req.password.is_empty() || full_name.is_empty() {
        return Err(ApiError::InvalidRequest("All fields are required".into()));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::InvalidRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if !EMAIL_REGEX.is_match(&email) {
        return Err(ApiError::InvalidRequest("Email is not valid".into()));
    }

    let avatar_idx: u32 = rand::rng().random_range(1..=100);
    let profile_pic = format!("https://avatar.iran.liara.run/public/{}.png", avatar_idx);
    let user_id = Uuid::new_v4();

    let user = run_db(&state, move |db| {
        // Hash password with Argon2id
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(req.password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
            .to_string();

        let id = user_id.to_string();
        let created = db.create_user(&NewUser {
            id: &id,
            email: &email,
            password_hash: &password_hash,
            full_name: &full_name,
            profile_pic: &profile_pic,
        })?;
        if !created {
            return Err(ApiError::Conflict("User already exists".into()));
        }

        load_user(db, user_id)
    })
    .await?;

    let token = create_token(&state, user.id, &user.email)?;
    info!("User {} signed up", user.id);

    Ok(Json(AuthResponse {
        success: true,
        user,
        token,
    }))
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::InvalidRequest("All fields are required".into()));
    }

    let user = run_db(&state, move |db| {
        let row = db
            .get_user_by_email(req.email.trim())?
            .ok_or_else(|| ApiError::InvalidRequest(INCORRECT_CREDENTIALS.into()))?;

        // Verify password
        let parsed_hash = PasswordHash::new(&row.password_hash)
            .map_err(|e| anyhow::anyhow!("stored hash for {} is unreadable: {}", row.id, e))?;
        Argon2::default()
            .verify_password(req.password.as_bytes(), &parsed_hash)
            .map_err(|_| ApiError::Unauthorized(INCORRECT_CREDENTIALS.into()))?;

        let user_id: Uuid = row
            .id
            .parse()
            .map_err(|e| anyhow::anyhow!("corrupt user id '{}': {}", row.id, e))?;
        load_user(db, user_id)
    })
    .await?;

    let token = create_token(&state, user.id, &user.email)?;

    Ok(Json(AuthResponse {
        success: true,
        user,
        token,
    }))
}

/// Tokens are stateless; the client discards its copy.
pub async fn logout() -> impl IntoResponse {
    Json(SuccessMessage {
        success: true,
        message: "Logout successful".into(),
    })
}

pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let user = run_db(&state, move |db| load_user(db, auth.id)).await?;
    Ok(Json(UserResponse {
        success: true,
        user,
    }))
}

pub async fn onboarding(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    JsonBody(req): JsonBody<OnboardingRequest>,
) -> Result<Response, ApiError> {
    let missing = missing_fields(&req);
    if !missing.is_empty() {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(MissingFieldsResponse {
                message: "All fields are required".into(),
                missing_fields: missing,
            }),
        )
            .into_response());
    }

    let user = run_db(&state, move |db| {
        let update = ProfileUpdate {
            full_name: req.full_name.trim(),
            bio: req.bio.trim(),
            native_language: req.native_language.trim(),
            learning_language: req.learning_language.trim(),
            location: req.location.trim(),
            profile_pic: req.profile_pic.as_deref().map(str::trim).filter(|p| !p.is_empty()),
        };
        if db.update_profile(&auth.id.to_string(), &update)?.is_none() {
            return Err(ApiError::NotFound("User not found".into()));
        }
        load_user(db, auth.id)
    })
    .await?;

    info!("User {} onboarded", user.id);
    Ok(Json(UserResponse {
        success: true,
        user,
    })
    .into_response())
}

fn missing_fields(req: &OnboardingRequest) -> Vec<&'static str> {
    [
        ("fullName", &req.full_name),
        ("bio", &req.bio),
        ("nativeLanguage", &req.native_language),
        ("learningLanguage", &req.learning_language),
        ("location", &req.location),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(name, _)| name)
    .collect()
}

fn create_token(state: &AppStateInner, user_id: Uuid, email: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(state.token_ttl_days)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.jwt_secret.as_bytes()),
    )?;

    Ok(token)
}
