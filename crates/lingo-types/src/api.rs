use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{RequestStatus, User};

// -- JWT Claims --

/// Session token claims. `sub` is the user id the session gate resolves to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub full_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub user: User,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub success: bool,
    pub user: User,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OnboardingRequest {
    pub full_name: String,
    pub bio: String,
    pub native_language: String,
    pub learning_language: String,
    pub location: String,
    pub profile_pic: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingFieldsResponse {
    pub message: String,
    pub missing_fields: Vec<&'static str>,
}

// -- Generic --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessMessage {
    pub success: bool,
    pub message: String,
}

// -- Relationships --

/// Public projection of a user shown to other users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub full_name: String,
    pub profile_pic: String,
    pub native_language: String,
    pub learning_language: String,
}

/// One side of a friend request: a bare id, or the resolved profile when
/// the listing annotates that side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Participant {
    Id(Uuid),
    Profile(PublicProfile),
}

impl Participant {
    pub fn id(&self) -> Uuid {
        match self {
            Self::Id(id) => *id,
            Self::Profile(profile) => profile.id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequestView {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub sender: Participant,
    pub recipient: Participant,
    pub status: RequestStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendRequestsResponse {
    pub incoming: Vec<FriendRequestView>,
    pub accepted: Vec<FriendRequestView>,
}
