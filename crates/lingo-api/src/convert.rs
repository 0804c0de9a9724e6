//! Row-to-model conversion. Corrupt ids and timestamps are logged and
//! replaced with defaults rather than failing the whole listing.

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use lingo_db::models::{FriendRequestRow, UserRow};
use lingo_types::api::PublicProfile;
use lingo_types::models::{FriendRequest, FriendSet, RequestStatus, User};

pub fn parse_id(raw: &str, field: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", field, raw, e);
        Uuid::default()
    })
}

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
pub fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc()))
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}

pub fn user_from_row(row: UserRow, friends: FriendSet) -> User {
    User {
        id: parse_id(&row.id, "user id"),
        email: row.email,
        full_name: row.full_name,
        bio: row.bio,
        profile_pic: row.profile_pic,
        native_language: row.native_language,
        learning_language: row.learning_language,
        location: row.location,
        is_onboarded: row.is_onboarded,
        friends,
        created_at: parse_timestamp(&row.created_at),
    }
}

pub fn profile_from_row(row: &UserRow) -> PublicProfile {
    PublicProfile {
        id: parse_id(&row.id, "user id"),
        full_name: row.full_name.clone(),
        profile_pic: row.profile_pic.clone(),
        native_language: row.native_language.clone(),
        learning_language: row.learning_language.clone(),
    }
}

pub fn request_from_row(row: &FriendRequestRow) -> FriendRequest {
    FriendRequest {
        id: parse_id(&row.id, "request id"),
        sender: parse_id(&row.sender_id, "sender_id"),
        recipient: parse_id(&row.recipient_id, "recipient_id"),
        status: row.status.parse().unwrap_or_else(|e| {
            warn!("Request '{}': {}", row.id, e);
            RequestStatus::Pending
        }),
        created_at: parse_timestamp(&row.created_at),
        updated_at: parse_timestamp(&row.updated_at),
    }
}
