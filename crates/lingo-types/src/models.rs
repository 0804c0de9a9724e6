use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user's friends. Adding an id that is already present is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FriendSet(BTreeSet<Uuid>);

impl FriendSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the id was not already a friend.
    pub fn insert(&mut self, id: Uuid) -> bool {
        self.0.insert(id)
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.0.contains(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Uuid> {
        self.0.iter()
    }
}

impl FromIterator<Uuid> for FriendSet {
    fn from_iter<I: IntoIterator<Item = Uuid>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Full user record as returned to the owner and to candidate listings.
/// The credential hash never leaves the database layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub bio: String,
    pub profile_pic: String,
    pub native_language: String,
    pub learning_language: String,
    pub location: String,
    pub is_onboarded: bool,
    pub friends: FriendSet,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            other => Err(format!("unknown request status '{other}'")),
        }
    }
}

/// A ledger entry. Moves from `Pending` to `Accepted` once and never back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequest {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub sender: Uuid,
    pub recipient: Uuid,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
