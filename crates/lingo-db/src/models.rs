//! Database row types. These map directly to SQLite rows.
//! Distinct from lingo-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub bio: String,
    pub profile_pic: String,
    pub native_language: String,
    pub learning_language: String,
    pub location: String,
    pub is_onboarded: bool,
    pub created_at: String,
}

pub struct NewUser<'a> {
    pub id: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub full_name: &'a str,
    pub profile_pic: &'a str,
}

pub struct ProfileUpdate<'a> {
    pub full_name: &'a str,
    pub bio: &'a str,
    pub native_language: &'a str,
    pub learning_language: &'a str,
    pub location: &'a str,
    pub profile_pic: Option<&'a str>,
}

pub struct FriendshipRow {
    pub user_id: String,
    pub friend_id: String,
}

pub struct FriendRequestRow {
    pub id: String,
    pub sender_id: String,
    pub recipient_id: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}
