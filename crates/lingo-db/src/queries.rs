use crate::Database;
use crate::models::{FriendRequestRow, FriendshipRow, NewUser, ProfileUpdate, UserRow};
use anyhow::Result;
use lingo_types::models::RequestStatus;
use rusqlite::{Connection, ErrorCode, Row};

const USER_COLUMNS: &str = "id, email, password_hash, full_name, bio, profile_pic, \
     native_language, learning_language, location, is_onboarded, created_at";

/// Ids bound per `IN (...)` query, well under SQLite's variable limit.
const MAX_BATCH: usize = 500;

const REQUEST_COLUMNS: &str =
    "id, sender_id, recipient_id, status, created_at, updated_at";

impl Database {
    // -- Users --

    /// Inserts a user. Returns `false` if the email is already registered.
    pub fn create_user(&self, user: &NewUser<'_>) -> Result<bool> {
        self.with_conn(|conn| {
            let res = conn.execute(
                "INSERT INTO users (id, email, password_hash, full_name, profile_pic)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (user.id, user.email, user.password_hash, user.full_name, user.profile_pic),
            );
            match res {
                Ok(_) => Ok(true),
                Err(e) if is_constraint_violation(&e) => Ok(false),
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");
            conn.query_row(&sql, [email], user_from_row).optional()
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    /// Batch-fetch users by id. Unknown ids are skipped.
    pub fn get_users_by_ids(&self, ids: &[String]) -> Result<Vec<UserRow>> {
        let mut out = Vec::with_capacity(ids.len());
        for batch in ids.chunks(MAX_BATCH) {
            let rows = self.with_conn(|conn| {
                let sql = format!(
                    "SELECT {USER_COLUMNS} FROM users WHERE id IN ({}) ORDER BY created_at, rowid",
                    placeholders(batch.len())
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(rusqlite::params_from_iter(batch), user_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })?;
            out.extend(rows);
        }
        Ok(out)
    }

    /// Onboarded users other than `user_id` and not in its friend set.
    pub fn list_candidates(&self, user_id: &str) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {USER_COLUMNS} FROM users
                 WHERE is_onboarded = 1
                   AND id <> ?1
                   AND id NOT IN (SELECT friend_id FROM friendships WHERE user_id = ?1)
                 ORDER BY created_at, rowid"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Writes the onboarding profile and marks the user onboarded.
    /// Returns the updated row, or `None` if the user does not exist.
    pub fn update_profile(&self, id: &str, update: &ProfileUpdate<'_>) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET
                    full_name = ?2,
                    bio = ?3,
                    native_language = ?4,
                    learning_language = ?5,
                    location = ?6,
                    profile_pic = COALESCE(?7, profile_pic),
                    is_onboarded = 1
                 WHERE id = ?1",
                rusqlite::params![
                    id,
                    update.full_name,
                    update.bio,
                    update.native_language,
                    update.learning_language,
                    update.location,
                    update.profile_pic,
                ],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_user_by_id(conn, id)
        })
    }

    // -- Friendships --

    pub fn get_friend_ids(&self, user_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT friend_id FROM friendships WHERE user_id = ?1 ORDER BY created_at, rowid",
            )?;
            let ids = stmt
                .query_map([user_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(ids)
        })
    }

    /// Batch-fetch friendship rows owned by any of `user_ids`.
    pub fn get_friendships_for(&self, user_ids: &[String]) -> Result<Vec<FriendshipRow>> {
        let mut out = Vec::new();
        for batch in user_ids.chunks(MAX_BATCH) {
            let rows = self.with_conn(|conn| {
                let sql = format!(
                    "SELECT user_id, friend_id FROM friendships WHERE user_id IN ({})",
                    placeholders(batch.len())
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(rusqlite::params_from_iter(batch), |row| {
                        Ok(FriendshipRow {
                            user_id: row.get(0)?,
                            friend_id: row.get(1)?,
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })?;
            out.extend(rows);
        }
        Ok(out)
    }

    // -- Friend requests --

    /// Inserts a pending request. Returns `false` if any request already
    /// exists for the unordered pair.
    pub fn insert_friend_request(&self, id: &str, sender_id: &str, recipient_id: &str) -> Result<bool> {
        let (low, high) = pair_key(sender_id, recipient_id);
        self.with_conn(|conn| {
            let res = conn.execute(
                "INSERT INTO friend_requests (id, sender_id, recipient_id, status, pair_low, pair_high)
                 VALUES (?1, ?2, ?3, 'pending', ?4, ?5)",
                (id, sender_id, recipient_id, low, high),
            );
            match res {
                Ok(_) => Ok(true),
                Err(e) if is_constraint_violation(&e) => Ok(false),
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_friend_request(&self, id: &str) -> Result<Option<FriendRequestRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {REQUEST_COLUMNS} FROM friend_requests WHERE id = ?1");
            conn.query_row(&sql, [id], request_from_row).optional()
        })
    }

    /// Any request between `a` and `b`, whichever direction it was sent.
    pub fn find_request_between(&self, a: &str, b: &str) -> Result<Option<FriendRequestRow>> {
        let (low, high) = pair_key(a, b);
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {REQUEST_COLUMNS} FROM friend_requests WHERE pair_low = ?1 AND pair_high = ?2"
            );
            conn.query_row(&sql, [low, high], request_from_row).optional()
        })
    }

    /// Marks the request accepted and adds each party to the other's friend
    /// set, all in one transaction.
    pub fn accept_friend_request(&self, id: &str, sender_id: &str, recipient_id: &str) -> Result<()> {
        self.with_tx(|conn| {
            conn.execute(
                "UPDATE friend_requests SET status = 'accepted', updated_at = datetime('now')
                 WHERE id = ?1 AND status = 'pending'",
                [id],
            )?;
            conn.execute(
                "INSERT OR IGNORE INTO friendships (user_id, friend_id) VALUES (?1, ?2)",
                (sender_id, recipient_id),
            )?;
            conn.execute(
                "INSERT OR IGNORE INTO friendships (user_id, friend_id) VALUES (?1, ?2)",
                (recipient_id, sender_id),
            )?;
            Ok(())
        })
    }

    pub fn requests_to(&self, recipient_id: &str, status: RequestStatus) -> Result<Vec<FriendRequestRow>> {
        self.with_conn(|conn| query_requests(conn, "recipient_id", recipient_id, status))
    }

    pub fn requests_from(&self, sender_id: &str, status: RequestStatus) -> Result<Vec<FriendRequestRow>> {
        self.with_conn(|conn| query_requests(conn, "sender_id", sender_id, status))
    }
}

fn query_user_by_id(conn: &Connection, id: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    conn.query_row(&sql, [id], user_from_row).optional()
}

/// `column` is one of the two fixed party columns, never user input.
fn query_requests(
    conn: &Connection,
    column: &str,
    user_id: &str,
    status: RequestStatus,
) -> Result<Vec<FriendRequestRow>> {
    let sql = format!(
        "SELECT {REQUEST_COLUMNS} FROM friend_requests
         WHERE {column} = ?1 AND status = ?2
         ORDER BY created_at, rowid"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map((user_id, status.as_str()), request_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        full_name: row.get(3)?,
        bio: row.get(4)?,
        profile_pic: row.get(5)?,
        native_language: row.get(6)?,
        learning_language: row.get(7)?,
        location: row.get(8)?,
        is_onboarded: row.get(9)?,
        created_at: row.get(10)?,
    })
}

fn request_from_row(row: &Row<'_>) -> rusqlite::Result<FriendRequestRow> {
    Ok(FriendRequestRow {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        recipient_id: row.get(2)?,
        status: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

/// Sorted form of an unordered pair of user ids.
fn pair_key<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b { (a, b) } else { (b, a) }
}

fn placeholders(n: usize) -> String {
    (1..=n).map(|i| format!("?{}", i)).collect::<Vec<_>>().join(", ")
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
