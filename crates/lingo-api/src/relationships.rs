//! Friend candidates, friend lists and the friend-request ledger.
//!
//! Every operation takes the authenticated caller explicitly. Stored ids are
//! resolved in two steps: fetch the id set, then batch-fetch the users.
//! Candidates are the exception and are filtered in a single query.

use std::collections::HashMap;

use anyhow::anyhow;
use tracing::{debug, info};
use uuid::Uuid;

use lingo_db::Database;
use lingo_db::models::{FriendRequestRow, UserRow};
use lingo_types::api::{FriendRequestView, FriendRequestsResponse, Participant, PublicProfile};
use lingo_types::models::{FriendRequest, FriendSet, RequestStatus, User};

use crate::convert::{parse_id, profile_from_row, request_from_row, user_from_row};
use crate::error::ApiError;

const REQUEST_EXISTS: &str = "A friend request already exists between you and this user";

/// Onboarded users that are neither the caller nor already friends.
pub fn list_candidates(db: &Database, caller: Uuid) -> Result<Vec<User>, ApiError> {
    let rows = db.list_candidates(&caller.to_string())?;
    users_with_friends(db, rows)
}

pub fn list_friends(db: &Database, caller: Uuid) -> Result<Vec<PublicProfile>, ApiError> {
    let caller_id = caller.to_string();
    if db.get_user_by_id(&caller_id)?.is_none() {
        return Err(ApiError::NotFound("User not found".into()));
    }

    let friend_ids = db.get_friend_ids(&caller_id)?;
    let mut by_id: HashMap<String, UserRow> = db
        .get_users_by_ids(&friend_ids)?
        .into_iter()
        .map(|row| (row.id.clone(), row))
        .collect();

    // Keep the order in which friendships were made.
    Ok(friend_ids
        .iter()
        .filter_map(|id| by_id.remove(id))
        .map(|row| profile_from_row(&row))
        .collect())
}

pub fn load_user(db: &Database, id: Uuid) -> Result<User, ApiError> {
    let row = db
        .get_user_by_id(&id.to_string())?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    let mut users = users_with_friends(db, vec![row])?;
    users.pop().ok_or_else(|| anyhow!("user {id} lost during friend resolution").into())
}

pub fn create_request(db: &Database, sender: Uuid, recipient: Uuid) -> Result<FriendRequest, ApiError> {
    if sender == recipient {
        return Err(ApiError::InvalidRequest(
            "You can't send friend request to yourself.".into(),
        ));
    }

    let sender_id = sender.to_string();
    let recipient_id = recipient.to_string();

    if db.get_user_by_id(&recipient_id)?.is_none() {
        return Err(ApiError::NotFound("Recipient not found".into()));
    }

    if db.get_friend_ids(&sender_id)?.contains(&recipient_id) {
        return Err(ApiError::Conflict("You are already friends with the user".into()));
    }

    if db.find_request_between(&sender_id, &recipient_id)?.is_some() {
        return Err(ApiError::Conflict(REQUEST_EXISTS.into()));
    }

    insert_pending(db, &sender_id, &recipient_id)
}

/// Writes the ledger entry. The unique pair index catches a concurrent
/// request that slipped past the existence check.
fn insert_pending(db: &Database, sender_id: &str, recipient_id: &str) -> Result<FriendRequest, ApiError> {
    let request_id = Uuid::new_v4().to_string();
    if !db.insert_friend_request(&request_id, sender_id, recipient_id)? {
        debug!("Friend request {} -> {} lost insert race", sender_id, recipient_id);
        return Err(ApiError::Conflict(REQUEST_EXISTS.into()));
    }

    let row = db
        .get_friend_request(&request_id)?
        .ok_or_else(|| anyhow!("friend request {request_id} missing after insert"))?;

    info!("Friend request {} created: {} -> {}", request_id, sender_id, recipient_id);
    Ok(request_from_row(&row))
}

/// Accepting an already accepted request succeeds without changing anything.
pub fn accept_request(db: &Database, acting: Uuid, request_id: Uuid) -> Result<FriendRequest, ApiError> {
    let row = db
        .get_friend_request(&request_id.to_string())?
        .ok_or_else(|| ApiError::NotFound("Friend request not found.".into()))?;

    let request = request_from_row(&row);
    if request.recipient != acting {
        return Err(ApiError::Forbidden(
            "You are not authorized to accept this request".into(),
        ));
    }

    if request.status == RequestStatus::Accepted {
        debug!("Friend request {} already accepted", request_id);
    }

    db.accept_friend_request(&row.id, &row.sender_id, &row.recipient_id)?;
    info!(
        "Friend request {} accepted: {} <-> {}",
        request_id, request.sender, request.recipient
    );

    let row = db
        .get_friend_request(&row.id)?
        .ok_or_else(|| anyhow!("friend request {request_id} missing after accept"))?;
    Ok(request_from_row(&row))
}

/// Pending requests addressed to `user`, plus accepted requests `user` sent.
/// Accepted requests that `user` received are not listed.
pub fn list_incoming_and_accepted(db: &Database, user: Uuid) -> Result<FriendRequestsResponse, ApiError> {
    let user_id = user.to_string();

    let incoming = db.requests_to(&user_id, RequestStatus::Pending)?;
    let accepted = db.requests_from(&user_id, RequestStatus::Accepted)?;

    Ok(FriendRequestsResponse {
        incoming: annotate(db, &incoming, Side::Sender)?,
        accepted: annotate(db, &accepted, Side::Recipient)?,
    })
}

pub fn list_outgoing(db: &Database, user: Uuid) -> Result<Vec<FriendRequestView>, ApiError> {
    let outgoing = db.requests_from(&user.to_string(), RequestStatus::Pending)?;
    annotate(db, &outgoing, Side::Recipient)
}

#[derive(Clone, Copy)]
enum Side {
    Sender,
    Recipient,
}

/// Resolve one side of each request to its public profile.
fn annotate(db: &Database, rows: &[FriendRequestRow], side: Side) -> Result<Vec<FriendRequestView>, ApiError> {
    let side_id = |row: &FriendRequestRow| match side {
        Side::Sender => row.sender_id.clone(),
        Side::Recipient => row.recipient_id.clone(),
    };

    let ids: Vec<String> = rows.iter().map(side_id).collect();
    let profiles: HashMap<String, PublicProfile> = db
        .get_users_by_ids(&ids)?
        .iter()
        .map(|row| (row.id.clone(), profile_from_row(row)))
        .collect();

    let resolve = |id: Uuid, raw: &str| match profiles.get(raw) {
        Some(profile) => Participant::Profile(profile.clone()),
        None => Participant::Id(id),
    };

    Ok(rows
        .iter()
        .map(|row| {
            let request = request_from_row(row);
            let (sender, recipient) = match side {
                Side::Sender => (
                    resolve(request.sender, &row.sender_id),
                    Participant::Id(request.recipient),
                ),
                Side::Recipient => (
                    Participant::Id(request.sender),
                    resolve(request.recipient, &row.recipient_id),
                ),
            };
            FriendRequestView {
                id: request.id,
                sender,
                recipient,
                status: request.status,
                created_at: request.created_at,
                updated_at: request.updated_at,
            }
        })
        .collect())
}

fn users_with_friends(db: &Database, rows: Vec<UserRow>) -> Result<Vec<User>, ApiError> {
    let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();

    let mut friend_sets: HashMap<String, FriendSet> = HashMap::new();
    for f in db.get_friendships_for(&ids)? {
        friend_sets
            .entry(f.user_id)
            .or_default()
            .insert(parse_id(&f.friend_id, "friend_id"));
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let friends = friend_sets.remove(&row.id).unwrap_or_default();
            user_from_row(row, friends)
        })
        .collect())
}
