use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (users, friendships, friend requests)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id                  TEXT PRIMARY KEY,
                email               TEXT NOT NULL UNIQUE,
                password_hash       TEXT NOT NULL,
                full_name           TEXT NOT NULL,
                bio                 TEXT NOT NULL DEFAULT '',
                profile_pic         TEXT NOT NULL DEFAULT '',
                native_language     TEXT NOT NULL DEFAULT '',
                learning_language   TEXT NOT NULL DEFAULT '',
                location            TEXT NOT NULL DEFAULT '',
                is_onboarded        INTEGER NOT NULL DEFAULT 0,
                created_at          TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_users_onboarded ON users(is_onboarded);

            -- One row per (user, friend). Accepting a request writes both directions.
            CREATE TABLE friendships (
                user_id     TEXT NOT NULL REFERENCES users(id),
                friend_id   TEXT NOT NULL REFERENCES users(id),
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (user_id, friend_id)
            );

            -- pair_low/pair_high hold the two user ids in sorted order so the
            -- unique index covers the unordered pair.
            CREATE TABLE friend_requests (
                id              TEXT PRIMARY KEY,
                sender_id       TEXT NOT NULL REFERENCES users(id),
                recipient_id    TEXT NOT NULL REFERENCES users(id),
                status          TEXT NOT NULL DEFAULT 'pending'
                                CHECK (status IN ('pending', 'accepted')),
                pair_low        TEXT NOT NULL,
                pair_high       TEXT NOT NULL,
                created_at      TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at      TEXT NOT NULL DEFAULT (datetime('now')),
                CHECK (sender_id <> recipient_id),
                UNIQUE (pair_low, pair_high)
            );

            CREATE INDEX idx_friend_requests_recipient
                ON friend_requests(recipient_id, status);
            CREATE INDEX idx_friend_requests_sender
                ON friend_requests(sender_id, status);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
