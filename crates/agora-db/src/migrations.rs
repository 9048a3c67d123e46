use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id              TEXT PRIMARY KEY,
            username        TEXT NOT NULL UNIQUE,
            password        TEXT NOT NULL,
            display_name    TEXT NOT NULL,
            avatar_url      TEXT,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS communities (
            id              TEXT PRIMARY KEY,
            name            TEXT NOT NULL,
            description     TEXT NOT NULL DEFAULT '',
            category        TEXT NOT NULL DEFAULT '',
            color           TEXT NOT NULL DEFAULT '',
            creator_id      TEXT NOT NULL REFERENCES users(id),
            member_count    INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS memberships (
            community_id    TEXT NOT NULL REFERENCES communities(id),
            user_id         TEXT NOT NULL REFERENCES users(id),
            role            TEXT NOT NULL,
            joined_at       TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (community_id, user_id)
        );

        CREATE INDEX IF NOT EXISTS idx_memberships_user
            ON memberships(user_id);

        CREATE TABLE IF NOT EXISTS friend_requests (
            id              TEXT PRIMARY KEY,
            sender_id       TEXT NOT NULL REFERENCES users(id),
            receiver_id     TEXT NOT NULL REFERENCES users(id),
            status          TEXT NOT NULL DEFAULT 'pending',
            created_at      TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_friend_requests_receiver
            ON friend_requests(receiver_id, status);

        CREATE INDEX IF NOT EXISTS idx_friend_requests_sender
            ON friend_requests(sender_id, status);

        CREATE TABLE IF NOT EXISTS friendships (
            id              TEXT PRIMARY KEY,
            user1_id        TEXT NOT NULL REFERENCES users(id),
            user2_id        TEXT NOT NULL REFERENCES users(id),
            created_at      TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(user1_id, user2_id)
        );

        CREATE TABLE IF NOT EXISTS community_posts (
            id              TEXT PRIMARY KEY,
            community_id    TEXT NOT NULL REFERENCES communities(id),
            author_id       TEXT NOT NULL REFERENCES users(id),
            content         TEXT NOT NULL,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_posts_community
            ON community_posts(community_id, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
