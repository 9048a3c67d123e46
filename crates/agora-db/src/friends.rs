use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use agora_core::store::{FriendStore, StoreResult};
use agora_types::models::{FriendRequest, Friendship, RequestStatus};

use crate::models::{FriendRequestRow, FriendshipRow};
use crate::Database;

impl FriendStore for Database {
    fn insert_request(&self, request: &FriendRequest) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO friend_requests
                    (id, sender_id, receiver_id, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    request.id.to_string(),
                    request.sender_id.to_string(),
                    request.receiver_id.to_string(),
                    request.status.as_str(),
                    request.created_at.to_rfc3339(),
                    request.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }

    fn request_between(&self, a: Uuid, b: Uuid) -> StoreResult<Option<FriendRequest>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, sender_id, receiver_id, status, created_at, updated_at
                 FROM friend_requests
                 WHERE (sender_id = ?1 AND receiver_id = ?2)
                    OR (sender_id = ?2 AND receiver_id = ?1)
                 LIMIT 1",
            )?;
            let row = stmt
                .query_row(params![a.to_string(), b.to_string()], request_row)
                .optional()?;
            Ok(row.map(Into::into))
        })
    }

    fn pending_request_from(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
    ) -> StoreResult<Option<FriendRequest>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, sender_id, receiver_id, status, created_at, updated_at
                 FROM friend_requests
                 WHERE sender_id = ?1 AND receiver_id = ?2 AND status = 'pending'",
            )?;
            let row = stmt
                .query_row(
                    params![sender_id.to_string(), receiver_id.to_string()],
                    request_row,
                )
                .optional()?;
            Ok(row.map(Into::into))
        })
    }

    fn transition_request(
        &self,
        id: Uuid,
        receiver_id: Uuid,
        from: RequestStatus,
        to: RequestStatus,
    ) -> StoreResult<FriendRequest> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE friend_requests
                 SET status = ?1, updated_at = ?2
                 WHERE id = ?3 AND receiver_id = ?4 AND status = ?5",
                params![
                    to.as_str(),
                    Utc::now().to_rfc3339(),
                    id.to_string(),
                    receiver_id.to_string(),
                    from.as_str(),
                ],
            )?;
            if updated == 0 {
                return Err(rusqlite::Error::QueryReturnedNoRows);
            }
            query_request(conn, id).map(Into::into)
        })
    }

    fn delete_request(&self, id: Uuid, sender_id: Uuid) -> StoreResult<()> {
        self.with_conn(|conn| {
            let deleted = conn.execute(
                "DELETE FROM friend_requests
                 WHERE id = ?1 AND sender_id = ?2 AND status = 'pending'",
                params![id.to_string(), sender_id.to_string()],
            )?;
            if deleted == 0 {
                return Err(rusqlite::Error::QueryReturnedNoRows);
            }
            Ok(())
        })
    }

    fn pending_requests_for(&self, user_id: Uuid) -> StoreResult<Vec<FriendRequest>> {
        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, sender_id, receiver_id, status, created_at, updated_at
                 FROM friend_requests
                 WHERE status = 'pending' AND (sender_id = ?1 OR receiver_id = ?1)
                 ORDER BY created_at ASC",
            )?;
            stmt.query_map([user_id.to_string()], request_row)?
                .collect::<rusqlite::Result<Vec<_>>>()
        })?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    fn insert_friendship(&self, friendship: &Friendship) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO friendships (id, user1_id, user2_id, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    friendship.id.to_string(),
                    friendship.user1_id.to_string(),
                    friendship.user2_id.to_string(),
                    friendship.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }

    fn friendship_between(&self, a: Uuid, b: Uuid) -> StoreResult<Option<Friendship>> {
        // Rows are stored canonically ordered, but check both orderings
        // anyway; the lookup must not depend on that invariant.
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user1_id, user2_id, created_at
                 FROM friendships
                 WHERE (user1_id = ?1 AND user2_id = ?2)
                    OR (user1_id = ?2 AND user2_id = ?1)",
            )?;
            let row = stmt
                .query_row(params![a.to_string(), b.to_string()], friendship_row)
                .optional()?;
            Ok(row.map(Into::into))
        })
    }

    fn friendships_of(&self, user_id: Uuid) -> StoreResult<Vec<Friendship>> {
        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user1_id, user2_id, created_at
                 FROM friendships
                 WHERE user1_id = ?1 OR user2_id = ?1
                 ORDER BY created_at ASC",
            )?;
            stmt.query_map([user_id.to_string()], friendship_row)?
                .collect::<rusqlite::Result<Vec<_>>>()
        })?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

fn query_request(conn: &Connection, id: Uuid) -> rusqlite::Result<FriendRequestRow> {
    let mut stmt = conn.prepare(
        "SELECT id, sender_id, receiver_id, status, created_at, updated_at
         FROM friend_requests
         WHERE id = ?1",
    )?;
    stmt.query_row([id.to_string()], request_row)
}

fn request_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<FriendRequestRow> {
    Ok(FriendRequestRow {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        receiver_id: row.get(2)?,
        status: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn friendship_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<FriendshipRow> {
    Ok(FriendshipRow {
        id: row.get(0)?,
        user1_id: row.get(1)?,
        user2_id: row.get(2)?,
        created_at: row.get(3)?,
    })
}
