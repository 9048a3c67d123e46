use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use agora_core::store::{MemberRecord, MembershipStore, StoreResult};
use agora_types::models::Membership;

use crate::models::MembershipRow;
use crate::Database;

impl MembershipStore for Database {
    fn membership(&self, community_id: Uuid, user_id: Uuid) -> StoreResult<Option<Membership>> {
        self.with_conn(|conn| query_membership(conn, community_id, user_id))
    }

    fn insert_membership(&self, membership: &Membership) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO memberships (community_id, user_id, role, joined_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    membership.community_id.to_string(),
                    membership.user_id.to_string(),
                    membership.role.as_str(),
                    membership.joined_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }

    fn delete_membership(&self, community_id: Uuid, user_id: Uuid) -> StoreResult<()> {
        self.with_conn(|conn| {
            let deleted = conn.execute(
                "DELETE FROM memberships WHERE community_id = ?1 AND user_id = ?2",
                params![community_id.to_string(), user_id.to_string()],
            )?;
            if deleted == 0 {
                return Err(rusqlite::Error::QueryReturnedNoRows);
            }
            Ok(())
        })
    }

    fn community_members(&self, community_id: Uuid) -> StoreResult<Vec<MemberRecord>> {
        // LEFT JOIN users so members without a profile row still appear.
        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.community_id, m.user_id, m.role, m.joined_at,
                        u.display_name, u.avatar_url
                 FROM memberships m
                 LEFT JOIN users u ON m.user_id = u.id
                 WHERE m.community_id = ?1
                 ORDER BY m.joined_at ASC",
            )?;

            stmt.query_map([community_id.to_string()], |row| {
                Ok((
                    MembershipRow {
                        community_id: row.get(0)?,
                        user_id: row.get(1)?,
                        role: row.get(2)?,
                        joined_at: row.get(3)?,
                    },
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
        })?;

        Ok(rows
            .into_iter()
            .map(|(row, display_name, avatar_url)| MemberRecord {
                membership: row.into(),
                display_name,
                avatar_url,
            })
            .collect())
    }

    fn adjust_member_count(&self, community_id: Uuid, delta: i64) -> StoreResult<()> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE communities SET member_count = MAX(member_count + ?1, 0) WHERE id = ?2",
                params![delta, community_id.to_string()],
            )?;
            if updated == 0 {
                return Err(rusqlite::Error::QueryReturnedNoRows);
            }
            Ok(())
        })
    }
}

fn query_membership(
    conn: &Connection,
    community_id: Uuid,
    user_id: Uuid,
) -> rusqlite::Result<Option<Membership>> {
    let mut stmt = conn.prepare(
        "SELECT community_id, user_id, role, joined_at
         FROM memberships
         WHERE community_id = ?1 AND user_id = ?2",
    )?;

    let row = stmt
        .query_row(
            params![community_id.to_string(), user_id.to_string()],
            |row| {
                Ok(MembershipRow {
                    community_id: row.get(0)?,
                    user_id: row.get(1)?,
                    role: row.get(2)?,
                    joined_at: row.get(3)?,
                })
            },
        )
        .optional()?;

    Ok(row.map(Into::into))
}
