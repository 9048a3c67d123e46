use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use agora_core::store::{CommunityStore, StoreResult};
use agora_types::models::{Community, CommunityPost};

use crate::models::{CommunityRow, PostRow};
use crate::Database;

impl CommunityStore for Database {
    fn community(&self, id: Uuid) -> StoreResult<Option<Community>> {
        self.with_conn(|conn| query_community(conn, id))
    }

    fn communities(&self) -> StoreResult<Vec<Community>> {
        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, description, category, color, creator_id, member_count, created_at
                 FROM communities
                 ORDER BY created_at ASC",
            )?;
            stmt.query_map([], community_row)?
                .collect::<rusqlite::Result<Vec<_>>>()
        })?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    fn insert_community(&self, community: &Community) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO communities
                    (id, name, description, category, color, creator_id, member_count, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    community.id.to_string(),
                    community.name,
                    community.description,
                    community.category,
                    community.color,
                    community.creator_id.to_string(),
                    community.member_count,
                    community.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }

    fn delete_community(&self, id: Uuid) -> StoreResult<()> {
        self.with_conn(|conn| {
            let deleted = conn.execute(
                "DELETE FROM communities WHERE id = ?1",
                [id.to_string()],
            )?;
            if deleted == 0 {
                return Err(rusqlite::Error::QueryReturnedNoRows);
            }
            Ok(())
        })
    }

    fn delete_community_memberships(&self, community_id: Uuid) -> StoreResult<usize> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM memberships WHERE community_id = ?1",
                [community_id.to_string()],
            )
        })
    }

    fn delete_community_posts(&self, community_id: Uuid) -> StoreResult<usize> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM community_posts WHERE community_id = ?1",
                [community_id.to_string()],
            )
        })
    }
}

// Post pass-through. These stay off the store contracts: posts carry no
// invariants beyond the ownership checks done at the handler.
impl Database {
    pub fn insert_post(&self, post: &CommunityPost) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO community_posts (id, community_id, author_id, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    post.id.to_string(),
                    post.community_id.to_string(),
                    post.author_id.to_string(),
                    post.content,
                    post.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }

    pub fn community_posts(&self, community_id: Uuid, limit: u32) -> StoreResult<Vec<CommunityPost>> {
        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.id, p.community_id, p.author_id, u.display_name, p.content, p.created_at
                 FROM community_posts p
                 LEFT JOIN users u ON p.author_id = u.id
                 WHERE p.community_id = ?1
                 ORDER BY p.created_at DESC
                 LIMIT ?2",
            )?;

            stmt.query_map(params![community_id.to_string(), limit], |row| {
                Ok(PostRow {
                    id: row.get(0)?,
                    community_id: row.get(1)?,
                    author_id: row.get(2)?,
                    author_name: row.get(3)?,
                    content: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

fn query_community(conn: &Connection, id: Uuid) -> rusqlite::Result<Option<Community>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, description, category, color, creator_id, member_count, created_at
         FROM communities
         WHERE id = ?1",
    )?;

    let row = stmt
        .query_row([id.to_string()], community_row)
        .optional()?;

    Ok(row.map(Into::into))
}

fn community_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CommunityRow> {
    Ok(CommunityRow {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        color: row.get(4)?,
        creator_id: row.get(5)?,
        member_count: row.get(6)?,
        created_at: row.get(7)?,
    })
}
