use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use agora_core::store::{ProfileStore, StoreResult};
use agora_types::models::UserProfile;

use crate::models::UserRow;
use crate::Database;

impl ProfileStore for Database {
    fn find_by_username(&self, username: &str) -> StoreResult<Option<UserProfile>> {
        let row = self.with_conn(|conn| query_user_by_username(conn, username))?;
        Ok(row.map(Into::into))
    }

    fn profile(&self, id: Uuid) -> StoreResult<Option<UserProfile>> {
        let row = self.with_conn(|conn| query_user_by_id(conn, &id.to_string()))?;
        Ok(row.map(Into::into))
    }
}

// Credential-bearing accessors for the auth handlers only; everything else
// goes through the ProfileStore contract above.
impl Database {
    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        password_hash: &str,
        display_name: &str,
        avatar_url: Option<&str>,
    ) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, password, display_name, avatar_url)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, username, password_hash, display_name, avatar_url],
            )?;
            Ok(())
        })
    }

    pub fn user_by_username(&self, username: &str) -> StoreResult<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }
}

fn query_user_by_username(conn: &Connection, username: &str) -> rusqlite::Result<Option<UserRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, username, password, display_name, avatar_url, created_at
         FROM users
         WHERE username = ?1",
    )?;

    stmt.query_row([username], user_row).optional()
}

fn query_user_by_id(conn: &Connection, id: &str) -> rusqlite::Result<Option<UserRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, username, password, display_name, avatar_url, created_at
         FROM users
         WHERE id = ?1",
    )?;

    stmt.query_row([id], user_row).optional()
}

fn user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        password: row.get(2)?,
        display_name: row.get(3)?,
        avatar_url: row.get(4)?,
        created_at: row.get(5)?,
    })
}
