//! Session store (revocation list for issued tokens)

use super::parse_timestamp;
use crate::models::Session;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use warden_core::{storage_error, WardenResult};

/// SQLite-backed session store
#[derive(Debug, Clone)]
pub struct SessionStore {
    pool: SqlitePool,
}

impl SessionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, session: &Session) -> WardenResult<()> {
        sqlx::query(
            "INSERT INTO sessions (id, user_id, token, expires_at, created_at, ip_address, \
             user_agent) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&session.id)
        .bind(session.user_id)
        .bind(&session.token)
        .bind(session.expires_at.to_rfc3339())
        .bind(session.created_at.to_rfc3339())
        .bind(&session.ip_address)
        .bind(&session.user_agent)
        .execute(&self.pool)
        .await
        .map_err(|e| storage_error!(format!("Failed to insert session: {}", e), "session_store"))?;

        Ok(())
    }

    pub async fn find_by_token(&self, token: &str) -> WardenResult<Option<Session>> {
        let row = sqlx::query("SELECT * FROM sessions WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                storage_error!(format!("Failed to fetch session: {}", e), "session_store")
            })?;

        row.as_ref().map(session_from_row).transpose()
    }

    /// Delete the session matching a token; a no-op when absent
    pub async fn delete_by_token(&self, token: &str) -> WardenResult<()> {
        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                storage_error!(format!("Failed to delete session: {}", e), "session_store")
            })?;
        Ok(())
    }

    /// Remaining sessions for a user; used by tests and admin diagnostics
    pub async fn count_for_user(&self, user_id: i64) -> WardenResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM sessions WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                storage_error!(format!("Failed to count sessions: {}", e), "session_store")
            })?;

        row.try_get("n")
            .map_err(|e| storage_error!(format!("Failed to read count: {}", e), "session_store"))
    }
}

fn session_from_row(row: &SqliteRow) -> WardenResult<Session> {
    let expires_at: String = row
        .try_get("expires_at")
        .map_err(|e| storage_error!(format!("Missing expires_at: {}", e), "session_store"))?;
    let created_at: String = row
        .try_get("created_at")
        .map_err(|e| storage_error!(format!("Missing created_at: {}", e), "session_store"))?;

    Ok(Session {
        id: row
            .try_get("id")
            .map_err(|e| storage_error!(format!("Missing id: {}", e), "session_store"))?,
        user_id: row
            .try_get("user_id")
            .map_err(|e| storage_error!(format!("Missing user_id: {}", e), "session_store"))?,
        token: row
            .try_get("token")
            .map_err(|e| storage_error!(format!("Missing token: {}", e), "session_store"))?,
        expires_at: parse_timestamp(&expires_at)?,
        created_at: parse_timestamp(&created_at)?,
        ip_address: row.try_get("ip_address").unwrap_or(None),
        user_agent: row.try_get("user_agent").unwrap_or(None),
    })
}
