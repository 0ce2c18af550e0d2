//! Identity store (credential storage side of the decision core)

use super::parse_timestamp;
use crate::models::User;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use warden_core::{storage_error, WardenResult};

/// New identity to insert
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
    pub password_hash: String,
    pub role_id: i64,
}

/// Partial profile update; absent fields keep their current value
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub middle_name: Option<String>,
}

/// SQLite-backed identity store
#[derive(Debug, Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

const USER_COLUMNS: &str = "u.id, u.email, u.first_name, u.last_name, u.middle_name, \
     u.password_hash, u.role_id, r.name AS role_name, u.is_active, u.created_at, u.updated_at";

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new identity and return it with its role joined in
    pub async fn create(&self, new_user: NewUser) -> WardenResult<User> {
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO users (email, first_name, last_name, middle_name, password_hash, \
             role_id, is_active, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?)",
        )
        .bind(&new_user.email)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(&new_user.middle_name)
        .bind(&new_user.password_hash)
        .bind(new_user.role_id)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| storage_error!(format!("Failed to create user: {}", e), "user_store"))?;

        let id = result.last_insert_rowid();
        self.find_by_id(id).await?.ok_or_else(|| {
            storage_error!(format!("User {} vanished after insert", id), "user_store")
        })
    }

    pub async fn find_by_id(&self, id: i64) -> WardenResult<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users u JOIN roles r ON r.id = u.role_id WHERE u.id = ?",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_error!(format!("Failed to fetch user: {}", e), "user_store"))?;

        row.map(|r| user_from_row(&r)).transpose()
    }

    pub async fn find_by_email(&self, email: &str) -> WardenResult<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users u JOIN roles r ON r.id = u.role_id WHERE u.email = ?",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_error!(format!("Failed to fetch user: {}", e), "user_store"))?;

        row.map(|r| user_from_row(&r)).transpose()
    }

    /// Apply a partial profile update and return the fresh record
    pub async fn update_profile(&self, id: i64, update: ProfileUpdate) -> WardenResult<User> {
        let current = self.find_by_id(id).await?.ok_or_else(|| {
            warden_core::not_found_error!(format!("user {}", id), "user_store")
        })?;

        let first_name = update.first_name.unwrap_or(current.first_name);
        let last_name = update.last_name.unwrap_or(current.last_name);
        let middle_name = update.middle_name.or(current.middle_name);

        sqlx::query(
            "UPDATE users SET first_name = ?, last_name = ?, middle_name = ?, updated_at = ? \
             WHERE id = ?",
        )
        .bind(&first_name)
        .bind(&last_name)
        .bind(&middle_name)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| storage_error!(format!("Failed to update profile: {}", e), "user_store"))?;

        self.find_by_id(id).await?.ok_or_else(|| {
            storage_error!(format!("User {} vanished after update", id), "user_store")
        })
    }

    /// Deactivate an identity and revoke all of its sessions in the same
    /// transaction, so no window exists where an old token still
    /// authenticates the deactivated account
    pub async fn deactivate(&self, id: i64) -> WardenResult<()> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            storage_error!(format!("Failed to begin transaction: {}", e), "user_store")
        })?;

        sqlx::query("UPDATE users SET is_active = 0, updated_at = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                storage_error!(format!("Failed to deactivate user: {}", e), "user_store")
            })?;

        sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                storage_error!(format!("Failed to revoke sessions: {}", e), "user_store")
            })?;

        tx.commit().await.map_err(|e| {
            storage_error!(format!("Failed to commit deactivation: {}", e), "user_store")
        })?;

        tracing::info!(user_id = id, "Deactivated user and revoked all sessions");
        Ok(())
    }

    /// Number of users referencing a role; used to refuse role deletion
    pub async fn count_by_role(&self, role_id: i64) -> WardenResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM users WHERE role_id = ?")
            .bind(role_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| storage_error!(format!("Failed to count users: {}", e), "user_store"))?;

        row.try_get("n")
            .map_err(|e| storage_error!(format!("Failed to read count: {}", e), "user_store"))
    }
}

fn user_from_row(row: &SqliteRow) -> WardenResult<User> {
    let created_at: String = row
        .try_get("created_at")
        .map_err(|e| storage_error!(format!("Missing created_at: {}", e), "user_store"))?;
    let updated_at: String = row
        .try_get("updated_at")
        .map_err(|e| storage_error!(format!("Missing updated_at: {}", e), "user_store"))?;

    Ok(User {
        id: row
            .try_get("id")
            .map_err(|e| storage_error!(format!("Missing id: {}", e), "user_store"))?,
        email: row
            .try_get("email")
            .map_err(|e| storage_error!(format!("Missing email: {}", e), "user_store"))?,
        first_name: row.try_get("first_name").unwrap_or_default(),
        last_name: row.try_get("last_name").unwrap_or_default(),
        middle_name: row.try_get("middle_name").unwrap_or(None),
        password_hash: row
            .try_get("password_hash")
            .map_err(|e| storage_error!(format!("Missing password_hash: {}", e), "user_store"))?,
        role_id: row
            .try_get("role_id")
            .map_err(|e| storage_error!(format!("Missing role_id: {}", e), "user_store"))?,
        role_name: row
            .try_get("role_name")
            .map_err(|e| storage_error!(format!("Missing role_name: {}", e), "user_store"))?,
        is_active: row.try_get::<i64, _>("is_active").unwrap_or(0) != 0,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}
