//! SQLite-backed persistence for identities, rules, and sessions
//!
//! Runtime queries only; timestamps are stored as RFC-3339 text and boolean
//! flags as 0/1 integers.

mod rules;
mod sessions;
mod users;

pub use rules::RuleStore;
pub use sessions::SessionStore;
pub use users::{NewUser, ProfileUpdate, UserStore};

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use warden_core::{storage_error, WardenResult};

/// Connect to a SQLite database file, creating it (and parent directories)
/// if missing
pub async fn connect(database_url: &str) -> WardenResult<SqlitePool> {
    tracing::info!("Connecting to database: {}", database_url);

    let pool = if database_url.starts_with("sqlite:") && !database_url.contains(":memory:") {
        let db_path = database_url.strip_prefix("sqlite:").unwrap_or(database_url);

        if let Some(parent) = std::path::Path::new(db_path).parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    storage_error!(format!("Failed to create database directory: {}", e), "store")
                })?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);

        SqlitePool::connect_with(options)
            .await
            .map_err(|e| storage_error!(format!("Failed to connect to database: {}", e), "store"))?
    } else {
        connect_memory().await?
    };

    init_schema(&pool).await?;
    Ok(pool)
}

/// Connect to an in-memory SQLite database
///
/// The pool is pinned to a single connection: every sqlite `:memory:`
/// connection is its own database, so a multi-connection pool would scatter
/// writes across invisible databases.
pub async fn connect_memory() -> WardenResult<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .map_err(|e| {
            storage_error!(format!("Failed to open in-memory database: {}", e), "store")
        })?;

    init_schema(&pool).await?;
    Ok(pool)
}

/// Create all tables if they do not exist
pub async fn init_schema(pool: &SqlitePool) -> WardenResult<()> {
    let statements = [
        r#"
        CREATE TABLE IF NOT EXISTS roles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            description TEXT,
            created_at TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL UNIQUE,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            middle_name TEXT,
            password_hash TEXT NOT NULL,
            role_id INTEGER NOT NULL REFERENCES roles(id),
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS business_elements (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            description TEXT,
            endpoint TEXT,
            created_at TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS access_rules (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            role_id INTEGER NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
            element_id INTEGER NOT NULL REFERENCES business_elements(id) ON DELETE CASCADE,
            read INTEGER NOT NULL DEFAULT 0,
            read_all INTEGER NOT NULL DEFAULT 0,
            "create" INTEGER NOT NULL DEFAULT 0,
            "update" INTEGER NOT NULL DEFAULT 0,
            update_all INTEGER NOT NULL DEFAULT 0,
            "delete" INTEGER NOT NULL DEFAULT 0,
            delete_all INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(role_id, element_id)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            token TEXT NOT NULL UNIQUE,
            expires_at TEXT NOT NULL,
            created_at TEXT NOT NULL,
            ip_address TEXT,
            user_agent TEXT
        )
        "#,
    ];

    for statement in statements {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| storage_error!(format!("Failed to create schema: {}", e), "store"))?;
    }

    Ok(())
}

/// Parse an RFC-3339 timestamp column
///
/// Parse failures become storage errors rather than silent defaults so the
/// permission engine's fail-closed conversion can kick in.
pub(crate) fn parse_timestamp(value: &str) -> WardenResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| storage_error!(format!("Malformed timestamp '{}': {}", value, e), "store"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn schema_creation_is_idempotent() {
        let pool = connect_memory().await.unwrap();
        init_schema(&pool).await.unwrap();
        init_schema(&pool).await.unwrap();
    }

    #[test]
    fn timestamp_roundtrip() {
        let now = Utc::now();
        let parsed = parse_timestamp(&now.to_rfc3339()).unwrap();
        assert_eq!(parsed, now);
    }

    #[test]
    fn malformed_timestamp_is_an_error() {
        assert!(parse_timestamp("yesterday").is_err());
    }
}
