//! Database migrations for federation storage
//!
//! Versioned migrations applied atomically and tracked in the
//! fed_schema_version table.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::time::{SystemTime, UNIX_EPOCH};

/// Current schema version for federation storage
pub const CURRENT_FED_SCHEMA_VERSION: i32 = 1;

/// Migration descriptor
pub struct Migration {
    pub version: i32,
    pub description: &'static str,
    pub up_sql: &'static str,
}

/// All available migrations in order
pub fn get_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial federation schema",
        up_sql: r#"
            -- Schema version tracking
            CREATE TABLE IF NOT EXISTS fed_schema_version (
                version INTEGER PRIMARY KEY,
                applied_at INTEGER NOT NULL
            );

            -- One row per federation
            CREATE TABLE IF NOT EXISTS federations (
                id TEXT PRIMARY KEY,                    -- FedId
                name TEXT NOT NULL,
                owner_id INTEGER NOT NULL,              -- UserId
                created_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_federations_owner ON federations(owner_id);

            -- Delegated admins (never contains the owner)
            CREATE TABLE IF NOT EXISTS fed_admins (
                fed_id TEXT NOT NULL,
                user_id INTEGER NOT NULL,
                PRIMARY KEY (fed_id, user_id),
                FOREIGN KEY (fed_id) REFERENCES federations(id) ON DELETE CASCADE
            );

            -- Chat bindings; the chat_id primary key enforces that a chat
            -- belongs to at most one federation
            CREATE TABLE IF NOT EXISTS fed_chats (
                chat_id INTEGER PRIMARY KEY,
                fed_id TEXT NOT NULL,
                joined_at INTEGER NOT NULL,
                FOREIGN KEY (fed_id) REFERENCES federations(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_fed_chats_fed ON fed_chats(fed_id);

            -- Ban entries, one per (federation, user)
            CREATE TABLE IF NOT EXISTS fed_bans (
                fed_id TEXT NOT NULL,
                user_id INTEGER NOT NULL,
                display_name TEXT NOT NULL,
                reason TEXT NOT NULL,
                banned_at INTEGER NOT NULL,
                PRIMARY KEY (fed_id, user_id),
                FOREIGN KEY (fed_id) REFERENCES federations(id) ON DELETE CASCADE
            );

            -- Indexed lookup of every federation that bans a given user
            CREATE INDEX IF NOT EXISTS idx_fed_bans_user ON fed_bans(user_id);
        "#,
    }]
}

/// Get current schema version from database
fn get_current_version(pool: &Pool<SqliteConnectionManager>) -> Result<i32, rusqlite::Error> {
    let conn = pool.get().map_err(|e| {
        rusqlite::Error::ToSqlConversionFailure(Box::new(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("Failed to get connection: {}", e),
        )))
    })?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS fed_schema_version (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let version: Result<i32, _> = conn.query_row(
        "SELECT version FROM fed_schema_version ORDER BY version DESC LIMIT 1",
        [],
        |row| row.get(0),
    );

    Ok(version.unwrap_or(0))
}

/// Run all pending migrations
pub fn migrate(pool: &Pool<SqliteConnectionManager>) -> Result<(), rusqlite::Error> {
    let current_version = get_current_version(pool)?;
    let pending: Vec<_> = get_migrations()
        .into_iter()
        .filter(|m| m.version > current_version)
        .collect();

    if pending.is_empty() {
        return Ok(());
    }

    let conn = pool.get().map_err(|e| {
        rusqlite::Error::ToSqlConversionFailure(Box::new(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("Failed to get connection: {}", e),
        )))
    })?;

    for migration in pending {
        let tx = conn.unchecked_transaction()?;

        tx.execute_batch(migration.up_sql)?;

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64;

        tx.execute(
            "INSERT INTO fed_schema_version (version, applied_at) VALUES (?, ?)",
            params![migration.version, now],
        )?;

        tx.commit()?;

        tracing::info!(
            version = migration.version,
            description = migration.description,
            "Applied federation schema migration"
        );
    }

    Ok(())
}
