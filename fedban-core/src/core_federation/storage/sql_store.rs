//! SQL-based storage for federations
//!
//! One federation is one logical document: a row in `federations` hydrated
//! with its admin, chat, and ban join tables. Writes replace the whole
//! document; callers serialize read-modify-write sequences through the
//! registry's write lock.

use super::super::federation::{BanRecord, Federation};
use super::super::types::{ChatId, FedId, Timestamp, UserId};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use thiserror::Error;

/// Storage layer errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Database error: {0}")]
    Sql(#[from] rusqlite::Error),
}

/// A ban entry found when scanning all federations for a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanSummary {
    pub fed_id: FedId,
    pub fed_name: String,
    pub reason: String,
}

/// SQL-backed federation store
pub struct FederationSqlStore {
    pool: Pool<SqliteConnectionManager>,
}

impl FederationSqlStore {
    /// Create a new store over an existing connection pool
    pub fn new(pool: Pool<SqliteConnectionManager>) -> Result<Self, StoreError> {
        super::migrations::migrate(&pool)?;
        Ok(Self { pool })
    }

    /// Open an on-disk store at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let manager = SqliteConnectionManager::file(path)
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = Pool::new(manager).map_err(|e| StoreError::Pool(e.to_string()))?;
        Self::new(pool)
    }

    /// Create an in-memory store (for testing)
    ///
    /// A single-connection pool: each sqlite in-memory connection is its own
    /// database, so the pool must never hand out a second one.
    pub fn memory() -> Result<Self, StoreError> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| StoreError::Pool(e.to_string()))?;
        Self::new(pool)
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, StoreError> {
        self.pool.get().map_err(|e| StoreError::Pool(e.to_string()))
    }

    /// Insert a new federation document
    pub fn insert(&self, fed: &Federation) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;

        tx.execute(
            "INSERT INTO federations (id, name, owner_id, created_at) VALUES (?, ?, ?, ?)",
            params![
                fed.id.as_str(),
                &fed.name,
                fed.owner.0,
                fed.created_at.as_millis() as i64,
            ],
        )?;
        Self::insert_joins(&tx, fed)?;

        tx.commit()?;
        Ok(())
    }

    /// Replace an existing federation document in full
    pub fn replace(&self, fed: &Federation) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;

        tx.execute(
            "UPDATE federations SET name = ?, owner_id = ? WHERE id = ?",
            params![&fed.name, fed.owner.0, fed.id.as_str()],
        )?;
        tx.execute("DELETE FROM fed_admins WHERE fed_id = ?", params![fed.id.as_str()])?;
        tx.execute("DELETE FROM fed_chats WHERE fed_id = ?", params![fed.id.as_str()])?;
        tx.execute("DELETE FROM fed_bans WHERE fed_id = ?", params![fed.id.as_str()])?;
        Self::insert_joins(&tx, fed)?;

        tx.commit()?;
        Ok(())
    }

    fn insert_joins(tx: &rusqlite::Transaction<'_>, fed: &Federation) -> Result<(), StoreError> {
        for admin in &fed.admins {
            tx.execute(
                "INSERT INTO fed_admins (fed_id, user_id) VALUES (?, ?)",
                params![fed.id.as_str(), admin.0],
            )?;
        }
        for chat in &fed.chats {
            tx.execute(
                "INSERT INTO fed_chats (chat_id, fed_id, joined_at) VALUES (?, ?, ?)",
                params![chat.0, fed.id.as_str(), Timestamp::now().as_millis() as i64],
            )?;
        }
        for (user_id, ban) in &fed.banned {
            tx.execute(
                "INSERT INTO fed_bans (fed_id, user_id, display_name, reason, banned_at)
                 VALUES (?, ?, ?, ?, ?)",
                params![
                    fed.id.as_str(),
                    user_id.0,
                    &ban.name,
                    &ban.reason,
                    ban.banned_at.as_millis() as i64,
                ],
            )?;
        }
        Ok(())
    }

    /// Get a federation by id
    pub fn get_by_id(&self, fed_id: &FedId) -> Result<Option<Federation>, StoreError> {
        let conn = self.conn()?;

        let base = conn
            .query_row(
                "SELECT id, name, owner_id, created_at FROM federations WHERE id = ?",
                params![fed_id.as_str()],
                |row| {
                    Ok(Federation {
                        id: FedId::new(row.get(0)?),
                        name: row.get(1)?,
                        owner: UserId::new(row.get(2)?),
                        admins: HashSet::new(),
                        chats: HashSet::new(),
                        banned: HashMap::new(),
                        created_at: Timestamp::from_millis(row.get::<_, i64>(3)?.max(0) as u64),
                    })
                },
            )
            .optional()?;

        let Some(mut fed) = base else {
            return Ok(None);
        };

        let mut stmt = conn.prepare("SELECT user_id FROM fed_admins WHERE fed_id = ?")?;
        fed.admins = stmt
            .query_map(params![fed_id.as_str()], |row| Ok(UserId::new(row.get(0)?)))?
            .collect::<Result<HashSet<_>, _>>()?;

        let mut stmt = conn.prepare("SELECT chat_id FROM fed_chats WHERE fed_id = ?")?;
        fed.chats = stmt
            .query_map(params![fed_id.as_str()], |row| Ok(ChatId::new(row.get(0)?)))?
            .collect::<Result<HashSet<_>, _>>()?;

        let mut stmt = conn.prepare(
            "SELECT user_id, display_name, reason, banned_at FROM fed_bans WHERE fed_id = ?",
        )?;
        fed.banned = stmt
            .query_map(params![fed_id.as_str()], |row| {
                Ok((
                    UserId::new(row.get(0)?),
                    BanRecord {
                        name: row.get(1)?,
                        reason: row.get(2)?,
                        banned_at: Timestamp::from_millis(row.get::<_, i64>(3)?.max(0) as u64),
                    },
                ))
            })?
            .collect::<Result<HashMap<_, _>, _>>()?;

        Ok(Some(fed))
    }

    /// Get the (at most one) federation a chat is bound to
    pub fn get_by_chat(&self, chat_id: ChatId) -> Result<Option<Federation>, StoreError> {
        let fed_id = {
            let conn = self.conn()?;
            conn.query_row(
                "SELECT fed_id FROM fed_chats WHERE chat_id = ?",
                params![chat_id.0],
                |row| row.get::<_, String>(0),
            )
            .optional()?
        };

        match fed_id {
            Some(id) => self.get_by_id(&FedId::new(id)),
            None => Ok(None),
        }
    }

    /// Check whether a chat is bound to any federation
    pub fn chat_is_bound(&self, chat_id: ChatId) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM fed_chats WHERE chat_id = ?",
            params![chat_id.0],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Delete a federation document, reporting whether it existed
    pub fn delete(&self, fed_id: &FedId) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "DELETE FROM federations WHERE id = ?",
            params![fed_id.as_str()],
        )?;
        Ok(rows > 0)
    }

    /// Find every federation that currently bans the given user
    ///
    /// Served by the fed_bans(user_id) index; no full federation scan.
    pub fn bans_for_user(&self, user_id: UserId) -> Result<Vec<BanSummary>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT f.id, f.name, b.reason
             FROM fed_bans b JOIN federations f ON f.id = b.fed_id
             WHERE b.user_id = ?
             ORDER BY f.name",
        )?;
        let entries = stmt
            .query_map(params![user_id.0], |row| {
                Ok(BanSummary {
                    fed_id: FedId::new(row.get(0)?),
                    fed_name: row.get(1)?,
                    reason: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Rewrite a chat id in place, for platform-side group id migrations
    ///
    /// Returns whether any binding was updated.
    pub fn migrate_chat(&self, old_chat_id: ChatId, new_chat_id: ChatId) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "UPDATE fed_chats SET chat_id = ? WHERE chat_id = ?",
            params![new_chat_id.0, old_chat_id.0],
        )?;
        Ok(rows > 0)
    }
}
