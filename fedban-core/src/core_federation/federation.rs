//! Federation data structures and operations

use super::error::FederationError;
use super::types::{ChatId, FedId, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A federation is a named group of chats sharing one ban list
///
/// The owner is fixed at creation and never transfers; admins are delegated
/// by the owner and may ban/unban but not change the admin set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Federation {
    /// Unique identifier, immutable
    pub id: FedId,

    /// Human-readable name, set at creation (no rename operation exists)
    pub name: String,

    /// Owner of the federation (highest authority, immutable)
    pub owner: UserId,

    /// Delegated admins; never contains the owner
    pub admins: HashSet<UserId>,

    /// Chats currently bound to this federation
    pub chats: HashSet<ChatId>,

    /// Banned users, keyed by user id; presence means currently banned
    pub banned: HashMap<UserId, BanRecord>,

    /// When the federation was created
    pub created_at: Timestamp,
}

/// Metadata attached to a federation ban
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BanRecord {
    /// Display name of the banned user at ban time
    pub name: String,

    /// Reason given by the banning admin
    pub reason: String,

    /// When the ban was issued
    pub banned_at: Timestamp,
}

/// Summary counts for a federation, for info surfaces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FederationInfo {
    pub id: FedId,
    pub name: String,
    pub owner: UserId,
    pub admin_count: usize,
    pub chat_count: usize,
    pub ban_count: usize,
}

impl Federation {
    /// Create a new federation with empty admins/chats/ban list
    pub fn new(id: FedId, name: String, owner: UserId) -> Self {
        Federation {
            id,
            name,
            owner,
            admins: HashSet::new(),
            chats: HashSet::new(),
            banned: HashMap::new(),
            created_at: Timestamp::now(),
        }
    }

    /// Check if a user is the owner or a delegated admin
    pub fn is_admin(&self, user_id: UserId) -> bool {
        user_id == self.owner || self.admins.contains(&user_id)
    }

    /// Promote a user to admin
    ///
    /// The owner can never appear in the admin set.
    pub fn add_admin(&mut self, user_id: UserId) -> Result<(), FederationError> {
        if user_id == self.owner {
            return Err(FederationError::AlreadyOwner);
        }
        if !self.admins.insert(user_id) {
            return Err(FederationError::AlreadyAdmin);
        }
        Ok(())
    }

    /// Demote an admin back to plain member
    pub fn remove_admin(&mut self, user_id: UserId) -> Result<(), FederationError> {
        if user_id == self.owner {
            return Err(FederationError::AlreadyOwner);
        }
        if !self.admins.remove(&user_id) {
            return Err(FederationError::NotAdmin);
        }
        Ok(())
    }

    /// Bind a chat to this federation
    pub fn add_chat(&mut self, chat_id: ChatId) -> Result<(), FederationError> {
        if !self.chats.insert(chat_id) {
            return Err(FederationError::AlreadyBound);
        }
        Ok(())
    }

    /// Unbind a chat from this federation
    pub fn remove_chat(&mut self, chat_id: ChatId) -> Result<(), FederationError> {
        if !self.chats.remove(&chat_id) {
            return Err(FederationError::NotBound);
        }
        Ok(())
    }

    /// Upsert a ban entry, returning the previous record if one existed
    pub fn apply_ban(&mut self, user_id: UserId, record: BanRecord) -> Option<BanRecord> {
        self.banned.insert(user_id, record)
    }

    /// Remove a ban entry
    pub fn remove_ban(&mut self, user_id: UserId) -> Result<BanRecord, FederationError> {
        self.banned.remove(&user_id).ok_or(FederationError::NotBanned)
    }

    /// Check if a user is currently banned
    pub fn is_banned(&self, user_id: UserId) -> bool {
        self.banned.contains_key(&user_id)
    }

    /// Summary counts for info surfaces
    pub fn info(&self) -> FederationInfo {
        FederationInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            owner: self.owner,
            admin_count: self.admins.len(),
            chat_count: self.chats.len(),
            ban_count: self.banned.len(),
        }
    }
}
