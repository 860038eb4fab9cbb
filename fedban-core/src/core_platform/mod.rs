//! Chat platform client seam
//!
//! The registry never talks to the chat platform directly; it goes through
//! the [`PlatformClient`] trait so command handlers and tests can supply
//! their own transport.

use crate::core_federation::types::{ChatId, UserId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from platform calls
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Chat {0} is unreachable")]
    ChatUnreachable(ChatId),

    #[error("Platform request failed: {0}")]
    RequestFailed(String),
}

/// A resolved platform user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: UserId,
    pub display_name: String,
    pub mention: String,
}

/// A user reference as it arrives from a command
///
/// Commands may carry a textual mention, a raw numeric id, or an already
/// resolved user object. Resolution happens once at the boundary, before
/// registry logic runs.
#[derive(Debug, Clone)]
pub enum UserRef {
    /// Textual reference, e.g. "@someone"
    Reference(String),
    /// Raw numeric id
    Id(UserId),
    /// Already resolved
    Resolved(UserInfo),
}

/// Membership status of a user within a chat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatMemberStatus {
    Creator,
    Administrator,
    Member,
    Restricted,
    Left,
    Kicked,
}

/// Client for the chat platform
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Resolve a user reference to a full user record
    async fn resolve_user(&self, user: &UserRef) -> Result<UserInfo, PlatformError>;

    /// Kick (ban) a user from a chat
    async fn kick_member(&self, chat_id: ChatId, user_id: UserId) -> Result<(), PlatformError>;

    /// Lift a platform-level ban on a user in a chat
    async fn unban_member(&self, chat_id: ChatId, user_id: UserId) -> Result<(), PlatformError>;

    /// Get a user's membership status in a chat
    async fn get_chat_member(
        &self,
        chat_id: ChatId,
        user_id: UserId,
    ) -> Result<ChatMemberStatus, PlatformError>;
}

impl ChatMemberStatus {
    /// Whether this status carries chat-admin rights
    pub fn is_privileged(&self) -> bool {
        matches!(self, ChatMemberStatus::Creator | ChatMemberStatus::Administrator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_privileged_statuses() {
        assert!(ChatMemberStatus::Creator.is_privileged());
        assert!(ChatMemberStatus::Administrator.is_privileged());
        assert!(!ChatMemberStatus::Member.is_privileged());
        assert!(!ChatMemberStatus::Kicked.is_privileged());
    }
}
