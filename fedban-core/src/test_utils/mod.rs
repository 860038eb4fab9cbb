//! Shared test helpers
//!
//! In-memory registry fixtures and a scriptable platform client for
//! exercising federation flows without a real chat platform.

use crate::config::FederationConfig;
use crate::core_federation::types::{ChatId, UserId};
use crate::core_federation::{FederationRegistry, FederationSqlStore};
use crate::core_platform::{ChatMemberStatus, PlatformClient, PlatformError, UserInfo, UserRef};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Scriptable in-memory platform client
///
/// Records every kick and unban it performs. Chats marked with
/// [`fail_chat`](MockPlatformClient::fail_chat) reject enforcement calls,
/// simulating chats the bot was removed from.
#[derive(Default)]
pub struct MockPlatformClient {
    state: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    failing_chats: HashSet<ChatId>,
    kicked: Vec<(ChatId, UserId)>,
    unbanned: Vec<(ChatId, UserId)>,
    users: HashMap<String, UserInfo>,
    statuses: HashMap<(ChatId, UserId), ChatMemberStatus>,
}

impl MockPlatformClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make enforcement calls against this chat fail
    pub fn fail_chat(&self, chat_id: ChatId) {
        self.state
            .lock()
            .expect("mock state poisoned")
            .failing_chats
            .insert(chat_id);
    }

    /// Register a user resolvable by textual reference
    pub fn add_user(&self, reference: &str, user: UserInfo) {
        self.state
            .lock()
            .expect("mock state poisoned")
            .users
            .insert(reference.to_string(), user);
    }

    /// Script the membership status for a (chat, user) pair
    pub fn set_chat_member(&self, chat_id: ChatId, user_id: UserId, status: ChatMemberStatus) {
        self.state
            .lock()
            .expect("mock state poisoned")
            .statuses
            .insert((chat_id, user_id), status);
    }

    /// Every successful kick so far
    pub fn kicked(&self) -> Vec<(ChatId, UserId)> {
        self.state.lock().expect("mock state poisoned").kicked.clone()
    }

    /// Every successful unban so far
    pub fn unbanned(&self) -> Vec<(ChatId, UserId)> {
        self.state
            .lock()
            .expect("mock state poisoned")
            .unbanned
            .clone()
    }
}

#[async_trait]
impl PlatformClient for MockPlatformClient {
    async fn resolve_user(&self, user: &UserRef) -> Result<UserInfo, PlatformError> {
        match user {
            UserRef::Resolved(info) => Ok(info.clone()),
            UserRef::Id(id) => Ok(UserInfo {
                id: *id,
                display_name: format!("user-{}", id),
                mention: format!("user-{}", id),
            }),
            UserRef::Reference(reference) => self
                .state
                .lock()
                .expect("mock state poisoned")
                .users
                .get(reference)
                .cloned()
                .ok_or_else(|| PlatformError::UserNotFound(reference.clone())),
        }
    }

    async fn kick_member(&self, chat_id: ChatId, user_id: UserId) -> Result<(), PlatformError> {
        let mut state = self.state.lock().expect("mock state poisoned");
        if state.failing_chats.contains(&chat_id) {
            return Err(PlatformError::ChatUnreachable(chat_id));
        }
        state.kicked.push((chat_id, user_id));
        Ok(())
    }

    async fn unban_member(&self, chat_id: ChatId, user_id: UserId) -> Result<(), PlatformError> {
        let mut state = self.state.lock().expect("mock state poisoned");
        if state.failing_chats.contains(&chat_id) {
            return Err(PlatformError::ChatUnreachable(chat_id));
        }
        state.unbanned.push((chat_id, user_id));
        Ok(())
    }

    async fn get_chat_member(
        &self,
        chat_id: ChatId,
        user_id: UserId,
    ) -> Result<ChatMemberStatus, PlatformError> {
        Ok(self
            .state
            .lock()
            .expect("mock state poisoned")
            .statuses
            .get(&(chat_id, user_id))
            .copied()
            .unwrap_or(ChatMemberStatus::Member))
    }
}

/// Federation settings used across tests: bot id 42, staff owner 1
pub fn test_federation_config() -> FederationConfig {
    FederationConfig {
        bot_id: 42,
        staff_owner: 1,
        ..FederationConfig::default()
    }
}

/// Registry over a fresh in-memory store and a mock platform
pub fn test_registry() -> (FederationRegistry, Arc<MockPlatformClient>) {
    let store = FederationSqlStore::memory().expect("in-memory store");
    let platform = MockPlatformClient::new();
    let registry = FederationRegistry::new(store, platform.clone(), &test_federation_config());
    (registry, platform)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_records_and_fails() {
        let platform = MockPlatformClient::new();
        platform.fail_chat(ChatId::new(5));

        platform
            .kick_member(ChatId::new(1), UserId::new(9))
            .await
            .unwrap();
        assert!(platform
            .kick_member(ChatId::new(5), UserId::new(9))
            .await
            .is_err());
        assert_eq!(platform.kicked(), vec![(ChatId::new(1), UserId::new(9))]);
    }

    #[tokio::test]
    async fn test_mock_resolves_ids_and_references() {
        let platform = MockPlatformClient::new();
        let resolved = platform
            .resolve_user(&UserRef::Id(UserId::new(7)))
            .await
            .unwrap();
        assert_eq!(resolved.id, UserId::new(7));

        assert!(platform
            .resolve_user(&UserRef::Reference("@missing".to_string()))
            .await
            .is_err());

        platform.add_user(
            "@someone",
            UserInfo {
                id: UserId::new(8),
                display_name: "Someone".to_string(),
                mention: "@someone".to_string(),
            },
        );
        let resolved = platform
            .resolve_user(&UserRef::Reference("@someone".to_string()))
            .await
            .unwrap();
        assert_eq!(resolved.id, UserId::new(8));
    }
}
