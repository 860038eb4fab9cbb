/*
    Federation Flow Integration Tests

    Exercises the federation registry end to end over an in-memory store
    and a mock platform client:
    - Federation lifecycle (create, info, delete)
    - Chat membership and the one-federation-per-chat rule
    - Admin hierarchy (owner vs admins vs outsiders)
    - Ban/unban flows, protected targets, and cross-chat enforcement
    - Ban lookups across multiple federations
*/

use std::sync::Arc;

use fedban_core::test_utils::{test_registry, MockPlatformClient};
use fedban_core::{ChatId, FederationError, FederationRegistry, PlatformClient, UserId};

const OWNER: UserId = UserId(100);
const ADMIN: UserId = UserId(200);
const OUTSIDER: UserId = UserId(300);
const SPAMMER: UserId = UserId(500);

async fn seeded_federation(
    registry: &FederationRegistry,
) -> (fedban_core::FedId, Vec<ChatId>) {
    let fed_id = registry
        .create_federation("Rust Chats", OWNER)
        .await
        .expect("create federation");
    let chats = vec![ChatId::new(-1001), ChatId::new(-1002), ChatId::new(-1003)];
    for chat in &chats {
        registry.join_federation(&fed_id, *chat).await.expect("join");
    }
    registry
        .promote_admin(&fed_id, OWNER, ADMIN)
        .await
        .expect("promote");
    (fed_id, chats)
}

#[tokio::test]
async fn full_ban_lifecycle_across_chats() {
    let (registry, platform) = test_registry();
    let (fed_id, chats) = seeded_federation(&registry).await;

    // Fresh ban, then update with a new reason
    let outcome = registry
        .ban_user(&fed_id, ADMIN, SPAMMER, "Spammer", "spam")
        .await
        .unwrap();
    assert!(!outcome.was_update);

    let outcome = registry
        .ban_user(&fed_id, OWNER, SPAMMER, "Spammer", "flooding")
        .await
        .unwrap();
    assert!(outcome.was_update);
    assert_eq!(outcome.previous_reason.as_deref(), Some("spam"));

    // Enforcement reaches every member chat
    let fed = registry.get_federation_by_id(&fed_id).await.unwrap().unwrap();
    let report = registry.propagate_ban(&fed, SPAMMER).await;
    assert!(report.is_clean());
    assert_eq!(report.total(), chats.len());

    let mut kicked: Vec<ChatId> = platform.kicked().into_iter().map(|(c, _)| c).collect();
    kicked.sort();
    let mut expected = chats.clone();
    expected.sort();
    assert_eq!(kicked, expected);

    // The ban is visible from any member chat's federation
    let from_chat = registry
        .get_federation_by_chat(chats[1])
        .await
        .unwrap()
        .unwrap();
    assert!(from_chat.is_banned(SPAMMER));
    assert_eq!(
        from_chat.banned.get(&SPAMMER).map(|b| b.reason.as_str()),
        Some("flooding")
    );

    // Unban clears the record and lifts platform bans everywhere
    registry.unban_user(&fed_id, ADMIN, SPAMMER).await.unwrap();
    let fed = registry.get_federation_by_id(&fed_id).await.unwrap().unwrap();
    assert!(!fed.is_banned(SPAMMER));

    let report = registry.propagate_unban(&fed, SPAMMER).await;
    assert!(report.is_clean());
    assert_eq!(platform.unbanned().len(), chats.len());
}

#[tokio::test]
async fn unreachable_chats_do_not_block_enforcement() {
    let (registry, platform) = test_registry();
    let (fed_id, chats) = seeded_federation(&registry).await;
    platform.fail_chat(chats[0]);

    registry
        .ban_user(&fed_id, OWNER, SPAMMER, "Spammer", "spam")
        .await
        .unwrap();
    let fed = registry.get_federation_by_id(&fed_id).await.unwrap().unwrap();
    let report = registry.propagate_ban(&fed, SPAMMER).await;

    assert_eq!(report.succeeded, chats.len() - 1);
    assert_eq!(report.failed_chats, vec![chats[0]]);

    // The record survives partial enforcement
    let fed = registry.get_federation_by_id(&fed_id).await.unwrap().unwrap();
    assert!(fed.is_banned(SPAMMER));
}

#[tokio::test]
async fn permission_boundaries() {
    let (registry, _) = test_registry();
    let (fed_id, chats) = seeded_federation(&registry).await;

    // Outsiders can do nothing
    assert!(matches!(
        registry.ban_user(&fed_id, OUTSIDER, SPAMMER, "S", "r").await,
        Err(FederationError::Forbidden)
    ));
    assert!(matches!(
        registry.promote_admin(&fed_id, OUTSIDER, SPAMMER).await,
        Err(FederationError::Forbidden)
    ));
    assert!(matches!(
        registry.delete_federation(&fed_id, OUTSIDER).await,
        Err(FederationError::Forbidden)
    ));

    // Admins ban but do not manage admins or delete
    assert!(registry
        .ban_user(&fed_id, ADMIN, SPAMMER, "Spammer", "spam")
        .await
        .is_ok());
    assert!(matches!(
        registry.promote_admin(&fed_id, ADMIN, OUTSIDER).await,
        Err(FederationError::Forbidden)
    ));
    assert!(matches!(
        registry.delete_federation(&fed_id, ADMIN).await,
        Err(FederationError::Forbidden)
    ));

    // Admins and the owner are ban-immune
    assert!(matches!(
        registry.ban_user(&fed_id, OWNER, ADMIN, "A", "r").await,
        Err(FederationError::TargetIsFedAdmin)
    ));
    assert!(matches!(
        registry.ban_user(&fed_id, ADMIN, OWNER, "O", "r").await,
        Err(FederationError::TargetIsFedAdmin)
    ));

    // Owner deletion purges everything, including chat bindings
    registry.delete_federation(&fed_id, OWNER).await.unwrap();
    assert!(registry
        .get_federation_by_chat(chats[0])
        .await
        .unwrap()
        .is_none());
    assert!(registry.list_bans_for_user(SPAMMER).await.unwrap().is_empty());
}

#[tokio::test]
async fn chat_can_only_back_one_federation() {
    let (registry, _) = test_registry();
    let fed_a = registry.create_federation("A", OWNER).await.unwrap();
    let fed_b = registry.create_federation("B", OUTSIDER).await.unwrap();
    let chat = ChatId::new(-1001);

    registry.join_federation(&fed_a, chat).await.unwrap();
    assert!(matches!(
        registry.join_federation(&fed_b, chat).await,
        Err(FederationError::AlreadyBound)
    ));

    // Leaving frees the chat for another federation
    registry.leave_federation(&fed_a, chat).await.unwrap();
    registry.join_federation(&fed_b, chat).await.unwrap();
    let bound = registry.get_federation_by_chat(chat).await.unwrap().unwrap();
    assert_eq!(bound.id, fed_b);
}

#[tokio::test]
async fn bans_are_listed_per_federation() {
    let (registry, _) = test_registry();
    let fed_a = registry.create_federation("Alpha", OWNER).await.unwrap();
    let fed_b = registry.create_federation("Beta", OUTSIDER).await.unwrap();

    registry
        .ban_user(&fed_a, OWNER, SPAMMER, "Spammer", "spam")
        .await
        .unwrap();
    registry
        .ban_user(&fed_b, OUTSIDER, SPAMMER, "Spammer", "flooding")
        .await
        .unwrap();

    let bans = registry.list_bans_for_user(SPAMMER).await.unwrap();
    assert_eq!(bans.len(), 2);
    // Ordered by federation name
    assert_eq!(bans[0].fed_name, "Alpha");
    assert_eq!(bans[0].reason, "spam");
    assert_eq!(bans[1].fed_name, "Beta");
    assert_eq!(bans[1].reason, "flooding");

    registry.unban_user(&fed_a, OWNER, SPAMMER).await.unwrap();
    let bans = registry.list_bans_for_user(SPAMMER).await.unwrap();
    assert_eq!(bans.len(), 1);
    assert_eq!(bans[0].fed_id, fed_b);
}

#[tokio::test]
async fn bans_persist_through_group_migration() {
    let (registry, platform) = test_registry();
    let (fed_id, chats) = seeded_federation(&registry).await;
    let upgraded = ChatId::new(-100999);

    registry
        .ban_user(&fed_id, OWNER, SPAMMER, "Spammer", "spam")
        .await
        .unwrap();
    assert!(registry.migrate_chat(chats[0], upgraded).await.unwrap());

    let fed = registry
        .get_federation_by_chat(upgraded)
        .await
        .unwrap()
        .unwrap();
    assert!(fed.is_banned(SPAMMER));

    // Fan-out now targets the new chat id
    let report = registry.propagate_ban(&fed, SPAMMER).await;
    assert!(report.is_clean());
    assert!(platform.kicked().iter().any(|(c, _)| *c == upgraded));
    assert!(!platform.kicked().iter().any(|(c, _)| *c == chats[0]));
}

#[tokio::test]
async fn concurrent_joins_respect_exclusivity() {
    let (registry, _) = test_registry();
    let registry = Arc::new(registry);
    let fed_a = registry.create_federation("A", OWNER).await.unwrap();
    let fed_b = registry.create_federation("B", OUTSIDER).await.unwrap();
    let chat = ChatId::new(-1001);

    let (ra, rb) = tokio::join!(
        registry.join_federation(&fed_a, chat),
        registry.join_federation(&fed_b, chat),
    );

    // Exactly one join wins regardless of interleaving
    assert_eq!(ra.is_ok() as u8 + rb.is_ok() as u8, 1);
    assert!(registry.get_federation_by_chat(chat).await.unwrap().is_some());
}

#[tokio::test]
async fn staff_owner_can_delete_any_federation() {
    let (registry, _) = test_registry();
    let fed_id = registry.create_federation("Rogue", OWNER).await.unwrap();

    // Staff owner id comes from the test fixture config
    let removed = registry
        .delete_federation(&fed_id, UserId::new(1))
        .await
        .unwrap();
    assert_eq!(removed.name, "Rogue");
    assert!(matches!(
        registry.delete_federation(&fed_id, OWNER).await,
        Err(FederationError::NotFound)
    ));
}

#[tokio::test]
async fn mock_platform_is_shared_between_handles() {
    let platform = MockPlatformClient::new();
    let handle = platform.clone();
    platform.fail_chat(ChatId::new(1));

    // Both handles observe the same scripted state
    assert!(handle
        .kick_member(ChatId::new(1), SPAMMER)
        .await
        .is_err());
}
