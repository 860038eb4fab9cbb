//! Federation registry service
//!
//! One instance owns the federation store and serializes every
//! read-modify-write sequence through a single write lock, so concurrent
//! command handlers cannot lose updates. Reads skip the lock. Fan-out to
//! member chats ([`propagation`](super::propagation)) never runs under the
//! lock: the ban record is committed first, then enforcement is driven
//! separately.

use super::error::FederationError;
use super::federation::{BanRecord, Federation, FederationInfo};
use super::propagation::{self, EnforcementAction, PropagationReport};
use super::storage::{BanSummary, FederationSqlStore};
use super::types::{ChatId, FedId, Timestamp, UserId};
use crate::config::FederationConfig;
use crate::core_platform::PlatformClient;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::info;

/// Result of a ban upsert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanOutcome {
    /// Whether this replaced an existing ban entry
    pub was_update: bool,
    /// The prior reason, when `was_update` is true
    pub previous_reason: Option<String>,
}

/// Registry of federations over a shared store
pub struct FederationRegistry {
    store: FederationSqlStore,
    platform: Arc<dyn PlatformClient>,

    bot_id: UserId,
    staff_owner: UserId,
    staff: HashSet<UserId>,
    service_accounts: HashSet<UserId>,

    max_fanout: usize,
    kick_timeout: Duration,

    /// Serializes all federation mutations on this instance
    write_lock: Mutex<()>,
}

impl FederationRegistry {
    pub fn new(
        store: FederationSqlStore,
        platform: Arc<dyn PlatformClient>,
        config: &FederationConfig,
    ) -> Self {
        Self {
            store,
            platform,
            bot_id: UserId::new(config.bot_id),
            staff_owner: UserId::new(config.staff_owner),
            staff: config.staff.iter().copied().map(UserId::new).collect(),
            service_accounts: config
                .service_accounts
                .iter()
                .copied()
                .map(UserId::new)
                .collect(),
            max_fanout: config.max_fanout,
            kick_timeout: config.kick_timeout,
            write_lock: Mutex::new(()),
        }
    }

    fn load(&self, fed_id: &FedId) -> Result<Federation, FederationError> {
        self.store
            .get_by_id(fed_id)?
            .ok_or(FederationError::NotFound)
    }

    /// Whether a user may never be fban targeted: the bot itself, global
    /// staff, or a platform service account.
    fn is_protected(&self, user_id: UserId) -> bool {
        user_id == self.bot_id
            || user_id == self.staff_owner
            || self.staff.contains(&user_id)
            || self.service_accounts.contains(&user_id)
    }

    /// Create a new federation owned by `owner_id`
    ///
    /// Caller policy decides where the command may be issued (private chats
    /// only); the registry only validates the name.
    pub async fn create_federation(
        &self,
        name: &str,
        owner_id: UserId,
    ) -> Result<FedId, FederationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(FederationError::EmptyName);
        }

        let _guard = self.write_lock.lock().await;
        let fed = Federation::new(FedId::generate(), name.to_string(), owner_id);
        self.store.insert(&fed)?;

        info!(fed_id = %fed.id, %owner_id, name, "Created federation");
        Ok(fed.id)
    }

    /// Delete a federation, returning the removed record
    ///
    /// Only the owner or the global staff owner may delete. A second delete
    /// of the same id fails with `NotFound`.
    pub async fn delete_federation(
        &self,
        fed_id: &FedId,
        requester_id: UserId,
    ) -> Result<Federation, FederationError> {
        let _guard = self.write_lock.lock().await;
        let fed = self.load(fed_id)?;

        if requester_id != fed.owner && requester_id != self.staff_owner {
            return Err(FederationError::Forbidden);
        }

        if !self.store.delete(fed_id)? {
            return Err(FederationError::NotFound);
        }

        info!(fed_id = %fed.id, %requester_id, "Deleted federation");
        Ok(fed)
    }

    /// Bind a chat to a federation
    ///
    /// A chat may belong to at most one federation, this one included.
    pub async fn join_federation(
        &self,
        fed_id: &FedId,
        chat_id: ChatId,
    ) -> Result<(), FederationError> {
        let _guard = self.write_lock.lock().await;
        let mut fed = self.load(fed_id)?;

        if self.store.chat_is_bound(chat_id)? {
            return Err(FederationError::AlreadyBound);
        }

        fed.add_chat(chat_id)?;
        self.store.replace(&fed)?;

        info!(fed_id = %fed.id, %chat_id, "Chat joined federation");
        Ok(())
    }

    /// Unbind a chat from a federation
    pub async fn leave_federation(
        &self,
        fed_id: &FedId,
        chat_id: ChatId,
    ) -> Result<(), FederationError> {
        let _guard = self.write_lock.lock().await;
        let mut fed = self.load(fed_id)?;

        fed.remove_chat(chat_id)?;
        self.store.replace(&fed)?;

        info!(fed_id = %fed.id, %chat_id, "Chat left federation");
        Ok(())
    }

    /// Promote a user to federation admin (owner only)
    pub async fn promote_admin(
        &self,
        fed_id: &FedId,
        requester_id: UserId,
        target_id: UserId,
    ) -> Result<(), FederationError> {
        let _guard = self.write_lock.lock().await;
        let mut fed = self.load(fed_id)?;

        if requester_id != fed.owner {
            return Err(FederationError::Forbidden);
        }

        fed.add_admin(target_id)?;
        self.store.replace(&fed)?;

        info!(fed_id = %fed.id, %target_id, "Promoted federation admin");
        Ok(())
    }

    /// Demote a federation admin (owner only)
    pub async fn demote_admin(
        &self,
        fed_id: &FedId,
        requester_id: UserId,
        target_id: UserId,
    ) -> Result<(), FederationError> {
        let _guard = self.write_lock.lock().await;
        let mut fed = self.load(fed_id)?;

        if requester_id != fed.owner {
            return Err(FederationError::Forbidden);
        }

        fed.remove_admin(target_id)?;
        self.store.replace(&fed)?;

        info!(fed_id = %fed.id, %target_id, "Demoted federation admin");
        Ok(())
    }

    /// Get a federation by id
    pub async fn get_federation_by_id(
        &self,
        fed_id: &FedId,
    ) -> Result<Option<Federation>, FederationError> {
        Ok(self.store.get_by_id(fed_id)?)
    }

    /// Get the (at most one) federation a chat is bound to
    pub async fn get_federation_by_chat(
        &self,
        chat_id: ChatId,
    ) -> Result<Option<Federation>, FederationError> {
        Ok(self.store.get_by_chat(chat_id)?)
    }

    /// Whether a user is the owner or an admin of a federation
    pub async fn is_federation_admin(
        &self,
        fed_id: &FedId,
        user_id: UserId,
    ) -> Result<bool, FederationError> {
        Ok(self.load(fed_id)?.is_admin(user_id))
    }

    /// Summary counts for a federation
    pub async fn federation_info(&self, fed_id: &FedId) -> Result<FederationInfo, FederationError> {
        Ok(self.load(fed_id)?.info())
    }

    /// List a federation's admins, owner first (fed admins only)
    pub async fn federation_admins(
        &self,
        fed_id: &FedId,
        requester_id: UserId,
    ) -> Result<Vec<UserId>, FederationError> {
        let fed = self.load(fed_id)?;
        if !fed.is_admin(requester_id) {
            return Err(FederationError::Forbidden);
        }

        let mut admins: Vec<UserId> = fed.admins.iter().copied().collect();
        admins.sort();
        let mut result = vec![fed.owner];
        result.extend(admins);
        Ok(result)
    }

    /// Record a federation ban (does not propagate)
    ///
    /// The actor must be a fed admin. The target may not be the bot, global
    /// staff, a platform service account, or an admin of this federation.
    /// Re-banning an already banned user updates the entry and reports the
    /// prior reason.
    pub async fn ban_user(
        &self,
        fed_id: &FedId,
        acting_admin_id: UserId,
        target_id: UserId,
        display_name: &str,
        reason: &str,
    ) -> Result<BanOutcome, FederationError> {
        let _guard = self.write_lock.lock().await;
        let mut fed = self.load(fed_id)?;

        if !fed.is_admin(acting_admin_id) {
            return Err(FederationError::Forbidden);
        }
        if self.is_protected(target_id) {
            return Err(FederationError::ProtectedTarget);
        }
        if fed.is_admin(target_id) {
            return Err(FederationError::TargetIsFedAdmin);
        }

        let previous = fed.apply_ban(
            target_id,
            BanRecord {
                name: display_name.to_string(),
                reason: reason.to_string(),
                banned_at: Timestamp::now(),
            },
        );
        self.store.replace(&fed)?;

        info!(
            fed_id = %fed.id,
            %acting_admin_id,
            %target_id,
            update = previous.is_some(),
            "Recorded federation ban"
        );
        Ok(BanOutcome {
            was_update: previous.is_some(),
            previous_reason: previous.map(|ban| ban.reason),
        })
    }

    /// Remove a federation ban (does not propagate)
    pub async fn unban_user(
        &self,
        fed_id: &FedId,
        acting_admin_id: UserId,
        target_id: UserId,
    ) -> Result<(), FederationError> {
        let _guard = self.write_lock.lock().await;
        let mut fed = self.load(fed_id)?;

        if !fed.is_admin(acting_admin_id) {
            return Err(FederationError::Forbidden);
        }

        fed.remove_ban(target_id)?;
        self.store.replace(&fed)?;

        info!(fed_id = %fed.id, %acting_admin_id, %target_id, "Removed federation ban");
        Ok(())
    }

    /// Every federation that currently bans the given user
    pub async fn list_bans_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<BanSummary>, FederationError> {
        Ok(self.store.bans_for_user(user_id)?)
    }

    /// Kick a banned user from every chat in the federation
    ///
    /// The ban record must already be committed; this drives enforcement
    /// only. Runs without the write lock.
    pub async fn propagate_ban(&self, fed: &Federation, user_id: UserId) -> PropagationReport {
        self.fan_out(fed, user_id, EnforcementAction::Kick).await
    }

    /// Lift the platform-level ban in every chat in the federation
    pub async fn propagate_unban(&self, fed: &Federation, user_id: UserId) -> PropagationReport {
        self.fan_out(fed, user_id, EnforcementAction::Unban).await
    }

    async fn fan_out(
        &self,
        fed: &Federation,
        user_id: UserId,
        action: EnforcementAction,
    ) -> PropagationReport {
        let chats: Vec<ChatId> = fed.chats.iter().copied().collect();
        let report = propagation::fan_out(
            self.platform.clone(),
            chats,
            user_id,
            action,
            self.max_fanout,
            self.kick_timeout,
        )
        .await;

        info!(
            fed_id = %fed.id,
            %user_id,
            ?action,
            succeeded = report.succeeded,
            failed = report.failed,
            "Propagated federation enforcement"
        );
        report
    }

    /// Rewrite a chat id after a platform-side group migration
    ///
    /// Returns whether any federation held the old id.
    pub async fn migrate_chat(
        &self,
        old_chat_id: ChatId,
        new_chat_id: ChatId,
    ) -> Result<bool, FederationError> {
        let _guard = self.write_lock.lock().await;
        let moved = self.store.migrate_chat(old_chat_id, new_chat_id)?;
        if moved {
            info!(%old_chat_id, %new_chat_id, "Migrated federation chat binding");
        }
        Ok(moved)
    }
}
