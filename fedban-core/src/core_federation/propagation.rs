//! Ban propagation fan-out
//!
//! Applies a committed ban or unban to every chat bound to a federation.
//! The ban record itself is already durable before fan-out starts; this
//! module only drives the platform-side enforcement. A failing chat never
//! aborts the batch, and tasks already issued keep running even if the
//! caller's future is dropped.

use super::types::{ChatId, UserId};
use crate::core_platform::PlatformClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::warn;

/// What to apply to each member chat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnforcementAction {
    /// Kick the user out of the chat
    Kick,
    /// Lift the platform-level ban
    Unban,
}

/// Outcome of a fan-out pass over a federation's chats
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropagationReport {
    pub succeeded: usize,
    pub failed: usize,
    pub failed_chats: Vec<ChatId>,
}

impl PropagationReport {
    /// Whether every chat was enforced
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Apply an enforcement action to every chat, with bounded parallelism
///
/// Each per-chat call runs in its own spawned task behind a semaphore
/// permit, so in-flight calls complete even when the caller is cancelled.
/// Per-chat failures (including timeouts) are logged and counted, never
/// raised.
pub async fn fan_out(
    platform: Arc<dyn PlatformClient>,
    chats: Vec<ChatId>,
    user_id: UserId,
    action: EnforcementAction,
    max_parallel: usize,
    call_timeout: Duration,
) -> PropagationReport {
    let semaphore = Arc::new(Semaphore::new(max_parallel.max(1)));
    let mut handles = Vec::with_capacity(chats.len());

    for chat_id in chats {
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            // Semaphore is never closed; treat as a failed chat if it ever is.
            Err(_) => {
                handles.push((chat_id, None));
                continue;
            }
        };
        let client = platform.clone();
        let handle = tokio::spawn(async move {
            let _permit = permit;
            let call = async {
                match action {
                    EnforcementAction::Kick => client.kick_member(chat_id, user_id).await,
                    EnforcementAction::Unban => client.unban_member(chat_id, user_id).await,
                }
            };
            match tokio::time::timeout(call_timeout, call).await {
                Ok(result) => result.map_err(|e| e.to_string()),
                Err(_) => Err(format!("timed out after {:?}", call_timeout)),
            }
        });
        handles.push((chat_id, Some(handle)));
    }

    let mut report = PropagationReport::default();
    for (chat_id, handle) in handles {
        let outcome = match handle {
            Some(handle) => match handle.await {
                Ok(result) => result,
                Err(join_err) => Err(join_err.to_string()),
            },
            None => Err("semaphore closed".to_string()),
        };
        match outcome {
            Ok(()) => report.succeeded += 1,
            Err(error) => {
                warn!(chat_id = %chat_id, user_id = %user_id, %error,
                    "Federation enforcement failed for chat");
                report.failed += 1;
                report.failed_chats.push(chat_id);
            }
        }
    }

    report
}
