//! Federation operation errors

use super::storage::StoreError;
use thiserror::Error;

/// Errors surfaced by federation operations
///
/// Each variant maps to a user-facing message template in the command layer;
/// the registry itself performs no retries.
#[derive(Debug, Error)]
pub enum FederationError {
    #[error("Federation not found")]
    NotFound,

    #[error("Permission denied")]
    Forbidden,

    #[error("Chat is already bound to a federation")]
    AlreadyBound,

    #[error("Chat is not bound to this federation")]
    NotBound,

    #[error("User is already an admin of this federation")]
    AlreadyAdmin,

    #[error("User is not an admin of this federation")]
    NotAdmin,

    #[error("User is the federation owner")]
    AlreadyOwner,

    #[error("Target user is protected and cannot be banned")]
    ProtectedTarget,

    #[error("Target user is an admin of this federation")]
    TargetIsFedAdmin,

    #[error("User is not banned in this federation")]
    NotBanned,

    #[error("Federation name must not be empty")]
    EmptyName,

    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}
