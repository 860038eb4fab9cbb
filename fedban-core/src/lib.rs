//! Federation ban registry
//!
//! Federations group chats behind a shared ban list. A federation has one
//! owner, a set of admins, a set of member chats, and a ban table; banning a
//! user records the ban once and enforces it across every member chat.

pub mod config;
pub mod core_federation;
pub mod core_platform;
pub mod logging;
pub mod test_utils;

pub use config::{Config, ConfigError};
pub use core_federation::{
    BanOutcome, BanRecord, BanSummary, ChatId, EnforcementAction, FedId, Federation,
    FederationError, FederationInfo, FederationRegistry, FederationSqlStore, PropagationReport,
    Timestamp, UserId,
};
pub use core_platform::{PlatformClient, PlatformError, UserInfo, UserRef};
pub use logging::{init_logging, init_logging_with_config, LogConfig, LogLevel};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        // Ensure the main exports are accessible
        let _ = LogLevel::Info;
        let _ = UserId::new(1);
    }
}
