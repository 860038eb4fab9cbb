//! Federation management
//!
//! A federation groups chats behind a shared ban list. The owner manages
//! admins; admins manage bans; bans fan out to every member chat.

pub mod error;
pub mod federation;
pub mod propagation;
pub mod registry;
pub mod storage;
pub mod types;

pub use error::FederationError;
pub use federation::{BanRecord, Federation, FederationInfo};
pub use propagation::{EnforcementAction, PropagationReport};
pub use registry::{BanOutcome, FederationRegistry};
pub use storage::{BanSummary, FederationSqlStore, StoreError};
pub use types::{ChatId, FedId, Timestamp, UserId};
