//! Storage layer for federations
//!
//! SQL-based persistence, one logical document per federation.

pub mod migrations;
pub mod sql_store;

pub use migrations::{migrate, CURRENT_FED_SCHEMA_VERSION};
pub use sql_store::{BanSummary, FederationSqlStore, StoreError};
