//! Configuration management for fedban
//!
//! This module provides environment-based configuration management with
//! support for defaults, file loading, and validation.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

mod error;

pub use error::ConfigError;

/// Telegram's anonymous-channel sender and group-anonymous-admin accounts.
/// Messages can arrive attributed to these ids; banning them would break
/// every channel-linked group in the federation.
pub const DEFAULT_SERVICE_ACCOUNTS: [i64; 2] = [777000, 1087968824];

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Store configuration
    pub store: StoreConfig,

    /// Federation configuration
    pub federation: FederationConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Data directory for persistent storage
    pub data_dir: PathBuf,
}

/// Federation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FederationConfig {
    /// The bot's own account id (never a valid ban target)
    pub bot_id: i64,

    /// Deployment owner id (may delete any federation, never bannable)
    pub staff_owner: i64,

    /// Additional staff ids (never bannable)
    pub staff: Vec<i64>,

    /// Platform service accounts (never bannable)
    pub service_accounts: Vec<i64>,

    /// Maximum concurrent per-chat enforcement calls during fan-out
    pub max_fanout: usize,

    /// Timeout for a single per-chat enforcement call
    #[serde(with = "humantime_serde")]
    pub kick_timeout: Duration,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON formatting
    pub json_format: bool,

    /// Include target module
    pub with_target: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            federation: FederationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
        }
    }
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            bot_id: 0,
            staff_owner: 0,
            staff: vec![],
            service_accounts: DEFAULT_SERVICE_ACCOUNTS.to_vec(),
            max_fanout: 8,
            kick_timeout: Duration::from_secs(10),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_target: true,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Environment variables follow the pattern: FEDBAN_<SECTION>_<KEY>
    /// Example: FEDBAN_FEDERATION_BOT_ID=123456789
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Store config
        if let Ok(data_dir) = env::var("FEDBAN_STORE_DATA_DIR") {
            config.store.data_dir = PathBuf::from(data_dir);
        }

        // Federation config
        if let Ok(bot_id) = env::var("FEDBAN_FEDERATION_BOT_ID") {
            config.federation.bot_id = bot_id
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid bot id: {}", e)))?;
        }
        if let Ok(staff_owner) = env::var("FEDBAN_FEDERATION_STAFF_OWNER") {
            config.federation.staff_owner = staff_owner
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid staff owner: {}", e)))?;
        }
        if let Ok(staff) = env::var("FEDBAN_FEDERATION_STAFF") {
            config.federation.staff = staff
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(|s| {
                    s.trim().parse().map_err(|e| {
                        ConfigError::InvalidValue(format!("Invalid staff id: {}", e))
                    })
                })
                .collect::<Result<_, _>>()?;
        }
        if let Ok(max_fanout) = env::var("FEDBAN_FEDERATION_MAX_FANOUT") {
            config.federation.max_fanout = max_fanout
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid max fanout: {}", e)))?;
        }
        if let Ok(timeout) = env::var("FEDBAN_FEDERATION_KICK_TIMEOUT_SECS") {
            let secs: u64 = timeout
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid kick timeout: {}", e)))?;
            config.federation.kick_timeout = Duration::from_secs(secs);
        }

        // Logging config
        if let Ok(level) = env::var("FEDBAN_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(json) = env::var("FEDBAN_LOG_JSON") {
            config.logging.json_format = json
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid JSON flag: {}", e)))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::FileReadError(e.to_string()))?;

        let config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.federation.max_fanout == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_fanout must be greater than 0".to_string(),
            ));
        }

        if self.federation.kick_timeout.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "kick_timeout must be greater than 0".to_string(),
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: impl AsRef<std::path::Path>) -> Result<(), ConfigError> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, contents).map_err(|e| ConfigError::FileWriteError(e.to_string()))?;

        Ok(())
    }
}
