use std::path::Path;
use std::time::Duration;

use clap::Args;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Database path must not be empty")]
    EmptyDatabasePath,

    #[error("Connection pool size must be at least 1")]
    EmptyPool,
}

/// Runtime configuration, read from flags with environment fallbacks.
///
/// Passed explicitly to whatever needs it; nothing in the ledger core reads
/// the environment on its own.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Database file path
    #[arg(short, long, global = true, env = "WALLETD_DATABASE", default_value = "walletd.db")]
    pub database: String,

    /// Maximum number of pooled database connections
    #[arg(long, global = true, env = "WALLETD_MAX_CONNECTIONS", default_value_t = 5)]
    pub max_connections: u32,

    /// Seconds to wait for a locked database before giving up
    #[arg(long, global = true, env = "WALLETD_BUSY_TIMEOUT_SECS", default_value_t = 5)]
    pub busy_timeout_secs: u64,

    /// Log filter directives (tracing EnvFilter syntax)
    #[arg(long, global = true, env = "WALLETD_LOG", default_value = "info,sqlx=warn")]
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: "walletd.db".to_string(),
            max_connections: 5,
            busy_timeout_secs: 5,
            log_filter: "info,sqlx=warn".to_string(),
        }
    }
}

impl Config {
    /// Default configuration pointing at a specific database file.
    pub fn for_path(path: impl AsRef<Path>) -> Self {
        Self {
            database: path.as_ref().to_string_lossy().into_owned(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.trim().is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }
        if self.max_connections == 0 {
            return Err(ConfigError::EmptyPool);
        }
        Ok(())
    }

    pub fn database_url(&self) -> String {
        format!("sqlite:{}", self.database)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_secs(self.busy_timeout_secs)
    }
}
