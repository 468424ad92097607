//! Indexer configuration.

use std::str::FromStr;
use std::time::Duration;

use memo_vault_core::Address;
use thiserror::Error;

/// Environment variable holding the memo store contract address.
pub const ENV_MEMO_STORE_ADDRESS: &str = "MEMO_STORE_ADDRESS";
/// Optional override for [`IndexerConfig::max_block_range`].
pub const ENV_MAX_BLOCK_RANGE: &str = "INDEXER_MAX_BLOCK_RANGE";
/// Optional override for [`IndexerConfig::initial_lookback`].
pub const ENV_INITIAL_LOOKBACK: &str = "INDEXER_INITIAL_LOOKBACK";

/// Errors while loading configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Configuration for indexer runs.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Contract whose events are indexed.
    pub memo_store_address: Address,
    /// Most blocks covered by one log query.
    pub max_block_range: u64,
    /// Blocks behind the head an automatic run starts from without a checkpoint.
    pub initial_lookback: u64,
    /// How far back a manual run reaches without a checkpoint.
    pub manual_window: Duration,
    /// Minimum age of the last automatic run before `maybe_refresh` scans again.
    pub refresh_interval: Duration,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            memo_store_address: Address::ZERO,
            max_block_range: 5_000,
            initial_lookback: 2_000,
            manual_window: Duration::from_secs(24 * 60 * 60),
            refresh_interval: Duration::from_secs(2 * 60),
        }
    }
}

impl IndexerConfig {
    /// Defaults for the given contract.
    pub fn new(memo_store_address: Address) -> Self {
        Self {
            memo_store_address,
            ..Self::default()
        }
    }

    /// Load from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using `lookup` to resolve variable names.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let address = lookup(ENV_MEMO_STORE_ADDRESS)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing(ENV_MEMO_STORE_ADDRESS))?;
        let memo_store_address =
            Address::from_str(address.trim()).map_err(|e| ConfigError::Invalid {
                name: ENV_MEMO_STORE_ADDRESS,
                reason: e.to_string(),
            })?;

        let mut config = Self::new(memo_store_address);
        if let Some(raw) = lookup(ENV_MAX_BLOCK_RANGE) {
            config.max_block_range = parse_u64(ENV_MAX_BLOCK_RANGE, &raw)?;
        }
        if let Some(raw) = lookup(ENV_INITIAL_LOOKBACK) {
            config.initial_lookback = parse_u64(ENV_INITIAL_LOOKBACK, &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_block_range == 0 {
            return Err(ConfigError::Invalid {
                name: ENV_MAX_BLOCK_RANGE,
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_u64(name: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })
}
