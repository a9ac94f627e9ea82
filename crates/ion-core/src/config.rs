//! # Relay Configuration
//!
//! Tunables for a [`ChainRegistry`](crate::registry::ChainRegistry) instance.

use crate::types::chain::ChainId;
use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Blocks between Clique checkpoints on most public Clique networks.
pub const DEFAULT_CLIQUE_EPOCH_LENGTH: u64 = 30_000;

/// Default upper bound on headers accepted by a single batch submission.
pub const DEFAULT_MAX_BATCH_LEN: usize = 256;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid config JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Relay configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// The id of the chain hosting this relay. Registering it is refused.
    pub home_chain_id: ChainId,

    /// Clique checkpoint interval. Headers at multiples of it carry the full
    /// signer list and reset pending votes.
    pub clique_epoch_length: u64,

    /// Maximum headers in one `submit_blocks` call.
    pub max_batch_len: usize,

    /// Enforce the Clique rule that a signer may not seal again within
    /// `floor(n/2)` blocks.
    pub enforce_recent_signers: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            home_chain_id: B256::ZERO,
            clique_epoch_length: DEFAULT_CLIQUE_EPOCH_LENGTH,
            max_batch_len: DEFAULT_MAX_BATCH_LEN,
            enforce_recent_signers: true,
        }
    }
}

impl RelayConfig {
    /// Create a config for testing (smaller values).
    pub fn for_testing() -> Self {
        Self {
            home_chain_id: B256::repeat_byte(0xee),
            clique_epoch_length: 8,
            max_batch_len: 16,
            enforce_recent_signers: true,
        }
    }

    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.clique_epoch_length == 0 {
            return Err(ConfigError::InvalidValue {
                field: "clique_epoch_length",
                reason: "must be greater than zero".into(),
            });
        }
        if self.max_batch_len == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_batch_len",
                reason: "must be greater than zero".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RelayConfig::default();
        assert_eq!(config.clique_epoch_length, 30_000);
        assert_eq!(config.home_chain_id, B256::ZERO);
        assert!(config.enforce_recent_signers);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_testing_config() {
        let config = RelayConfig::for_testing();
        assert_eq!(config.clique_epoch_length, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = RelayConfig::from_json(r#"{ "max_batch_len": 4 }"#).unwrap();
        assert_eq!(config.max_batch_len, 4);
        assert_eq!(config.clique_epoch_length, DEFAULT_CLIQUE_EPOCH_LENGTH);
    }

    #[test]
    fn test_from_json_rejects_zero_epoch() {
        let result = RelayConfig::from_json(r#"{ "clique_epoch_length": 0 }"#);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { field: "clique_epoch_length", .. })
        ));
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            RelayConfig::from_json("not json"),
            Err(ConfigError::InvalidJson(_))
        ));
    }
}
