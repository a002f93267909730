use serde::{Deserialize, Serialize};

use crate::hasher::HashAlgorithm;

/// Configuration for the hashing and signing primitives.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// Hash primitive used for leaves, interior nodes and addresses.
    pub hash_algorithm: HashAlgorithm,
}

impl CryptoConfig {
    /// Parse a configuration from TOML. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// The configured hash primitive, ready to inject into a tree or wallet.
    pub fn hasher(&self) -> HashAlgorithm {
        self.hash_algorithm
    }
}

/// Errors from loading configuration.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(String),
}
