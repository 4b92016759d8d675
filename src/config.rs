// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Registry configuration.
//!
//! Configuration is read from YAML (or JSON, chosen by file extension). Every field has
//! a default, so an empty file yields a working configuration:
//!
//! ```yaml
//! soa:
//!   refresh: 10800
//!   retry: 3600
//!   expire: 1814400
//!   ttl: 43200
//! network:
//!   reserved: 3
//!   maxUnusedList: 65536
//!   macScopeByVlan: true
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    DEFAULT_MAX_UNUSED_LIST, DEFAULT_NETWORK_RESERVED, DEFAULT_SOA_EXPIRE_SECS,
    DEFAULT_SOA_REFRESH_SECS, DEFAULT_SOA_RETRY_SECS, DEFAULT_ZONE_TTL_SECS, MAX_NETWORK_RESERVED,
    MAX_TTL_SECS,
};

/// Configuration error.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("File not found: {0}")]
    NotFound(PathBuf),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Top-level registry configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegistryConfig {
    /// SOA values applied to newly created zones
    pub soa: SoaDefaults,

    /// Network engine settings
    pub network: NetworkSettings,
}

/// SOA timer defaults for new zones, in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SoaDefaults {
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub ttl: u32,
}

impl Default for SoaDefaults {
    fn default() -> Self {
        Self {
            refresh: DEFAULT_SOA_REFRESH_SECS,
            retry: DEFAULT_SOA_RETRY_SECS,
            expire: DEFAULT_SOA_EXPIRE_SECS,
            ttl: DEFAULT_ZONE_TTL_SECS,
        }
    }
}

/// Network engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NetworkSettings {
    /// Number of low addresses reserved in a network created without an explicit count
    pub reserved: u32,

    /// Upper bound on the number of addresses an unused-address listing returns
    pub max_unused_list: usize,

    /// Scope MAC uniqueness by VLAN when the owning network carries one.
    ///
    /// When disabled every network is its own broadcast domain.
    pub mac_scope_by_vlan: bool,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            reserved: DEFAULT_NETWORK_RESERVED,
            max_unused_list: DEFAULT_MAX_UNUSED_LIST,
            mac_scope_by_vlan: true,
        }
    }
}

impl RegistryConfig {
    /// Loads configuration from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable or does not parse.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;

        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            _ => serde_yaml::from_str(&content)?,
        };

        Ok(config)
    }

    /// Parses configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the document does not parse.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        self.soa.validate()?;
        self.network.validate()?;
        Ok(())
    }
}

impl SoaDefaults {
    fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("soa.refresh", self.refresh),
            ("soa.retry", self.retry),
            ("soa.expire", self.expire),
            ("soa.ttl", self.ttl),
        ] {
            if value == 0 || value > MAX_TTL_SECS {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    message: format!("must be within 1..={MAX_TTL_SECS}"),
                });
            }
        }

        if self.retry > self.refresh {
            return Err(ConfigError::InvalidValue {
                field: "soa.retry".to_string(),
                message: "retry cannot be greater than refresh".to_string(),
            });
        }

        if self.expire <= self.refresh {
            return Err(ConfigError::InvalidValue {
                field: "soa.expire".to_string(),
                message: "expire must be greater than refresh".to_string(),
            });
        }

        Ok(())
    }
}

impl NetworkSettings {
    fn validate(&self) -> Result<()> {
        if self.reserved > MAX_NETWORK_RESERVED {
            return Err(ConfigError::InvalidValue {
                field: "network.reserved".to_string(),
                message: format!("must be at most {MAX_NETWORK_RESERVED}"),
            });
        }
        if self.max_unused_list == 0 {
            return Err(ConfigError::InvalidValue {
                field: "network.maxUnusedList".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}
