//! Configuration types for nbsync
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Shortest interval the engine accepts between two runs
pub const MIN_SYNC_INTERVAL: Duration = Duration::from_secs(1);

/// Main sync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Zone apex all peer domains must belong to (e.g. "example.com")
    pub zone_domain: String,

    /// Record store configuration
    pub store: StoreConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl SyncConfig {
    /// Create a configuration for `zone_domain` with default engine settings
    pub fn new(zone_domain: impl Into<String>, store: StoreConfig) -> Self {
        Self {
            zone_domain: zone_domain.into(),
            store,
            engine: EngineConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        validate_domain_name(&self.zone_domain)?;
        self.store.validate()?;
        self.engine.validate()?;
        Ok(())
    }
}

/// Record store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// Cloudflare API v4
    Cloudflare {
        /// Cloudflare API token with Zone:Read and DNS:Edit permissions
        api_token: String,
        /// Perform reads but only log mutations
        #[serde(default)]
        dry_run: bool,
    },

    /// In-process store, nothing leaves the process
    Memory,
}

impl StoreConfig {
    /// Validate the store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            StoreConfig::Cloudflare { api_token, .. } => {
                if api_token.is_empty() {
                    return Err(crate::Error::config("Cloudflare API token cannot be empty"));
                }
                Ok(())
            }
            StoreConfig::Memory => Ok(()),
        }
    }

    /// Get the store type name used for registry lookup
    pub fn type_name(&self) -> &'static str {
        match self {
            StoreConfig::Cloudflare { .. } => "cloudflare",
            StoreConfig::Memory => "memory",
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Time between the start of one run and the next
    #[serde(default = "default_interval")]
    pub interval: Duration,

    /// Capacity of the engine event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.interval < MIN_SYNC_INTERVAL {
            return Err(crate::Error::config(format!(
                "sync interval must be at least {:?}, got {:?}",
                MIN_SYNC_INTERVAL, self.interval
            )));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("event channel capacity must be > 0"));
        }
        Ok(())
    }

    /// Set the interval between runs
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_interval() -> Duration {
    Duration::from_secs(15 * 60)
}

fn default_event_channel_capacity() -> usize {
    1000
}

/// Validate that a string is a valid domain name
///
/// Basic RFC 1035 checks: total length, label length, characters and
/// hyphen placement. Not comprehensive, but catches common mistakes in
/// configured zone names.
pub fn validate_domain_name(domain: &str) -> Result<(), crate::Error> {
    if domain.is_empty() {
        return Err(crate::Error::config("Domain name cannot be empty"));
    }

    if domain.len() > 253 {
        return Err(crate::Error::config(format!(
            "Domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        )));
    }

    for label in domain.split('.') {
        if label.is_empty() {
            return Err(crate::Error::config(format!(
                "Domain name has empty label: '{}'",
                domain
            )));
        }

        if label.len() > 63 {
            return Err(crate::Error::config(format!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            )));
        }

        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(crate::Error::config(format!(
                "Domain label contains invalid characters. Label: '{}'. \
                Valid: alphanumeric and hyphen only.",
                label
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(crate::Error::config(format!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            )));
        }
    }

    Ok(())
}
