//! Configuration management for capq
//!
//! Strongly-typed configuration with TOML support. Everything a session
//! needs is passed in explicitly through [`Config`]; there is no global
//! capture state.

use crate::capture::OpenOptions;
use crate::error::{Error, Result};
use crate::filter::{FilterChain, FilterRule, NamedRule};
use crate::interface::InterfaceRequest;
use crate::strategies::DropPolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Capture source settings
    pub capture: CaptureConfig,

    /// Queue sizing and overflow policy
    pub queue: QueueConfig,

    /// Admission filters, evaluated in order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<FilterConfig>,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| Error::ConfigNotFound {
            path: path.display().to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(Error::from)
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(Error::from)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.queue.capacity == 0 {
            return Err(Error::config_value(
                "queue.capacity",
                "must be a positive integer",
            ));
        }

        if self.capture.snaplen == 0 {
            return Err(Error::config_value(
                "capture.snaplen",
                "must be at least 1 byte",
            ));
        }

        if self.capture.read_timeout_ms == 0 {
            return Err(Error::config_value(
                "capture.read_timeout_ms",
                "must be at least 1 ms",
            ));
        }

        let mut seen = HashSet::new();
        for (index, filter) in self.filters.iter().enumerate() {
            let key = format!("filters[{index}]");
            if filter.name.trim().is_empty() {
                return Err(Error::config_value(format!("{key}.name"), "must not be empty"));
            }
            if !seen.insert(filter.name.as_str()) {
                return Err(Error::config_value(
                    format!("{key}.name"),
                    format!("duplicate filter name '{}'", filter.name),
                ));
            }
            filter
                .rule
                .validate()
                .map_err(|msg| Error::config_value(format!("{key}.rule"), msg))?;
        }

        if !LoggingConfig::LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(Error::config_value(
                "logging.level",
                format!(
                    "unknown level '{}', expected one of {}",
                    self.logging.level,
                    LoggingConfig::LEVELS.join(", ")
                ),
            ));
        }

        Ok(())
    }

    /// Interface requested by the configuration, if any
    pub fn requested_interface(&self) -> Option<&InterfaceRequest> {
        self.capture.interface.as_ref()
    }

    /// Options for opening the capture stream
    pub fn open_options(&self) -> OpenOptions {
        OpenOptions {
            promiscuous: self.capture.promiscuous,
            snaplen: self.capture.snaplen,
            read_timeout: Duration::from_millis(self.capture.read_timeout_ms),
        }
    }

    /// Build the configured filter chain
    pub fn build_filters(&self) -> FilterChain {
        let mut chain = FilterChain::new();
        for filter in &self.filters {
            chain.add(NamedRule::new(filter.name.clone(), filter.rule.clone()));
        }
        chain
    }
}

/// Capture source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Interface to capture on (None = platform default)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interface: Option<InterfaceRequest>,
    /// Enable promiscuous mode
    pub promiscuous: bool,
    /// Maximum bytes kept per frame
    pub snaplen: usize,
    /// Capture read timeout in milliseconds
    pub read_timeout_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interface: None,
            promiscuous: true,
            snaplen: 65535,
            read_timeout_ms: 100,
        }
    }
}

/// Queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Fixed number of packet slots
    pub capacity: usize,
    /// Policy applied when every slot is occupied
    pub drop_strategy: DropPolicy,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: 4096,
            drop_strategy: DropPolicy::DropOldest,
        }
    }
}

/// One named admission filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Name shown in logs
    pub name: String,
    /// Match expression; packets that do not match are filtered out
    pub rule: FilterRule,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log file path (None = stderr only)
    pub file: Option<String>,
    /// Enable JSON format logging
    pub json_format: bool,
}

impl LoggingConfig {
    /// Accepted level names
    pub const LEVELS: [&'static str; 5] = ["trace", "debug", "info", "warn", "error"];
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            json_format: false,
        }
    }
}
