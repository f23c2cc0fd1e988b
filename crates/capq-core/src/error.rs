//! Error types for capq-core
//!
//! Centralized error handling using `thiserror`. Construction-time failures
//! (interface resolution, configuration) are fatal to a session; per-packet
//! outcomes are reported through metrics instead.

use std::collections::BTreeSet;
use thiserror::Error;

/// Main error type for capq-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// The host reports no capture interfaces at all
    #[error("No network interfaces available for capture")]
    NoInterfacesAvailable,

    /// Interface enumeration or capture requires privileges we do not have
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The configured interface was not a name
    #[error("Interface must be a string name, got {found}")]
    InvalidInterfaceType {
        /// Type of the value that was supplied
        found: &'static str,
    },

    /// The requested interface is not one the host exposes
    #[error("Interface {requested} not found. Available interfaces: {}", join_names(.available))]
    InterfaceNotFound {
        /// Name that was asked for
        requested: String,
        /// Every interface the host reported
        available: BTreeSet<String>,
    },

    /// The queue refused a packet under the reject-and-signal policy
    #[error("Queue full: capacity {capacity} reached")]
    QueueFull {
        /// Fixed queue capacity
        capacity: usize,
    },

    /// The capture source failed while running
    #[error("Capture source failure: {0}")]
    CaptureSourceFailure(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidConfiguration {
        /// Configuration key
        key: String,
        /// Error message
        message: String,
    },

    /// Lifecycle operation called from the wrong session state
    #[error("Invalid session state: cannot go from {from} to {to}")]
    InvalidState {
        /// Current state
        from: &'static str,
        /// Requested state
        to: &'static str,
    },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// Path to the missing config file
        path: String,
    },

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an invalid configuration error
    pub fn config_value(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a capture source failure
    pub fn capture(message: impl Into<String>) -> Self {
        Self::CaptureSourceFailure(message.into())
    }

    /// Create an interface-not-found error
    pub fn interface_not_found(requested: impl Into<String>, available: &BTreeSet<String>) -> Self {
        Self::InterfaceNotFound {
            requested: requested.into(),
            available: available.clone(),
        }
    }

    /// Whether this error stops a session from ever capturing
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::QueueFull { .. })
    }
}

fn join_names(names: &BTreeSet<String>) -> String {
    names.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}
