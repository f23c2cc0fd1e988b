//! Capture interface resolution
//!
//! Validates a requested interface against the set the host exposes, or
//! picks the platform default when nothing was requested. Resolution happens
//! once, when a session is built.

use crate::capture::CaptureBackend;
use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, info};

/// Label used in diagnostics when the platform default could not be used
pub const PLATFORM_DEFAULT: &str = "<platform default>";

/// Name of a host network interface, validated at session construction
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterfaceId(String);

impl InterfaceId {
    /// Wrap a name without validating it
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Interface name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for InterfaceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Interface as it was requested in configuration
///
/// Configuration is untyped input, so a value that is not a name is kept
/// and reported at resolution time instead of failing the whole parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterfaceRequest {
    /// A name to look up
    Name(String),
    /// A non-string value; holds the type that was found
    Invalid(&'static str),
}

impl InterfaceRequest {
    /// Request a named interface
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// The requested name, if the value was a string
    pub fn as_name(&self) -> Option<&str> {
        match self {
            InterfaceRequest::Name(name) => Some(name),
            InterfaceRequest::Invalid(_) => None,
        }
    }
}

impl From<&str> for InterfaceRequest {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for InterfaceRequest {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl Serialize for InterfaceRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            InterfaceRequest::Name(name) => serializer.serialize_str(name),
            InterfaceRequest::Invalid(found) => {
                Err(serde::ser::Error::custom(format!("interface is a {found}, not a name")))
            }
        }
    }
}

impl<'de> Deserialize<'de> for InterfaceRequest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = toml::Value::deserialize(deserializer)?;
        Ok(match value {
            toml::Value::String(name) => InterfaceRequest::Name(name),
            other => InterfaceRequest::Invalid(other.type_str()),
        })
    }
}

/// Resolves the capture interface for a session
pub struct InterfaceResolver<'a> {
    backend: &'a dyn CaptureBackend,
}

impl<'a> InterfaceResolver<'a> {
    /// Create a resolver over a capture backend
    pub fn new(backend: &'a dyn CaptureBackend) -> Self {
        Self { backend }
    }

    /// Resolve `requested`, or the platform default when it is `None`
    pub fn resolve(&self, requested: Option<&InterfaceRequest>) -> Result<InterfaceId> {
        let available = self.backend.list_interfaces()?;
        debug!(
            backend = self.backend.name(),
            count = available.len(),
            "Enumerated interfaces"
        );

        let default = if requested.is_none() {
            self.backend.default_interface()
        } else {
            None
        };

        let id = resolve_from(requested, &available, default.as_deref())?;
        info!(interface = %id, "Resolved capture interface");
        Ok(id)
    }
}

/// Resolution rules, independent of any backend.
///
/// Checks run in a fixed order: an empty host set fails first, then the
/// requested value's type, then membership. Without a request the platform
/// default must itself be a member.
pub fn resolve_from(
    requested: Option<&InterfaceRequest>,
    available: &BTreeSet<String>,
    platform_default: Option<&str>,
) -> Result<InterfaceId> {
    if available.is_empty() {
        return Err(Error::NoInterfacesAvailable);
    }

    match requested {
        Some(InterfaceRequest::Invalid(found)) => Err(Error::InvalidInterfaceType { found: *found }),
        Some(InterfaceRequest::Name(name)) => {
            if available.contains(name) {
                Ok(InterfaceId::new(name.clone()))
            } else {
                Err(Error::interface_not_found(name.clone(), available))
            }
        }
        None => match platform_default {
            Some(name) if available.contains(name) => Ok(InterfaceId::new(name)),
            _ => Err(Error::interface_not_found(PLATFORM_DEFAULT, available)),
        },
    }
}
