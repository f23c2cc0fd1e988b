//! Declarative filter rules
//!
//! Header-level match expressions that can be written in the configuration
//! file:
//!
//! ```toml
//! [[filters]]
//! name = "drop-udp"
//! rule = { not = { protocol = "udp" } }
//!
//! [[filters]]
//! name = "dns-or-https"
//! rule = { any = [{ port = 53 }, { port = 443 }] }
//! ```

use crate::packet::{CapturedPacket, Protocol};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// Inclusive frame length bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LengthRange {
    /// Smallest admitted length
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<usize>,
    /// Largest admitted length
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<usize>,
}

impl LengthRange {
    fn contains(&self, len: usize) -> bool {
        self.min.map_or(true, |min| len >= min) && self.max.map_or(true, |max| len <= max)
    }
}

/// Match expression over packet headers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterRule {
    /// Frame carries the protocol
    Protocol(Protocol),
    /// TCP/UDP source or destination port
    Port(u16),
    /// IP source or destination address
    Host(IpAddr),
    /// Frame length within bounds
    Length(LengthRange),
    /// Every sub-rule matches
    All(Vec<FilterRule>),
    /// At least one sub-rule matches
    Any(Vec<FilterRule>),
    /// Sub-rule does not match
    Not(Box<FilterRule>),
}

impl FilterRule {
    /// Negate a rule
    pub fn not(rule: FilterRule) -> Self {
        FilterRule::Not(Box::new(rule))
    }

    /// Evaluate against a packet
    pub fn matches(&self, packet: &CapturedPacket) -> bool {
        match self {
            FilterRule::Protocol(p) => packet.summary().has(*p),
            FilterRule::Port(port) => packet.summary().touches_port(*port),
            FilterRule::Host(addr) => packet.summary().touches_host(*addr),
            FilterRule::Length(range) => range.contains(packet.len()),
            FilterRule::All(rules) => rules.iter().all(|r| r.matches(packet)),
            FilterRule::Any(rules) => rules.iter().any(|r| r.matches(packet)),
            FilterRule::Not(rule) => !rule.matches(packet),
        }
    }

    /// Check the rule for values that can never be meaningful
    pub fn validate(&self) -> Result<(), String> {
        match self {
            FilterRule::Port(0) => Err("port must be in 1-65535".to_string()),
            FilterRule::Length(LengthRange {
                min: Some(min),
                max: Some(max),
            }) if min > max => Err(format!("length min {} exceeds max {}", min, max)),
            FilterRule::All(rules) | FilterRule::Any(rules) => {
                rules.iter().try_for_each(FilterRule::validate)
            }
            FilterRule::Not(rule) => rule.validate(),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for FilterRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, op: &str, rules: &[FilterRule]) -> fmt::Result {
            write!(f, "{}(", op)?;
            for (i, rule) in rules.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", rule)?;
            }
            f.write_str(")")
        }

        match self {
            FilterRule::Protocol(p) => write!(f, "{}", p),
            FilterRule::Port(port) => write!(f, "port {}", port),
            FilterRule::Host(addr) => write!(f, "host {}", addr),
            FilterRule::Length(range) => match (range.min, range.max) {
                (Some(min), Some(max)) => write!(f, "len {}..={}", min, max),
                (Some(min), None) => write!(f, "len >= {}", min),
                (None, Some(max)) => write!(f, "len <= {}", max),
                (None, None) => f.write_str("len any"),
            },
            FilterRule::All(rules) => join(f, "all", rules),
            FilterRule::Any(rules) => join(f, "any", rules),
            FilterRule::Not(rule) => write!(f, "not {}", rule),
        }
    }
}
