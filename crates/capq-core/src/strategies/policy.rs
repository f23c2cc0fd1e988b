//! Built-in drop policies

use super::{DropDecision, DropStrategy, QueueState};
use crate::packet::CapturedPacket;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Configurable overflow policy
///
/// Each variant always makes the matching [`DropDecision`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropPolicy {
    /// Discard the packet that did not fit
    DropIncoming,
    /// Favor fresh traffic: evict the longest-resident packet
    #[default]
    DropOldest,
    /// Evict the most recently queued packet
    DropNewestQueued,
    /// Refuse the packet and surface the refusal to the caller
    RejectAndSignal,
}

impl DropPolicy {
    /// All built-in policies
    pub const ALL: [DropPolicy; 4] = [
        DropPolicy::DropIncoming,
        DropPolicy::DropOldest,
        DropPolicy::DropNewestQueued,
        DropPolicy::RejectAndSignal,
    ];

    /// The decision this policy makes
    pub fn decision(self) -> DropDecision {
        match self {
            DropPolicy::DropIncoming => DropDecision::DropIncoming,
            DropPolicy::DropOldest => DropDecision::DropOldest,
            DropPolicy::DropNewestQueued => DropDecision::DropNewestQueued,
            DropPolicy::RejectAndSignal => DropDecision::RejectAndSignal,
        }
    }
}

impl DropStrategy for DropPolicy {
    fn name(&self) -> &'static str {
        self.decision().as_str()
    }

    fn on_overflow(&self, _state: &QueueState, _incoming: &CapturedPacket) -> DropDecision {
        self.decision()
    }
}

impl fmt::Display for DropPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DropPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        DropPolicy::ALL
            .into_iter()
            .find(|p| p.name() == normalized)
            .ok_or_else(|| {
                format!(
                    "unknown drop strategy '{}', expected one of: drop_incoming, drop_oldest, drop_newest_queued, reject_and_signal",
                    s
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_decisions() {
        let state = QueueState {
            capacity: 2,
            occupancy: 2,
            oldest_sequence: Some(0),
            newest_sequence: Some(1),
        };
        let packet = CapturedPacket::new(2, vec![0u8; 8]);

        for policy in DropPolicy::ALL {
            assert_eq!(policy.on_overflow(&state, &packet), policy.decision());
        }
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("drop-oldest".parse::<DropPolicy>().unwrap(), DropPolicy::DropOldest);
        assert_eq!(
            "Reject_And_Signal".parse::<DropPolicy>().unwrap(),
            DropPolicy::RejectAndSignal
        );
        assert!("drop_random".parse::<DropPolicy>().is_err());
    }

    #[test]
    fn test_policy_default_and_serde() {
        assert_eq!(DropPolicy::default(), DropPolicy::DropOldest);

        #[derive(Deserialize, Serialize)]
        struct Wrapper {
            policy: DropPolicy,
        }
        let w: Wrapper = toml::from_str("policy = \"drop_newest_queued\"").unwrap();
        assert_eq!(w.policy, DropPolicy::DropNewestQueued);
        let out = toml::to_string(&w).unwrap();
        assert!(out.contains("drop_newest_queued"));
    }
}
