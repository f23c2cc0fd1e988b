//! Overflow drop strategies
//!
//! Pluggable policies consulted by the queue when a packet arrives and every
//! slot is occupied. Each strategy implements the [`DropStrategy`] trait; the
//! built-in ones are the variants of [`DropPolicy`].

mod policy;

pub use policy::DropPolicy;

use crate::packet::CapturedPacket;
use std::fmt;

/// What the queue should do with an overflowing enqueue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropDecision {
    /// Discard the incoming packet; queue contents unchanged
    DropIncoming,
    /// Evict the longest-resident packet, then admit the incoming one
    DropOldest,
    /// Evict the most recently queued packet, then admit the incoming one
    DropNewestQueued,
    /// Refuse the incoming packet and hand it back to the caller
    RejectAndSignal,
}

impl DropDecision {
    /// Whether executing this decision discards a packet
    pub fn discards(self) -> bool {
        !matches!(self, DropDecision::RejectAndSignal)
    }

    /// Decision name for logging
    pub fn as_str(self) -> &'static str {
        match self {
            DropDecision::DropIncoming => "drop_incoming",
            DropDecision::DropOldest => "drop_oldest",
            DropDecision::DropNewestQueued => "drop_newest_queued",
            DropDecision::RejectAndSignal => "reject_and_signal",
        }
    }
}

impl fmt::Display for DropDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Queue state handed to a strategy at overflow time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueState {
    /// Fixed capacity
    pub capacity: usize,
    /// Packets currently resident
    pub occupancy: usize,
    /// Sequence number of the longest-resident packet
    pub oldest_sequence: Option<u64>,
    /// Sequence number of the most recently queued packet
    pub newest_sequence: Option<u64>,
}

impl QueueState {
    /// Whether every slot is occupied
    pub fn is_full(&self) -> bool {
        self.occupancy >= self.capacity
    }
}

/// Trait for overflow policies
///
/// A strategy only decides; the queue executes the decision under its lock,
/// so implementations never see a partially applied overflow.
pub trait DropStrategy: Send + Sync {
    /// Get the strategy name for logging/debugging
    fn name(&self) -> &'static str;

    /// Decide what to do with `incoming` given a full queue
    fn on_overflow(&self, state: &QueueState, incoming: &CapturedPacket) -> DropDecision;
}

impl fmt::Debug for dyn DropStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DropStrategy").field("name", &self.name()).finish()
    }
}
