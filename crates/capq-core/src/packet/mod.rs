//! Captured packet representation
//!
//! A [`CapturedPacket`] is an opaque frame plus the bookkeeping the
//! ingestion pipeline needs: an ingestion timestamp and a per-session
//! sequence number. Header classification is computed lazily, once, the
//! first time a filter asks for it.

mod builder;
mod classify;
mod types;

pub use builder::FrameBuilder;
pub use classify::classify;
pub use types::{PacketSummary, Protocol, ProtocolTags};

use bytes::Bytes;
use std::sync::OnceLock;
use std::time::SystemTime;

/// A frame pulled from a capture source
#[derive(Debug, Clone)]
pub struct CapturedPacket {
    sequence: u64,
    timestamp: SystemTime,
    data: Bytes,
    summary: OnceLock<PacketSummary>,
}

impl CapturedPacket {
    /// Wrap a frame, stamping it with the current time
    pub fn new(sequence: u64, data: impl Into<Bytes>) -> Self {
        Self::with_timestamp(sequence, SystemTime::now(), data)
    }

    /// Wrap a frame with an explicit ingestion time
    pub fn with_timestamp(sequence: u64, timestamp: SystemTime, data: impl Into<Bytes>) -> Self {
        Self {
            sequence,
            timestamp,
            data: data.into(),
            summary: OnceLock::new(),
        }
    }

    /// Per-session sequence number, assigned at capture time
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Ingestion timestamp
    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    /// Raw frame bytes
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Take ownership of the frame bytes
    pub fn into_data(self) -> Bytes {
        self.data
    }

    /// Frame length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the frame is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Header-level classification of the frame
    pub fn summary(&self) -> &PacketSummary {
        self.summary.get_or_init(|| classify(&self.data))
    }

    /// Protocol layers present in the frame
    pub fn protocols(&self) -> ProtocolTags {
        self.summary().tags
    }
}
