//! Capture source abstraction
//!
//! Raw packet capture is a host capability, not something this crate
//! implements. Sessions talk to it through [`CaptureBackend`]; the platform
//! crate provides the real one and [`MemoryBackend`] stands in for tests.

mod memory;

pub use memory::{MemoryBackend, OpenRecord};

use crate::error::Result;
use crate::interface::InterfaceId;
use bytes::Bytes;
use std::collections::BTreeSet;
use std::time::Duration;

/// Parameters for opening a capture stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenOptions {
    /// Put the interface into promiscuous mode
    pub promiscuous: bool,
    /// Maximum bytes kept per frame
    pub snaplen: usize,
    /// How long a read may wait before yielding `Ok(None)`
    pub read_timeout: Duration,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            promiscuous: true,
            snaplen: 65535,
            read_timeout: Duration::from_millis(100),
        }
    }
}

/// Host capture capability
#[cfg_attr(test, mockall::automock)]
pub trait CaptureBackend: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &'static str;

    /// Names of every interface the host exposes.
    ///
    /// Fails with [`Error::PermissionDenied`](crate::Error::PermissionDenied)
    /// when enumeration itself is not allowed.
    fn list_interfaces(&self) -> Result<BTreeSet<String>>;

    /// Interface to use when none was requested
    fn default_interface(&self) -> Option<String>;

    /// Start capturing on `interface`
    fn open(&self, interface: &InterfaceId, options: &OpenOptions) -> Result<Box<dyn PacketStream>>;
}

/// A live stream of frames from one interface
pub trait PacketStream: Send {
    /// Read the next frame.
    ///
    /// `Ok(None)` means the read timeout elapsed with nothing captured.
    /// Errors are terminal for the stream.
    fn next_frame(&mut self) -> Result<Option<Bytes>>;

    /// Release the underlying handle
    fn close(&mut self) {}
}
