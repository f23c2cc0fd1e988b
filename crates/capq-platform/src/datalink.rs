//! Live capture through pnet datalink channels
//!
//! Opens an Ethernet channel on a host interface and hands raw frames to
//! the capture session. Requires root or CAP_NET_RAW on Linux.

use std::collections::BTreeSet;
use std::io;

use bytes::Bytes;
use capq_core::{CaptureBackend, InterfaceId, OpenOptions, PacketStream};
use pnet::datalink::{self, Channel, DataLinkReceiver};
use tracing::{debug, info, instrument, warn};

use crate::error::PlatformError;
use crate::interfaces::{interface_details, pick_default};

/// Host capture backend
#[derive(Debug, Default, Clone, Copy)]
pub struct PnetBackend;

impl PnetBackend {
    /// Create the backend
    pub fn new() -> Self {
        PnetBackend
    }
}

impl CaptureBackend for PnetBackend {
    fn name(&self) -> &'static str {
        "pnet"
    }

    fn list_interfaces(&self) -> capq_core::Result<BTreeSet<String>> {
        Ok(datalink::interfaces().into_iter().map(|iface| iface.name).collect())
    }

    fn default_interface(&self) -> Option<String> {
        pick_default(&interface_details()).map(|iface| iface.name.clone())
    }

    #[instrument(skip(self, options), fields(promiscuous = options.promiscuous))]
    fn open(
        &self,
        interface: &InterfaceId,
        options: &OpenOptions,
    ) -> capq_core::Result<Box<dyn PacketStream>> {
        let iface = datalink::interfaces()
            .into_iter()
            .find(|iface| iface.name == interface.as_str())
            .ok_or_else(|| PlatformError::InterfaceNotFound(interface.to_string()))?;

        let config = datalink::Config {
            read_timeout: Some(options.read_timeout),
            promiscuous: options.promiscuous,
            ..Default::default()
        };

        let rx = match datalink::channel(&iface, config) {
            Ok(Channel::Ethernet(_tx, rx)) => rx,
            Ok(_) => return Err(PlatformError::UnsupportedChannel(iface.name).into()),
            Err(e) => return Err(PlatformError::from_open(&iface.name, &e).into()),
        };

        info!(interface = %iface.name, snaplen = options.snaplen, "Datalink channel open");

        Ok(Box::new(PnetStream {
            interface: iface.name,
            rx: Some(rx),
            snaplen: options.snaplen,
        }))
    }
}

/// Receive half of an open Ethernet channel
pub struct PnetStream {
    interface: String,
    rx: Option<Box<dyn DataLinkReceiver>>,
    snaplen: usize,
}

impl PacketStream for PnetStream {
    fn next_frame(&mut self) -> capq_core::Result<Option<Bytes>> {
        let Some(rx) = self.rx.as_mut() else {
            return Err(PlatformError::CaptureError(format!("{} is closed", self.interface)).into());
        };

        match rx.next() {
            Ok(frame) => {
                let len = frame.len().min(self.snaplen);
                Ok(Some(Bytes::copy_from_slice(&frame[..len])))
            }
            Err(e) if is_idle(&e) => Ok(None),
            Err(e) => {
                warn!(interface = %self.interface, error = %e, "Datalink read failed");
                Err(PlatformError::CaptureError(format!("{}: {e}", self.interface)).into())
            }
        }
    }

    fn close(&mut self) {
        if self.rx.take().is_some() {
            debug!(interface = %self.interface, "Datalink channel closed");
        }
    }
}

/// Read timeouts are how the producer gets to re-check its stop flag
fn is_idle(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_errors() {
        assert!(is_idle(&io::Error::from(io::ErrorKind::TimedOut)));
        assert!(is_idle(&io::Error::from(io::ErrorKind::WouldBlock)));
        assert!(!is_idle(&io::Error::from(io::ErrorKind::BrokenPipe)));
    }

    #[test]
    fn test_open_unknown_interface() {
        let backend = PnetBackend::new();
        let err = backend
            .open(&InterfaceId::new("capq-does-not-exist0"), &OpenOptions::default())
            .err()
            .expect("unknown interface must fail");
        match err {
            capq_core::Error::CaptureSourceFailure(msg) => {
                assert!(msg.contains("capq-does-not-exist0"))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_default_is_listed() {
        let backend = PnetBackend::new();
        let names = backend.list_interfaces().unwrap();
        if let Some(default) = backend.default_interface() {
            assert!(names.contains(&default));
        }
    }

    #[test]
    fn test_closed_stream_errors() {
        let mut stream = PnetStream {
            interface: "eth9".into(),
            rx: None,
            snaplen: 64,
        };
        assert!(stream.next_frame().is_err());
        stream.close();
    }
}
