//! # capq-platform
//!
//! Host packet capture for capq.
//!
//! Provides [`PnetBackend`], a [`capq_core::CaptureBackend`] that reads raw
//! Ethernet frames from a host interface through pnet's datalink layer, and
//! helpers for describing the interfaces the host exposes.
//!
//! Live capture needs elevated privileges (root or `CAP_NET_RAW` on Linux).
//! Without them, opening a channel fails with
//! [`capq_core::Error::PermissionDenied`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod datalink;
pub mod error;
pub mod interfaces;

pub use datalink::{PnetBackend, PnetStream};
pub use error::PlatformError;
pub use interfaces::{interface_details, pick_default, InterfaceInfo};

/// Platform name for diagnostics
pub fn platform_name() -> &'static str {
    if cfg!(target_os = "linux") {
        "linux"
    } else if cfg!(target_os = "macos") {
        "macos"
    } else if cfg!(target_os = "windows") {
        "windows"
    } else {
        "unknown"
    }
}
