//! Platform-specific errors

use thiserror::Error;

/// Platform-specific errors
#[derive(Error, Debug)]
pub enum PlatformError {
    /// Interface not present on this host
    #[error("Interface not found: {0}")]
    InterfaceNotFound(String),

    /// Datalink channel could not be created
    #[error("Channel creation failed: {0}")]
    ChannelCreation(String),

    /// The datalink layer returned something other than an Ethernet channel
    #[error("Unsupported channel type on {0}")]
    UnsupportedChannel(String),

    /// Permission denied
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Packet capture error
    #[error("Capture error: {0}")]
    CaptureError(String),
}

impl PlatformError {
    /// Classify a channel-open failure, singling out missing privileges
    pub fn from_open(interface: &str, err: &std::io::Error) -> Self {
        let msg = err.to_string();
        if err.kind() == std::io::ErrorKind::PermissionDenied
            || msg.contains("permission")
            || msg.contains("Operation not permitted")
        {
            PlatformError::PermissionDenied(format!(
                "capturing on {interface} requires elevated privileges ({msg})"
            ))
        } else {
            PlatformError::ChannelCreation(format!("{interface}: {msg}"))
        }
    }
}

impl From<PlatformError> for capq_core::Error {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::PermissionDenied(msg) => capq_core::Error::PermissionDenied(msg),
            other => capq_core::Error::CaptureSourceFailure(other.to_string()),
        }
    }
}
