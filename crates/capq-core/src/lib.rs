//! # capq Core
//!
//! Platform-independent core of a bounded capture-to-queue ingestion
//! pipeline.
//!
//! ## Architecture
//!
//! This crate provides:
//! - **Interface resolution** - Validate or default the capture interface
//! - **Filter chain** - Ordered admission predicates and declarative rules
//! - **Drop strategies** - Pluggable overflow policies
//! - **Bounded queue** - Fixed-capacity, thread-safe packet FIFO
//! - **Capture session** - Producer thread, lifecycle and metrics
//!
//! Raw capture is reached through the [`CaptureBackend`] trait; the
//! `capq-platform` crate implements it for real interfaces.
//!
//! ## Example
//!
//! ```rust,no_run
//! use capq_core::{CaptureSession, Config, MemoryBackend};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let backend = MemoryBackend::with_interfaces(["eth0"]);
//! let config = Config::load("capq.toml")?;
//!
//! let session = CaptureSession::new(&config, Arc::new(backend))?;
//! session.start()?;
//!
//! while let Some(packet) = session.dequeue(true, Some(Duration::from_secs(1))) {
//!     println!("#{} {} bytes", packet.sequence(), packet.len());
//! }
//!
//! session.stop()?;
//! println!("{}", session.get_metrics());
//! # Ok::<(), capq_core::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod capture;
pub mod config;
pub mod error;
pub mod filter;
pub mod interface;
pub mod metrics;
pub mod packet;
pub mod queue;
pub mod session;
pub mod strategies;

// Re-exports for convenience
pub use capture::{CaptureBackend, MemoryBackend, OpenOptions, PacketStream};
pub use config::Config;
pub use error::{Error, Result};
pub use filter::{predicate_fn, FilterChain, FilterId, FilterPredicate, FilterRule};
pub use interface::{InterfaceId, InterfaceRequest, InterfaceResolver};
pub use metrics::{CaptureMetrics, MetricsSnapshot};
pub use packet::{CapturedPacket, FrameBuilder, Protocol, ProtocolTags};
pub use queue::{BoundedPacketQueue, EnqueueResult, QueueReader};
pub use session::{CaptureSession, SessionState};
pub use strategies::{DropDecision, DropPolicy, DropStrategy, QueueState};
