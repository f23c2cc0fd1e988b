//! Capture session
//!
//! Owns one producer thread that pulls frames from a capture stream, runs
//! them through the filter chain and offers them to the bounded queue.
//! Consumers read from the queue on their own threads.
//!
//! Lifecycle is `Idle -> Capturing -> Stopped`; `Stopped` is terminal.

use crate::capture::{CaptureBackend, OpenOptions, PacketStream};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::filter::{FilterChain, FilterId, FilterPredicate};
use crate::interface::{InterfaceId, InterfaceResolver};
use crate::metrics::{CaptureMetrics, MetricsSnapshot};
use crate::packet::CapturedPacket;
use crate::queue::{BoundedPacketQueue, EnqueueResult, QueueReader};
use crate::strategies::DropStrategy;
use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, instrument, trace, warn};

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    /// Built, not capturing yet
    Idle = 0,
    /// Producer thread running
    Capturing = 1,
    /// Capture ended; the queue can still be drained
    Stopped = 2,
}

impl SessionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => SessionState::Idle,
            1 => SessionState::Capturing,
            _ => SessionState::Stopped,
        }
    }

    /// State name for logging
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Capturing => "capturing",
            SessionState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
struct StateCell(AtomicU8);

impl StateCell {
    fn new() -> Self {
        Self(AtomicU8::new(SessionState::Idle as u8))
    }

    fn get(&self) -> SessionState {
        SessionState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn set(&self, state: SessionState) -> SessionState {
        SessionState::from_u8(self.0.swap(state as u8, Ordering::AcqRel))
    }

    fn transition(&self, from: SessionState, to: SessionState) -> Result<()> {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|current| Error::InvalidState {
                from: SessionState::from_u8(current).as_str(),
                to: to.as_str(),
            })
    }
}

/// A single capture-to-queue ingestion session
pub struct CaptureSession {
    interface: InterfaceId,
    backend: Arc<dyn CaptureBackend>,
    options: OpenOptions,
    filters: Arc<RwLock<FilterChain>>,
    queue: Arc<BoundedPacketQueue>,
    metrics: Arc<CaptureMetrics>,
    state: Arc<StateCell>,
    failure: Arc<Mutex<Option<Error>>>,
    producer: Mutex<Option<JoinHandle<()>>>,
}

impl CaptureSession {
    /// Build a session: validate configuration, resolve the interface, and
    /// set up filters, queue and metrics.
    ///
    /// Any failure here is fatal; the session never exists.
    #[instrument(skip_all, fields(backend = backend.name()))]
    pub fn new(config: &Config, backend: Arc<dyn CaptureBackend>) -> Result<Self> {
        config.validate()?;

        let interface = InterfaceResolver::new(backend.as_ref()).resolve(config.requested_interface())?;
        let filters = config.build_filters();
        let metrics = Arc::new(CaptureMetrics::new());
        let queue = BoundedPacketQueue::with_metrics(
            config.queue.capacity,
            config.queue.drop_strategy,
            Arc::clone(&metrics),
        )?;

        info!(
            interface = %interface,
            capacity = config.queue.capacity,
            drop_strategy = %config.queue.drop_strategy,
            filters = filters.len(),
            promiscuous = config.capture.promiscuous,
            "Capture session created"
        );

        Ok(Self {
            interface,
            backend,
            options: config.open_options(),
            filters: Arc::new(RwLock::new(filters)),
            queue: Arc::new(queue),
            metrics,
            state: Arc::new(StateCell::new()),
            failure: Arc::new(Mutex::new(None)),
            producer: Mutex::new(None),
        })
    }

    /// Open the capture stream and start the producer thread.
    ///
    /// Only valid from `Idle`. If the stream cannot be opened the session
    /// moves to `Stopped` and the error is returned.
    pub fn start(&self) -> Result<()> {
        let mut producer = self.producer.lock();
        self.state
            .transition(SessionState::Idle, SessionState::Capturing)?;

        let stream = match self.backend.open(&self.interface, &self.options) {
            Ok(stream) => stream,
            Err(e) => {
                self.state.set(SessionState::Stopped);
                error!(interface = %self.interface, error = %e, "Failed to open capture stream");
                return Err(e);
            }
        };

        let worker = Producer {
            stream,
            filters: Arc::clone(&self.filters),
            queue: Arc::clone(&self.queue),
            metrics: Arc::clone(&self.metrics),
            state: Arc::clone(&self.state),
            failure: Arc::clone(&self.failure),
        };

        let handle = thread::Builder::new()
            .name("capq-producer".into())
            .spawn(move || worker.run())
            .map_err(|e| {
                self.state.set(SessionState::Stopped);
                Error::Io(e)
            })?;
        *producer = Some(handle);

        info!(
            interface = %self.interface,
            backend = self.backend.name(),
            "Capture started"
        );
        Ok(())
    }

    /// Stop capturing. Idempotent.
    ///
    /// Packets already queued stay available to consumers. If capture ended
    /// because the source failed, the first call after the failure returns
    /// it as [`Error::CaptureSourceFailure`]; later calls return `Ok(())`.
    pub fn stop(&self) -> Result<()> {
        let previous = self.state.set(SessionState::Stopped);

        if let Some(handle) = self.producer.lock().take() {
            if handle.join().is_err() {
                error!("Producer thread panicked");
                self.failure
                    .lock()
                    .get_or_insert_with(|| Error::capture("producer thread panicked"));
            }
        }

        if previous != SessionState::Stopped {
            info!(
                interface = %self.interface,
                metrics = %self.metrics.snapshot(),
                "Capture stopped"
            );
        }

        match self.failure.lock().take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    /// Interface this session captures on
    pub fn interface(&self) -> &InterfaceId {
        &self.interface
    }

    /// Point-in-time metrics. Never resets anything.
    pub fn get_metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Append an admission predicate; applies to frames captured from now on
    pub fn add_filter<P: FilterPredicate + 'static>(&self, predicate: P) -> FilterId {
        let name = predicate.name().to_string();
        let id = self.filters.write().add(predicate);
        debug!(%id, filter = %name, "Filter added");
        id
    }

    /// Remove a predicate; unknown ids are ignored
    pub fn remove_filter(&self, id: FilterId) -> bool {
        let removed = self.filters.write().remove(id);
        if removed {
            debug!(%id, "Filter removed");
        }
        removed
    }

    /// Names of the active filters, in evaluation order
    pub fn filter_names(&self) -> Vec<String> {
        self.filters
            .read()
            .names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Replace the overflow strategy
    pub fn set_drop_strategy<S: DropStrategy + 'static>(&self, strategy: S) {
        self.queue.set_strategy(strategy);
    }

    /// Dequeue-only handle to the queue, for consumer threads.
    ///
    /// Only the producer offers packets, which keeps
    /// `captured >= filtered + enqueued` intact.
    pub fn queue(&self) -> QueueReader {
        QueueReader::new(Arc::clone(&self.queue))
    }

    /// Take the oldest packet; see [`BoundedPacketQueue::dequeue`]
    pub fn dequeue(&self, blocking: bool, timeout: Option<Duration>) -> Option<CapturedPacket> {
        self.queue.dequeue(blocking, timeout)
    }
}

impl fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureSession")
            .field("interface", &self.interface)
            .field("state", &self.state.get())
            .field("queue", &self.queue)
            .finish()
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!(error = %e, "Capture session ended with an unreported failure");
        }
    }
}

struct Producer {
    stream: Box<dyn PacketStream>,
    filters: Arc<RwLock<FilterChain>>,
    queue: Arc<BoundedPacketQueue>,
    metrics: Arc<CaptureMetrics>,
    state: Arc<StateCell>,
    failure: Arc<Mutex<Option<Error>>>,
}

impl Producer {
    fn run(mut self) {
        let mut sequence: u64 = 0;

        // A panicking stream or predicate ends capture like any source failure
        let pumped = panic::catch_unwind(AssertUnwindSafe(|| self.pump(&mut sequence)));
        if let Err(payload) = pumped {
            let reason = panic_reason(payload.as_ref());
            error!(%reason, "Producer thread panicked");
            self.fail(Error::capture(format!("producer thread panicked: {reason}")));
        }

        self.stream.close();
        debug!(frames = sequence, "Producer finished");
    }

    fn pump(&mut self, sequence: &mut u64) {
        while self.state.get() == SessionState::Capturing {
            match self.stream.next_frame() {
                Ok(Some(frame)) => {
                    self.ingest(*sequence, frame);
                    *sequence += 1;
                }
                Ok(None) => {}
                Err(e) => {
                    error!(error = %e, "Capture source failed");
                    let failure = if matches!(e, Error::CaptureSourceFailure(_)) {
                        e
                    } else {
                        Error::capture(e.to_string())
                    };
                    self.fail(failure);
                    break;
                }
            }
        }
    }

    /// Record a terminal failure; it is reported by the next `stop()`
    fn fail(&self, failure: Error) {
        *self.failure.lock() = Some(failure);
        self.state.set(SessionState::Stopped);
    }

    fn ingest(&self, sequence: u64, frame: Bytes) {
        let packet = CapturedPacket::new(sequence, frame);
        self.metrics.record_captured(packet.len());

        {
            let chain = self.filters.read();
            if let Some((id, name)) = chain.first_rejection(&packet) {
                self.metrics.record_filtered();
                trace!(sequence, %id, filter = name, "Packet filtered");
                return;
            }
        }

        if let EnqueueResult::Accepted = self.queue.enqueue(packet) {
            trace!(sequence, "Packet enqueued");
        }
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
