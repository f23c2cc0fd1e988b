//! Bounded packet queue
//!
//! Fixed-capacity FIFO shared between one producer and any number of
//! consumers. Enqueue never waits for space: when every slot is taken the
//! active [`DropStrategy`] decides, and the decision is executed under the
//! same lock as the capacity check. Consumers may block on [`dequeue`] with
//! an optional timeout.
//!
//! [`dequeue`]: BoundedPacketQueue::dequeue

use crate::error::{Error, Result};
use crate::metrics::CaptureMetrics;
use crate::packet::CapturedPacket;
use crate::strategies::{DropDecision, DropStrategy, QueueState};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Outcome of a single enqueue
#[derive(Debug)]
pub enum EnqueueResult {
    /// The packet now occupies a slot and nothing was discarded
    Accepted,
    /// A drop decision was executed
    Dropped {
        /// Decision that was applied
        decision: DropDecision,
        /// Sequence number of the discarded packet
        sequence: u64,
    },
    /// The packet was refused under reject-and-signal
    Rejected {
        /// The refused packet, handed back to the caller
        packet: CapturedPacket,
    },
}

impl EnqueueResult {
    /// Check if the packet was accepted without any drop
    pub fn is_accepted(&self) -> bool {
        matches!(self, EnqueueResult::Accepted)
    }

    /// Check if a packet was discarded
    pub fn is_dropped(&self) -> bool {
        matches!(self, EnqueueResult::Dropped { .. })
    }

    /// Check if the packet was refused
    pub fn is_rejected(&self) -> bool {
        matches!(self, EnqueueResult::Rejected { .. })
    }
}

struct Inner {
    slots: VecDeque<CapturedPacket>,
    strategy: Box<dyn DropStrategy>,
    high_water: usize,
}

impl Inner {
    fn state(&self, capacity: usize) -> QueueState {
        QueueState {
            capacity,
            occupancy: self.slots.len(),
            oldest_sequence: self.slots.front().map(CapturedPacket::sequence),
            newest_sequence: self.slots.back().map(CapturedPacket::sequence),
        }
    }

    fn admit(&mut self, packet: CapturedPacket) -> usize {
        self.slots.push_back(packet);
        self.high_water = self.high_water.max(self.slots.len());
        self.slots.len()
    }
}

/// Fixed-capacity, thread-safe FIFO of captured packets
pub struct BoundedPacketQueue {
    capacity: usize,
    inner: Mutex<Inner>,
    available: Condvar,
    metrics: Arc<CaptureMetrics>,
}

impl BoundedPacketQueue {
    /// Create a queue with its own metrics
    pub fn new<S: DropStrategy + 'static>(capacity: usize, strategy: S) -> Result<Self> {
        Self::with_metrics(capacity, strategy, Arc::new(CaptureMetrics::new()))
    }

    /// Create a queue reporting into shared metrics
    pub fn with_metrics<S: DropStrategy + 'static>(
        capacity: usize,
        strategy: S,
        metrics: Arc<CaptureMetrics>,
    ) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::config_value(
                "queue.capacity",
                "must be a positive integer",
            ));
        }

        debug!(capacity, strategy = strategy.name(), "Created packet queue");

        Ok(Self {
            capacity,
            inner: Mutex::new(Inner {
                slots: VecDeque::with_capacity(capacity),
                strategy: Box::new(strategy),
                high_water: 0,
            }),
            available: Condvar::new(),
            metrics,
        })
    }

    /// Offer a packet. Never blocks waiting for space.
    pub fn enqueue(&self, packet: CapturedPacket) -> EnqueueResult {
        let mut inner = self.inner.lock();
        self.metrics.record_enqueued();

        if inner.slots.len() < self.capacity {
            let occupancy = inner.admit(packet);
            self.metrics.observe_occupancy(occupancy);
            drop(inner);
            self.available.notify_one();
            return EnqueueResult::Accepted;
        }

        let state = inner.state(self.capacity);
        let decision = inner.strategy.on_overflow(&state, &packet);
        let incoming = packet.sequence();

        let discarded = match decision {
            DropDecision::DropIncoming => {
                drop(inner);
                incoming
            }
            DropDecision::DropOldest | DropDecision::DropNewestQueued => {
                let evicted = if decision == DropDecision::DropOldest {
                    inner.slots.pop_front()
                } else {
                    inner.slots.pop_back()
                };
                inner.admit(packet);
                drop(inner);
                self.available.notify_one();
                // Capacity is at least one, so a full queue always has a victim.
                evicted.map_or(incoming, |p| p.sequence())
            }
            DropDecision::RejectAndSignal => {
                self.metrics.record_rejected();
                drop(inner);
                debug!(sequence = incoming, capacity = self.capacity, "Queue full, packet rejected");
                return EnqueueResult::Rejected { packet };
            }
        };

        self.metrics.record_dropped();
        debug!(
            sequence = discarded,
            incoming,
            decision = %decision,
            "Queue full, packet dropped"
        );
        EnqueueResult::Dropped {
            decision,
            sequence: discarded,
        }
    }

    /// Offer a packet, turning a reject-and-signal refusal into
    /// [`Error::QueueFull`]
    pub fn try_enqueue(&self, packet: CapturedPacket) -> Result<EnqueueResult> {
        match self.enqueue(packet) {
            EnqueueResult::Rejected { .. } => Err(Error::QueueFull {
                capacity: self.capacity,
            }),
            other => Ok(other),
        }
    }

    /// Take the oldest packet.
    ///
    /// Non-blocking calls return immediately. Blocking calls wait until a
    /// packet arrives or `timeout` elapses; `None` waits indefinitely.
    pub fn dequeue(&self, blocking: bool, timeout: Option<Duration>) -> Option<CapturedPacket> {
        let mut inner = self.inner.lock();

        if blocking {
            let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
            while inner.slots.is_empty() {
                match deadline {
                    Some(deadline) => {
                        if self.available.wait_until(&mut inner, deadline).timed_out() {
                            break;
                        }
                    }
                    None => self.available.wait(&mut inner),
                }
            }
        }

        let packet = inner.slots.pop_front()?;
        self.metrics.record_dequeued();
        drop(inner);

        trace!(sequence = packet.sequence(), "Dequeued packet");
        Some(packet)
    }

    /// Take the oldest packet without waiting
    pub fn try_dequeue(&self) -> Option<CapturedPacket> {
        self.dequeue(false, None)
    }

    /// Wait up to `timeout` for a packet
    pub fn dequeue_timeout(&self, timeout: Duration) -> Option<CapturedPacket> {
        self.dequeue(true, Some(timeout))
    }

    /// Take every resident packet, oldest first
    pub fn drain(&self) -> Vec<CapturedPacket> {
        let mut inner = self.inner.lock();
        let drained: Vec<_> = inner.slots.drain(..).collect();
        for _ in &drained {
            self.metrics.record_dequeued();
        }
        drained
    }

    /// Replace the overflow strategy. Resident packets are untouched.
    pub fn set_strategy<S: DropStrategy + 'static>(&self, strategy: S) {
        let mut inner = self.inner.lock();
        debug!(
            from = inner.strategy.name(),
            to = strategy.name(),
            "Drop strategy changed"
        );
        inner.strategy = Box::new(strategy);
    }

    /// Name of the active strategy
    pub fn strategy_name(&self) -> &'static str {
        self.inner.lock().strategy.name()
    }

    /// Fixed capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current occupancy
    pub fn len(&self) -> usize {
        self.inner.lock().slots.len()
    }

    /// Check if no packet is resident
    pub fn is_empty(&self) -> bool {
        self.inner.lock().slots.is_empty()
    }

    /// Check if every slot is occupied
    pub fn is_full(&self) -> bool {
        self.inner.lock().slots.len() >= self.capacity
    }

    /// Snapshot of the queue as a strategy would see it
    pub fn state(&self) -> QueueState {
        self.inner.lock().state(self.capacity)
    }

    /// Highest occupancy reached so far
    pub fn high_water_mark(&self) -> usize {
        self.inner.lock().high_water
    }

    /// Metrics this queue reports into
    pub fn metrics(&self) -> &Arc<CaptureMetrics> {
        &self.metrics
    }
}

impl std::fmt::Debug for BoundedPacketQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("BoundedPacketQueue")
            .field("capacity", &self.capacity)
            .field("occupancy", &inner.slots.len())
            .field("strategy", &inner.strategy.name())
            .finish()
    }
}

/// Consumer-side handle to a shared queue.
///
/// Can take packets but never offer them, so every packet a reader sees
/// went through the producer's capture and filter accounting.
#[derive(Clone)]
pub struct QueueReader {
    queue: Arc<BoundedPacketQueue>,
}

impl QueueReader {
    /// Wrap a shared queue
    pub fn new(queue: Arc<BoundedPacketQueue>) -> Self {
        Self { queue }
    }

    /// See [`BoundedPacketQueue::dequeue`]
    pub fn dequeue(&self, blocking: bool, timeout: Option<Duration>) -> Option<CapturedPacket> {
        self.queue.dequeue(blocking, timeout)
    }

    /// Take the oldest packet without waiting
    pub fn try_dequeue(&self) -> Option<CapturedPacket> {
        self.queue.try_dequeue()
    }

    /// Wait up to `timeout` for a packet
    pub fn dequeue_timeout(&self, timeout: Duration) -> Option<CapturedPacket> {
        self.queue.dequeue_timeout(timeout)
    }

    /// Take every resident packet, oldest first
    pub fn drain(&self) -> Vec<CapturedPacket> {
        self.queue.drain()
    }

    /// Current occupancy
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Check if no packet is resident
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Fixed capacity
    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// Name of the active overflow strategy
    pub fn strategy_name(&self) -> &'static str {
        self.queue.strategy_name()
    }
}

impl std::fmt::Debug for QueueReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("QueueReader").field(&self.queue).finish()
    }
}

impl Drop for BoundedPacketQueue {
    fn drop(&mut self) {
        let remaining = self.inner.get_mut().slots.len();
        if remaining > 0 {
            debug!(remaining, "Discarding packets left in released queue");
        }
    }
}
