//! Device-queue bridge.
//!
//! Owns the buffer pool for the connection's lifetime, stamps each
//! outgoing buffer with a fresh host-clock timestamp, and enforces the
//! at-most-capacity enqueue contract. A rejected enqueue means "drop
//! this frame" — retrying synchronously would violate the bounded
//! queue and grow memory without bound, so the bridge never does.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{trace, warn};

use crate::bridge::queue::{EnqueueOutcome, SampleQueue};
use crate::bridge::sample::{FormatDescriptor, HostClock, TimedSample};
use crate::convert::pool::{AuxAttributes, BufferPool, PixelBuffer, PoolKey};

// ── DeviceBridge ─────────────────────────────────────────────────

/// Hands converted buffers across the device boundary.
pub struct DeviceBridge {
    pool: BufferPool,
    format: FormatDescriptor,
    clock: HostClock,
    enqueued: AtomicU64,
    rejected: AtomicU64,
}

impl DeviceBridge {
    /// Create the bridge and its pool — once per device connection.
    ///
    /// `aux` carries optional allocation hints; `None` is valid and
    /// means no special behaviour.
    pub fn new(format: FormatDescriptor, pool_capacity: usize, aux: Option<AuxAttributes>) -> Self {
        let key = PoolKey::new(format.width, format.height, format.pixel_format);
        Self {
            pool: BufferPool::new(key, pool_capacity, aux),
            format,
            clock: HostClock::new(),
            enqueued: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    /// The connection-lifetime buffer pool (shared with the converter).
    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    pub fn format(&self) -> FormatDescriptor {
        self.format
    }

    /// Samples successfully handed to the queue.
    pub fn enqueued_count(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    /// Frames dropped at the bridge (full queue or native fault).
    pub fn rejected_count(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    /// Wrap `buffer` into a fresh timestamped sample and enqueue it.
    ///
    /// On success, ownership of the buffer transfers to the queue
    /// consumer. On rejection or native failure the sample drops here,
    /// returning the buffer to the pool; native errors are absorbed
    /// (logged) — they are never fatal to the relay.
    pub fn enqueue(&self, queue: &dyn SampleQueue, buffer: PixelBuffer) -> EnqueueOutcome {
        if queue.count() >= queue.capacity() {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            trace!("sink queue full; dropping frame");
            return EnqueueOutcome::Rejected;
        }

        let sample = TimedSample::new(buffer, self.clock.timestamp(), self.format);
        match queue.enqueue(sample) {
            Ok(EnqueueOutcome::Enqueued) => {
                self.enqueued.fetch_add(1, Ordering::Relaxed);
                EnqueueOutcome::Enqueued
            }
            Ok(EnqueueOutcome::Rejected) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                trace!("sink queue rejected sample");
                EnqueueOutcome::Rejected
            }
            Err(e) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                warn!("native enqueue failure (frame dropped): {e}");
                EnqueueOutcome::Rejected
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
