//! The device-owned bounded sample queue.
//!
//! The device-emulation layer owns the queue; the relay only holds a
//! reference and must respect the at-most-capacity contract. Rejection
//! on a full queue is a normal, frequent outcome whenever the consumer
//! drains slower than the capture rate — it is never retried in place.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::bridge::sample::TimedSample;
use crate::error::VcamError;

// ── EnqueueOutcome ───────────────────────────────────────────────

/// Result of a single enqueue attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// The sample is now owned by the queue consumer.
    Enqueued,
    /// The queue is at capacity; the caller drops the frame.
    Rejected,
}

/// Readiness notification: the queue can accept at least one buffer.
///
/// Registered once per connection; may be invoked from an arbitrary
/// concurrent context, so implementations funnel into synchronized
/// state rather than assuming exclusive access.
pub type ReadyCallback = Box<dyn Fn() + Send + Sync>;

// ── SampleQueue ──────────────────────────────────────────────────

/// A bounded FIFO shared with the device-emulation subsystem.
pub trait SampleQueue: Send + Sync {
    /// Maximum number of queued samples.
    fn capacity(&self) -> usize;

    /// Samples currently waiting for the consumer.
    fn count(&self) -> usize;

    /// Attempt to enqueue; `Rejected` when at capacity.
    ///
    /// `Err` covers native device-layer faults only, never the full
    /// condition.
    fn enqueue(&self, sample: TimedSample) -> Result<EnqueueOutcome, VcamError>;

    /// Register (or clear) the readiness callback.
    fn set_ready_callback(&self, callback: Option<ReadyCallback>);
}

// ── FixedSampleQueue ─────────────────────────────────────────────

/// In-process bounded queue with consumer-driven readiness.
///
/// Each `dequeue` moves the queue back toward accept capacity and
/// fires the registered callback, mirroring how the device layer
/// notifies the producer after draining a buffer.
pub struct FixedSampleQueue {
    capacity: usize,
    items: Mutex<VecDeque<TimedSample>>,
    callback: Mutex<Option<ReadyCallback>>,
    /// One-shot fault injection for native-failure paths (tests).
    fail_next: AtomicBool,
}

impl FixedSampleQueue {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            capacity: capacity.max(1),
            items: Mutex::new(VecDeque::new()),
            callback: Mutex::new(None),
            fail_next: AtomicBool::new(false),
        })
    }

    /// Consumer side: take the oldest sample and signal readiness.
    pub fn dequeue(&self) -> Option<TimedSample> {
        let sample = self.items.lock().unwrap().pop_front();
        if sample.is_some() {
            if let Some(cb) = self.callback.lock().unwrap().as_ref() {
                cb();
            }
        }
        sample
    }

    /// Drop all queued samples without firing readiness.
    pub fn clear(&self) {
        self.items.lock().unwrap().clear();
    }

    /// Arm a one-shot native failure on the next enqueue.
    pub fn inject_enqueue_error(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

impl SampleQueue for FixedSampleQueue {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn count(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    fn enqueue(&self, sample: TimedSample) -> Result<EnqueueOutcome, VcamError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(VcamError::Native {
                op: "enqueue",
                status: -50,
            });
        }
        let mut items = self.items.lock().unwrap();
        if items.len() >= self.capacity {
            return Ok(EnqueueOutcome::Rejected);
        }
        items.push_back(sample);
        Ok(EnqueueOutcome::Enqueued)
    }

    fn set_ready_callback(&self, callback: Option<ReadyCallback>) {
        *self.callback.lock().unwrap() = callback;
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::sample::{FormatDescriptor, HostClock};
    use crate::capture::types::PixelFormat;
    use crate::convert::pool::{BufferPool, PoolKey};
    use std::sync::atomic::AtomicUsize;

    fn sample(pool: &BufferPool) -> TimedSample {
        let format = FormatDescriptor {
            width: 2,
            height: 2,
            pixel_format: PixelFormat::Bgra8,
            frame_rate: 30,
        };
        TimedSample::new(pool.acquire().unwrap(), HostClock::new().timestamp(), format)
    }

    fn pool() -> BufferPool {
        BufferPool::new(PoolKey::new(2, 2, PixelFormat::Bgra8), 8, None)
    }

    #[test]
    fn rejects_at_capacity() {
        let queue = FixedSampleQueue::new(2);
        let pool = pool();
        assert_eq!(queue.enqueue(sample(&pool)).unwrap(), EnqueueOutcome::Enqueued);
        assert_eq!(queue.enqueue(sample(&pool)).unwrap(), EnqueueOutcome::Enqueued);
        assert_eq!(queue.enqueue(sample(&pool)).unwrap(), EnqueueOutcome::Rejected);
        assert_eq!(queue.count(), 2);
    }

    #[test]
    fn dequeue_fires_readiness() {
        let queue = FixedSampleQueue::new(2);
        let fired = Arc::new(AtomicUsize::new(0));
        let observed = Arc::clone(&fired);
        queue.set_ready_callback(Some(Box::new(move || {
            observed.fetch_add(1, Ordering::SeqCst);
        })));

        let pool = pool();
        queue.enqueue(sample(&pool)).unwrap();
        queue.enqueue(sample(&pool)).unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        queue.dequeue().unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        queue.dequeue().unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 2);

        // Empty dequeue does not fire.
        assert!(queue.dequeue().is_none());
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn dequeued_buffer_returns_to_pool() {
        let queue = FixedSampleQueue::new(1);
        let pool = pool();
        queue.enqueue(sample(&pool)).unwrap();
        assert_eq!(pool.outstanding(), 1);
        let s = queue.dequeue().unwrap();
        drop(s);
        assert_eq!(pool.outstanding(), 0);
    }

    #[test]
    fn injected_error_surfaces_once() {
        let queue = FixedSampleQueue::new(1);
        let pool = pool();
        queue.inject_enqueue_error();
        assert!(queue.enqueue(sample(&pool)).is_err());
        assert!(queue.enqueue(sample(&pool)).is_ok());
    }
}
