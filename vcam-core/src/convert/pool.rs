//! Pre-sized pixel-buffer pool.
//!
//! One pool per `(width, height, format)` tuple, created once when the
//! relay connects to the device and reused for the connection's
//! lifetime. Buffers return to the pool when dropped — for a relayed
//! frame that happens when the queue consumer releases the sample, so
//! a slow consumer shows up as pool exhaustion (`acquire` → `None`),
//! which the caller treats as "skip this frame".

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::capture::types::PixelFormat;

// ── PoolKey ──────────────────────────────────────────────────────

/// The fixed geometry and layout every buffer in a pool shares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolKey {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

impl PoolKey {
    pub const fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            width,
            height,
            format,
        }
    }

    /// Byte size of one buffer with this key (tightly packed rows).
    pub fn buffer_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }
}

// ── AuxAttributes ────────────────────────────────────────────────

/// Optional allocation hints registered alongside the pool.
///
/// Absence is valid and means "no special allocation behaviour".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuxAttributes {
    /// Cap on simultaneously outstanding buffers, below the pool's
    /// own capacity.
    pub allocation_threshold: usize,
}

// ── BufferPool ───────────────────────────────────────────────────

struct PoolInner {
    key: PoolKey,
    free: Mutex<Vec<Box<[u8]>>>,
    outstanding: AtomicUsize,
    capacity: usize,
    aux: Option<AuxAttributes>,
}

/// A fixed-capacity pool of same-sized pixel buffers.
#[derive(Clone)]
pub struct BufferPool {
    inner: Arc<PoolInner>,
}

impl BufferPool {
    /// Create a pool with `capacity` pre-allocated buffers.
    pub fn new(key: PoolKey, capacity: usize, aux: Option<AuxAttributes>) -> Self {
        let len = key.buffer_len();
        let free = (0..capacity)
            .map(|_| vec![0u8; len].into_boxed_slice())
            .collect();
        Self {
            inner: Arc::new(PoolInner {
                key,
                free: Mutex::new(free),
                outstanding: AtomicUsize::new(0),
                capacity,
                aux,
            }),
        }
    }

    pub fn key(&self) -> PoolKey {
        self.inner.key
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Buffers currently checked out of the pool.
    pub fn outstanding(&self) -> usize {
        self.inner.outstanding.load(Ordering::Acquire)
    }

    /// Take a buffer, or `None` when the pool (or the registered
    /// allocation threshold) is exhausted — the backpressure signal.
    pub fn acquire(&self) -> Option<PixelBuffer> {
        let limit = self
            .inner
            .aux
            .map(|a| a.allocation_threshold.min(self.inner.capacity))
            .unwrap_or(self.inner.capacity);
        if self.inner.outstanding.load(Ordering::Acquire) >= limit {
            return None;
        }
        let data = self.inner.free.lock().unwrap().pop()?;
        self.inner.outstanding.fetch_add(1, Ordering::AcqRel);
        Some(PixelBuffer {
            data: Some(data),
            key: self.inner.key,
            pool: Arc::downgrade(&self.inner),
        })
    }
}

// ── PixelBuffer ──────────────────────────────────────────────────

/// A pool-managed pixel buffer with exactly the pool's dimensions.
///
/// Returns its storage to the pool on drop. Ownership is moved into a
/// `TimedSample` on enqueue, so release happens when the queue
/// consumer finishes with the sample.
pub struct PixelBuffer {
    data: Option<Box<[u8]>>,
    key: PoolKey,
    pool: Weak<PoolInner>,
}

impl PixelBuffer {
    pub fn width(&self) -> u32 {
        self.key.width
    }

    pub fn height(&self) -> u32 {
        self.key.height
    }

    pub fn format(&self) -> PixelFormat {
        self.key.format
    }

    /// Row pitch in bytes (rows are tightly packed).
    pub fn stride(&self) -> usize {
        self.key.width as usize * self.key.format.bytes_per_pixel()
    }

    /// Read access to the pixel bytes.
    pub fn as_slice(&self) -> &[u8] {
        self.data.as_ref().expect("buffer present until drop")
    }

    /// CPU-side write access to the pixel bytes.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        self.data.as_mut().expect("buffer present until drop")
    }
}

impl Drop for PixelBuffer {
    fn drop(&mut self) {
        let Some(data) = self.data.take() else {
            return;
        };
        if let Some(pool) = self.pool.upgrade() {
            pool.free.lock().unwrap().push(data);
            pool.outstanding.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

impl std::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.key.width)
            .field("height", &self.key.height)
            .field("format", &self.key.format)
            .finish()
    }
}

// ── Tests ────────────────────────────────────────────────────────
