//! Timestamped samples handed across the device boundary.

use std::time::{Duration, Instant};

use crate::capture::types::PixelFormat;
use crate::convert::pool::PixelBuffer;

// ── HostClock ────────────────────────────────────────────────────

/// Monotonic presentation-timestamp source.
///
/// Timestamps are durations since the clock's creation; they only
/// ever move forward.
#[derive(Debug, Clone, Copy)]
pub struct HostClock {
    epoch: Instant,
}

impl HostClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    /// Current presentation timestamp.
    pub fn timestamp(&self) -> Duration {
        self.epoch.elapsed()
    }
}

impl Default for HostClock {
    fn default() -> Self {
        Self::new()
    }
}

// ── FormatDescriptor ─────────────────────────────────────────────

/// The video format every relayed sample advertises.
///
/// Created once when the relay connects and reused for the
/// connection's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatDescriptor {
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    /// Nominal output frame rate advertised to consumers.
    pub frame_rate: u32,
}

// ── TimedSample ──────────────────────────────────────────────────

/// One buffer plus its presentation timestamp and format.
///
/// Created fresh for every enqueue — never reused across frames. The
/// contained buffer returns to its pool when the consumer drops the
/// sample.
#[derive(Debug)]
pub struct TimedSample {
    pub buffer: PixelBuffer,
    /// Presentation timestamp from the monotonic host clock.
    pub pts: Duration,
    pub format: FormatDescriptor,
}

impl TimedSample {
    pub fn new(buffer: PixelBuffer, pts: Duration, format: FormatDescriptor) -> Self {
        Self {
            buffer,
            pts,
            format,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
