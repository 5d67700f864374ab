//! Capture session configuration and content filtering.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::capture::types::PixelFormat;

// ── CaptureConfig ────────────────────────────────────────────────

/// Parameters for a capture session.
///
/// Mirrors what the compositor collaborator accepts: output geometry,
/// a frame-rate cap expressed as a minimum inter-frame interval, and
/// capture-side queue depth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Capture output width in pixels.
    pub width: u32,
    /// Capture output height in pixels.
    pub height: u32,
    /// Minimum interval between delivered frames (fps cap).
    pub min_frame_interval: Duration,
    /// Compositor-side frame queue depth.
    pub queue_depth: u32,
    /// Requested pixel layout.
    pub pixel_format: PixelFormat,
}

impl CaptureConfig {
    /// Build a config capped at `fps` frames per second.
    pub fn with_fps(width: u32, height: u32, fps: u32) -> Self {
        Self {
            width,
            height,
            min_frame_interval: Duration::from_secs(1) / fps.max(1),
            queue_depth: 5,
            pixel_format: PixelFormat::Bgra8,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        // 60 fps capture cap; the output target rate is a separate,
        // independently tunable knob (see RelayOptions).
        Self::with_fps(1280, 720, 60)
    }
}

// ── CaptureTarget ────────────────────────────────────────────────

/// What a capture session records: a whole display or a single window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureTarget {
    /// A display, by compositor display identifier.
    Display(u32),
    /// A window, by compositor window identifier.
    Window(u64),
}

// ── ContentFilter ────────────────────────────────────────────────

/// Which screen region a session includes, minus exclusions.
///
/// Excluded applications are matched by bundle identifier; excluded
/// windows by the `"<bundle>.<title>"` convention the picker persists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentFilter {
    /// The display or window to capture.
    pub target: CaptureTarget,
    /// Application identifiers removed from the capture.
    pub excluded_apps: BTreeSet<String>,
    /// Window identifiers removed from the capture.
    pub excluded_windows: BTreeSet<String>,
}

impl ContentFilter {
    /// A filter capturing an entire display with no exclusions.
    pub fn display(id: u32) -> Self {
        Self {
            target: CaptureTarget::Display(id),
            excluded_apps: BTreeSet::new(),
            excluded_windows: BTreeSet::new(),
        }
    }

    /// A filter capturing a single window.
    pub fn window(id: u64) -> Self {
        Self {
            target: CaptureTarget::Window(id),
            excluded_apps: BTreeSet::new(),
            excluded_windows: BTreeSet::new(),
        }
    }

    /// Replace the excluded-application set.
    pub fn with_excluded_apps<I, S>(mut self, apps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_apps = apps.into_iter().map(Into::into).collect();
        self
    }
}

// ── Tests ────────────────────────────────────────────────────────
