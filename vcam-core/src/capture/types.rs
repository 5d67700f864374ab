//! Shared types for the capture side of the pipeline.
//!
//! These are **internal** frame representations produced by a
//! [`CaptureSource`](crate::capture::source::CaptureSource) and
//! consumed once by the converter. They are distinct from the
//! pool-managed buffers handed to the device queue.

use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

// ── PixelFormat ──────────────────────────────────────────────────

/// Pixel layout for captured surfaces and output buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 4 bytes per pixel: Blue, Green, Red, Alpha. The fixed output
    /// format of the relay.
    Bgra8,
    /// 4 bytes per pixel: Red, Green, Blue, Alpha.
    Rgba8,
}

impl PixelFormat {
    /// Bytes consumed by a single pixel in this format.
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Bgra8 | PixelFormat::Rgba8 => 4,
        }
    }
}

// ── Geometry ─────────────────────────────────────────────────────

/// A size in source pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A rectangle (origin + size) in source pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

// ── FrameStatus ──────────────────────────────────────────────────

/// Status attached to each unit the compositor delivers.
///
/// Anything other than `Complete` is expected during resize or
/// reconfiguration and is silently dropped by the engine — partial
/// frames never surface as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// A fully rendered frame ready for conversion.
    Complete,
    /// The display content did not change since the last frame.
    Idle,
    /// The captured content is entirely blank.
    Blank,
    /// Delivery was suspended (e.g. mid-reconfigure).
    Suspended,
    /// The underlying stream stopped producing.
    Stopped,
}

// ── Surface ──────────────────────────────────────────────────────

/// An opaque GPU-shareable backing store for one captured frame.
///
/// `data` holds `height` rows of `stride` bytes each; `stride` may
/// exceed `width * bytes_per_pixel` due to row-alignment requirements
/// of the producing compositor.
#[derive(Debug, Clone)]
pub struct Surface {
    /// Surface width in pixels.
    pub width: u32,
    /// Surface height in pixels.
    pub height: u32,
    /// Row pitch in **bytes**.
    pub stride: u32,
    /// Pixel layout.
    pub format: PixelFormat,
    /// Pixel payload — shareable without copying.
    pub data: Bytes,
}

impl Surface {
    /// Returns one row, including any alignment padding.
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride as usize;
        let end = start + self.stride as usize;
        &self.data[start..end]
    }

    /// Returns the pixel bytes at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let bpp = self.format.bytes_per_pixel();
        let offset = y as usize * self.stride as usize + x as usize * bpp;
        &self.data[offset..offset + bpp]
    }
}

// ── CapturedFrame ────────────────────────────────────────────────

/// One captured display frame plus its compositor metadata.
///
/// Immutable once produced; consumed exactly once by the converter
/// and never retained past a single relay cycle.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    /// Backing surface, shared by reference. `None` only in the
    /// [`INVALID`](Self::INVALID) sentinel.
    pub surface: Option<Arc<Surface>>,
    /// The content rectangle within the surface, in source pixels.
    pub content_rect: Rect,
    /// Content scale reported by the compositor.
    pub content_scale: f32,
    /// Backing-display scale factor.
    pub scale_factor: f32,
}

impl CapturedFrame {
    /// The "no frame yet" sentinel: all zero / null.
    pub const INVALID: CapturedFrame = CapturedFrame {
        surface: None,
        content_rect: Rect::new(0, 0, 0, 0),
        content_scale: 0.0,
        scale_factor: 0.0,
    };

    /// Build a frame whose content rect spans the whole surface.
    pub fn full_surface(surface: Arc<Surface>, content_scale: f32, scale_factor: f32) -> Self {
        let content_rect = Rect::new(0, 0, surface.width, surface.height);
        Self {
            surface: Some(surface),
            content_rect,
            content_scale,
            scale_factor,
        }
    }

    /// Content size, derived from the content rectangle.
    pub fn size(&self) -> Size {
        self.content_rect.size()
    }

    /// A frame is valid when it has a surface and non-empty content.
    pub fn is_valid(&self) -> bool {
        self.surface.is_some() && !self.size().is_empty()
    }
}

// ── Tests ────────────────────────────────────────────────────────
