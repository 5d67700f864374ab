//! Frame converter: captured surface → fixed-format pool buffer.
//!
//! Every output buffer has exactly the configured target geometry and
//! BGRA layout regardless of the source frame's size. Policy is
//! stretch-to-fit with nearest-neighbour sampling — this runs per
//! frame on the hot path, so sampling quality deliberately loses to
//! throughput. An equal-size non-mirrored BGRA source takes a direct
//! row-copy fast path and is pixel-identical in the output.

use crate::capture::types::{CapturedFrame, PixelFormat};
use crate::convert::pool::{BufferPool, PixelBuffer};

// ── FrameConverter ───────────────────────────────────────────────

/// Draws captured frames into buffers from a fixed-geometry pool.
pub struct FrameConverter {
    pool: BufferPool,
}

impl FrameConverter {
    pub fn new(pool: BufferPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    /// Convert one frame, optionally mirrored horizontally.
    ///
    /// Returns `None` when the frame is invalid or the pool is
    /// exhausted; the caller skips the frame in either case.
    pub fn convert(&self, frame: &CapturedFrame, mirror: bool) -> Option<PixelBuffer> {
        if !frame.is_valid() {
            return None;
        }
        let surface = frame.surface.as_ref()?;
        let mut buf = self.pool.acquire()?;

        let rect = frame.content_rect;
        let key = self.pool.key();
        let (tw, th) = (key.width, key.height);

        let same_size = rect.width == tw && rect.height == th;
        if same_size && surface.format == key.format && !mirror {
            Self::copy_rows(surface, rect.x, rect.y, &mut buf);
        } else {
            Self::sample(surface, frame, mirror, &mut buf);
        }
        Some(buf)
    }

    /// Direct row copy for the equal-size, equal-format case.
    fn copy_rows(
        surface: &crate::capture::types::Surface,
        src_x: u32,
        src_y: u32,
        buf: &mut PixelBuffer,
    ) {
        let bpp = surface.format.bytes_per_pixel();
        let width = buf.width() as usize;
        let dst_stride = buf.stride();
        let row_bytes = width * bpp;
        let src_off = src_x as usize * bpp;
        for ty in 0..buf.height() {
            let src_row = surface.row(src_y + ty);
            let dst_row =
                &mut buf.as_mut_slice()[ty as usize * dst_stride..(ty as usize + 1) * dst_stride];
            dst_row[..row_bytes].copy_from_slice(&src_row[src_off..src_off + row_bytes]);
        }
    }

    /// Nearest-neighbour stretch-to-fit draw, with optional mirror.
    fn sample(
        surface: &crate::capture::types::Surface,
        frame: &CapturedFrame,
        mirror: bool,
        buf: &mut PixelBuffer,
    ) {
        let rect = frame.content_rect;
        let (tw, th) = (buf.width(), buf.height());
        let swizzle = surface.format == PixelFormat::Rgba8 && buf.format() == PixelFormat::Bgra8;
        let src_bpp = surface.format.bytes_per_pixel();
        let dst_stride = buf.stride();
        let dst = buf.as_mut_slice();

        for ty in 0..th {
            let sy = rect.y + (ty as u64 * rect.height as u64 / th as u64) as u32;
            let src_row = surface.row(sy);
            let dst_row = &mut dst[ty as usize * dst_stride..(ty as usize + 1) * dst_stride];
            for tx in 0..tw {
                let sx_logical = (tx as u64 * rect.width as u64 / tw as u64) as u32;
                let sx = if mirror {
                    rect.x + (rect.width - 1) - sx_logical
                } else {
                    rect.x + sx_logical
                };
                let s = sx as usize * src_bpp;
                let d = tx as usize * 4;
                let px = &src_row[s..s + src_bpp];
                if swizzle {
                    // RGBA → BGRA
                    dst_row[d] = px[2];
                    dst_row[d + 1] = px[1];
                    dst_row[d + 2] = px[0];
                    dst_row[d + 3] = px[3];
                } else {
                    dst_row[d..d + 4].copy_from_slice(px);
                }
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::types::{CapturedFrame, PixelFormat, Surface};
    use crate::convert::pool::PoolKey;
    use bytes::Bytes;
    use std::sync::Arc;

    /// Surface whose pixel at (x, y) encodes its own coordinates.
    fn coordinate_surface(width: u32, height: u32, format: PixelFormat) -> Arc<Surface> {
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[(x % 251) as u8, (y % 251) as u8, 7, 255]);
            }
        }
        Arc::new(Surface {
            width,
            height,
            stride: width * 4,
            format,
            data: Bytes::from(data),
        })
    }

    fn converter(width: u32, height: u32, capacity: usize) -> FrameConverter {
        let pool = BufferPool::new(PoolKey::new(width, height, PixelFormat::Bgra8), capacity, None);
        FrameConverter::new(pool)
    }

    fn pixel(buf: &crate::convert::pool::PixelBuffer, x: u32, y: u32) -> [u8; 4] {
        let off = y as usize * buf.stride() + x as usize * 4;
        buf.as_slice()[off..off + 4].try_into().unwrap()
    }

    #[test]
    fn equal_size_is_pixel_identical() {
        let conv = converter(16, 8, 2);
        let surface = coordinate_surface(16, 8, PixelFormat::Bgra8);
        let frame = CapturedFrame::full_surface(Arc::clone(&surface), 1.0, 2.0);
        let buf = conv.convert(&frame, false).unwrap();
        for y in 0..8 {
            for x in 0..16 {
                assert_eq!(&pixel(&buf, x, y)[..], surface.pixel(x, y));
            }
        }
    }

    #[test]
    fn two_to_one_downscale_samples_every_other_pixel() {
        let conv = converter(8, 4, 2);
        let frame =
            CapturedFrame::full_surface(coordinate_surface(16, 8, PixelFormat::Bgra8), 1.0, 2.0);
        let buf = conv.convert(&frame, false).unwrap();
        // Stretch-to-fit 2:1 in both axes: output (x, y) reads source (2x, 2y).
        for y in 0..4 {
            for x in 0..8 {
                let px = pixel(&buf, x, y);
                assert_eq!(px[0], (x * 2) as u8);
                assert_eq!(px[1], (y * 2) as u8);
            }
        }
    }

    #[test]
    fn smaller_source_is_stretched_to_target() {
        let conv = converter(8, 8, 2);
        let frame =
            CapturedFrame::full_surface(coordinate_surface(4, 4, PixelFormat::Bgra8), 1.0, 2.0);
        let buf = conv.convert(&frame, false).unwrap();
        assert_eq!(buf.width(), 8);
        assert_eq!(buf.height(), 8);
        // Output (7, 7) reads source (3, 3).
        let px = pixel(&buf, 7, 7);
        assert_eq!(px[0], 3);
        assert_eq!(px[1], 3);
    }

    #[test]
    fn mirror_reverses_columns() {
        let conv = converter(16, 8, 2);
        let frame =
            CapturedFrame::full_surface(coordinate_surface(16, 8, PixelFormat::Bgra8), 1.0, 2.0);
        let plain = conv.convert(&frame, false).unwrap();
        let mirrored = conv.convert(&frame, true).unwrap();
        let w = plain.width();
        for y in 0..plain.height() {
            assert_eq!(pixel(&mirrored, 0, y), pixel(&plain, w - 1, y));
            assert_eq!(pixel(&mirrored, w - 1, y), pixel(&plain, 0, y));
        }
    }

    #[test]
    fn rgba_source_is_swizzled_to_bgra() {
        let conv = converter(4, 4, 2);
        let frame =
            CapturedFrame::full_surface(coordinate_surface(4, 4, PixelFormat::Rgba8), 1.0, 2.0);
        let buf = conv.convert(&frame, false).unwrap();
        // Source (1, 2) is RGBA [1, 2, 7, 255] → BGRA [7, 2, 1, 255].
        assert_eq!(pixel(&buf, 1, 2), [7, 2, 1, 255]);
    }

    #[test]
    fn pool_exhaustion_skips_the_frame() {
        let conv = converter(4, 4, 1);
        let frame =
            CapturedFrame::full_surface(coordinate_surface(4, 4, PixelFormat::Bgra8), 1.0, 2.0);
        let held = conv.convert(&frame, false).unwrap();
        assert!(conv.convert(&frame, false).is_none());
        drop(held);
        assert!(conv.convert(&frame, false).is_some());
    }

    #[test]
    fn invalid_frame_yields_none() {
        let conv = converter(4, 4, 1);
        assert!(conv.convert(&CapturedFrame::INVALID, false).is_none());
        // And it must not leak a pool buffer.
        assert_eq!(conv.pool().outstanding(), 0);
    }
}
