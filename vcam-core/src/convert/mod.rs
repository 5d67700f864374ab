//! Frame conversion: normalizes arbitrary captured frames into
//! fixed-geometry, fixed-format buffers drawn from a pre-sized pool.

pub mod converter;
pub mod pool;

// ── Re-exports ───────────────────────────────────────────────────

pub use converter::FrameConverter;
pub use pool::{AuxAttributes, BufferPool, PixelBuffer, PoolKey};
