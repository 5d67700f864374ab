//! Frame source adapter: a cancellable, restartable-by-recreation
//! lazy sequence of captured display frames on top of a pluggable
//! compositor source.

pub mod config;
pub mod engine;
pub mod recorder;
pub mod source;
pub mod synthetic;
pub mod types;

// ── Re-exports ───────────────────────────────────────────────────

pub use config::{CaptureConfig, CaptureTarget, ContentFilter};
pub use engine::{CaptureEngine, FrameStream};
pub use recorder::{DisplayInfo, ScreenRecorder, WindowInfo};
pub use source::{CaptureSource, CaptureUnit, FrameSender};
pub use synthetic::SyntheticSource;
pub use types::{CapturedFrame, FrameStatus, PixelFormat, Rect, Size, Surface};
