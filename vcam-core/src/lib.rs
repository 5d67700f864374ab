//! # vcam-core
//!
//! Core library of the virtual-camera frame relay: screen capture in,
//! converted fixed-format samples out through a bounded device queue.
//!
//! This crate contains:
//! - **Capture**: `CaptureSource` seam, `CaptureEngine` frame stream,
//!   `ScreenRecorder` selection/exclusions, `SyntheticSource` pattern
//! - **Convert**: `BufferPool` + `FrameConverter` for stretch-to-fit
//!   BGRA conversion into pooled buffers
//! - **Bridge**: `SampleQueue`, `DeviceBridge`, timestamped samples
//! - **Relay**: `RelayController` single-frame-in-flight state machine
//!   and the `PropertyPoller` streaming-state poll
//! - **Device**: `VirtualCamera` registry abstraction, stream
//!   discovery, property addressing, in-process `LoopbackCamera`
//! - **Service**: `RelayService` wiring the pipeline together
//! - **Error**: `VcamError` — typed, `thiserror`-based error hierarchy

pub mod bridge;
pub mod capture;
pub mod convert;
pub mod device;
pub mod error;
pub mod relay;
pub mod service;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use bridge::{DeviceBridge, EnqueueOutcome, FixedSampleQueue, FormatDescriptor, SampleQueue, TimedSample};
pub use capture::{
    CaptureConfig, CaptureEngine, CaptureSource, CaptureTarget, CapturedFrame, ContentFilter,
    FrameStream, ScreenRecorder, SyntheticSource,
};
pub use convert::{BufferPool, FrameConverter, PixelBuffer};
pub use device::{
    DeviceId, DiscoveryWatcher, LoopbackCamera, StreamEndpoints, StreamId, VirtualCamera, discover,
};
pub use error::VcamError;
pub use relay::{Admission, PropertyPoller, RelayController, RelayPhase};
pub use service::{DEVICE_NAME, RelayOptions, RelayService, RelayStats};
