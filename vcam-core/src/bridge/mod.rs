//! Device-queue bridge: bounded-queue handoff of timestamped,
//! pool-backed samples to the device-emulation layer.

pub mod queue;
pub mod relay;
pub mod sample;

// ── Re-exports ───────────────────────────────────────────────────

pub use queue::{EnqueueOutcome, FixedSampleQueue, ReadyCallback, SampleQueue};
pub use relay::DeviceBridge;
pub use sample::{FormatDescriptor, HostClock, TimedSample};
