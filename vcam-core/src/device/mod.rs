//! Device-emulation layer: registry abstraction, property addressing,
//! stream discovery, and the in-process loopback camera.

pub mod discovery;
pub mod loopback;
pub mod property;
pub mod virtual_device;

// ── Re-exports ───────────────────────────────────────────────────

pub use discovery::{DiscoveryWatcher, StreamEndpoints, discover};
pub use loopback::LoopbackCamera;
pub use property::{
    FourCc, PropertyAddress, PropertyElement, PropertyScope, STREAM_SELECTOR, STREAMING_WANTED,
};
pub use virtual_device::{DeviceId, StreamId, VirtualCamera};
