//! The virtual-camera device abstraction.
//!
//! The relay never talks to the system camera registry directly; it
//! goes through this trait so the pipeline can run against an
//! in-process loopback device in tests and headless setups.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::bridge::queue::SampleQueue;
use crate::device::property::PropertyAddress;
use crate::error::VcamError;

/// Registry-scoped identifier of a device.
pub type DeviceId = u32;
/// Registry-scoped identifier of a stream on a device.
pub type StreamId = u32;

/// A camera device registry plus per-device stream control.
///
/// Implementations are shared across tasks (`Arc<dyn VirtualCamera>`),
/// so every method takes `&self` and synchronizes internally. Stream
/// ids are reported in the device's publication order; discovery
/// relies on that order to tell source from sink.
pub trait VirtualCamera: Send + Sync {
    /// Ids of all currently registered devices.
    fn device_ids(&self) -> Vec<DeviceId>;

    /// Human-readable device name, if the device exists.
    fn device_name(&self, device: DeviceId) -> Option<String>;

    /// Stable unique identifier, if the device exists.
    fn device_uid(&self, device: DeviceId) -> Option<String>;

    /// The device's streams in publication order.
    fn stream_ids(&self, device: DeviceId) -> Vec<StreamId>;

    /// Begin pulling buffers through `stream`.
    fn start_stream(&self, device: DeviceId, stream: StreamId) -> Result<(), VcamError>;

    /// Stop pulling buffers through `stream`.
    fn stop_stream(&self, device: DeviceId, stream: StreamId) -> Result<(), VcamError>;

    /// Read a string property off `stream`.
    ///
    /// `Ok(None)` means the stream exists but does not expose the
    /// property; callers degrade gracefully rather than erroring.
    fn string_property(
        &self,
        stream: StreamId,
        address: &PropertyAddress,
    ) -> Result<Option<String>, VcamError>;

    /// Write a string property on `stream`.
    ///
    /// Writing to a stream that lacks the property is a silent no-op,
    /// matching registry semantics.
    fn set_string_property(
        &self,
        stream: StreamId,
        address: &PropertyAddress,
        value: &str,
    ) -> Result<(), VcamError>;

    /// The bounded sample queue behind a sink stream.
    fn sink_queue(&self, stream: StreamId) -> Option<Arc<dyn SampleQueue>>;

    /// Subscribe to device-connected notifications.
    ///
    /// Fires with the id of each device as it appears in the registry;
    /// used to retry discovery when the target device publishes late.
    fn subscribe_connections(&self) -> broadcast::Receiver<DeviceId>;
}
