//! In-process loopback camera.
//!
//! Stands in for the system registry in tests and headless runs: it
//! publishes devices with the same two-stream shape as the real
//! extension (source first, sink second) and gives the test harness a
//! consumer-side handle on the handshake property and the sink queue.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

use crate::bridge::queue::{FixedSampleQueue, SampleQueue};
use crate::bridge::sample::TimedSample;
use crate::device::property::{PropertyAddress, STREAM_SELECTOR, STREAMING_WANTED};
use crate::device::virtual_device::{DeviceId, StreamId, VirtualCamera};
use crate::error::VcamError;

/// Registry status for operations against an unknown object ('!obj').
const BAD_OBJECT: i32 = 0x216F_626A;

/// Value published on the handshake property while no client streams.
const STREAMING_IDLE: &str = "sc=0";

// ── LoopbackDevice ───────────────────────────────────────────────

struct LoopbackDevice {
    id: DeviceId,
    name: String,
    uid: String,
    /// Publication order: source stream first, sink stream second.
    streams: Vec<StreamId>,
    queue: Arc<FixedSampleQueue>,
    started: BTreeSet<StreamId>,
    /// Consumer-controlled: does a client currently stream?
    streaming_clients: bool,
    /// When false the handshake property reads back as absent.
    handshake_exposed: bool,
    /// Last liveness token the producer side wrote.
    last_token: Option<String>,
}

impl LoopbackDevice {
    fn source_stream(&self) -> Option<StreamId> {
        self.streams.first().copied()
    }

    fn sink_stream(&self) -> Option<StreamId> {
        self.streams.get(1).copied()
    }
}

// ── LoopbackCamera ───────────────────────────────────────────────

/// Test/headless implementation of [`VirtualCamera`].
pub struct LoopbackCamera {
    devices: Mutex<Vec<LoopbackDevice>>,
    notify: broadcast::Sender<DeviceId>,
    next_id: Mutex<u32>,
}

impl LoopbackCamera {
    /// An empty registry; publish devices with [`publish_device`].
    ///
    /// [`publish_device`]: LoopbackCamera::publish_device
    pub fn empty() -> Arc<Self> {
        let (notify, _) = broadcast::channel(16);
        Arc::new(Self {
            devices: Mutex::new(Vec::new()),
            notify,
            next_id: Mutex::new(1),
        })
    }

    /// Registry with one standard two-stream device already published.
    pub fn with_device(name: &str, queue_capacity: usize) -> Arc<Self> {
        let camera = Self::empty();
        camera.publish_device(name, 2, queue_capacity);
        camera
    }

    /// Publish a device with `stream_count` streams and fire the
    /// connected notification.
    ///
    /// `stream_count` other than 2 produces a malformed device, which
    /// discovery is expected to reject.
    pub fn publish_device(&self, name: &str, stream_count: u32, queue_capacity: usize) -> DeviceId {
        let mut devices = self.devices.lock().unwrap();
        let mut next = self.next_id.lock().unwrap();
        let id = *next;
        // Leave room so stream ids never collide across devices.
        *next += 1 + stream_count.max(2);

        let streams = (1..=stream_count).map(|n| id + n).collect();
        devices.push(LoopbackDevice {
            id,
            name: name.to_owned(),
            uid: format!("loopback-{id}"),
            streams,
            queue: FixedSampleQueue::new(queue_capacity),
            started: BTreeSet::new(),
            streaming_clients: false,
            handshake_exposed: true,
            last_token: None,
        });
        drop(devices);

        // No subscribers yet is fine.
        let _ = self.notify.send(id);
        id
    }

    fn with_device_of_stream<T>(
        &self,
        stream: StreamId,
        f: impl FnOnce(&mut LoopbackDevice) -> T,
    ) -> Option<T> {
        let mut devices = self.devices.lock().unwrap();
        devices
            .iter_mut()
            .find(|d| d.streams.contains(&stream))
            .map(f)
    }

    fn with_device_mut<T>(
        &self,
        device: DeviceId,
        f: impl FnOnce(&mut LoopbackDevice) -> T,
    ) -> Option<T> {
        let mut devices = self.devices.lock().unwrap();
        devices.iter_mut().find(|d| d.id == device).map(f)
    }

    // ── Consumer-side handle ─────────────────────────────────────

    /// Flip the consumer's streaming-wanted signal on `device`.
    pub fn set_streaming_wanted(&self, device: DeviceId, wanted: bool) {
        self.with_device_mut(device, |d| d.streaming_clients = wanted);
    }

    /// Make the handshake property read back as absent on `device`.
    pub fn remove_handshake_property(&self, device: DeviceId) {
        self.with_device_mut(device, |d| d.handshake_exposed = false);
    }

    /// Drain one relayed sample from `device`'s sink queue.
    ///
    /// Fires the registered readiness callback, as the real consumer
    /// does after pulling a buffer.
    pub fn take_sample(&self, device: DeviceId) -> Option<TimedSample> {
        self.with_device_mut(device, |d| d.queue.dequeue()).flatten()
    }

    /// Last liveness token written by the producer, if any.
    pub fn last_written_token(&self, device: DeviceId) -> Option<String> {
        self.with_device_mut(device, |d| d.last_token.clone())
            .flatten()
    }

    /// Whether `stream` has been started and not stopped since.
    pub fn stream_started(&self, device: DeviceId, stream: StreamId) -> bool {
        self.with_device_mut(device, |d| d.started.contains(&stream))
            .unwrap_or(false)
    }
}

impl VirtualCamera for LoopbackCamera {
    fn device_ids(&self) -> Vec<DeviceId> {
        self.devices.lock().unwrap().iter().map(|d| d.id).collect()
    }

    fn device_name(&self, device: DeviceId) -> Option<String> {
        self.with_device_mut(device, |d| d.name.clone())
    }

    fn device_uid(&self, device: DeviceId) -> Option<String> {
        self.with_device_mut(device, |d| d.uid.clone())
    }

    fn stream_ids(&self, device: DeviceId) -> Vec<StreamId> {
        self.with_device_mut(device, |d| d.streams.clone())
            .unwrap_or_default()
    }

    fn start_stream(&self, device: DeviceId, stream: StreamId) -> Result<(), VcamError> {
        self.with_device_mut(device, |d| {
            if d.streams.contains(&stream) {
                d.started.insert(stream);
                Ok(())
            } else {
                Err(VcamError::Native {
                    op: "start_stream",
                    status: BAD_OBJECT,
                })
            }
        })
        .unwrap_or(Err(VcamError::Native {
            op: "start_stream",
            status: BAD_OBJECT,
        }))
    }

    fn stop_stream(&self, device: DeviceId, stream: StreamId) -> Result<(), VcamError> {
        self.with_device_mut(device, |d| {
            d.started.remove(&stream);
        })
        .ok_or(VcamError::Native {
            op: "stop_stream",
            status: BAD_OBJECT,
        })
    }

    fn string_property(
        &self,
        stream: StreamId,
        address: &PropertyAddress,
    ) -> Result<Option<String>, VcamError> {
        self.with_device_of_stream(stream, |d| {
            let on_source = d.source_stream() == Some(stream);
            if on_source && d.handshake_exposed && address.selector == STREAM_SELECTOR {
                let value = if d.streaming_clients {
                    STREAMING_WANTED
                } else {
                    STREAMING_IDLE
                };
                Some(value.to_owned())
            } else {
                None
            }
        })
        .ok_or(VcamError::Property("unknown stream"))
    }

    fn set_string_property(
        &self,
        stream: StreamId,
        address: &PropertyAddress,
        value: &str,
    ) -> Result<(), VcamError> {
        self.with_device_of_stream(stream, |d| {
            // Producer writes are liveness pings; they never overwrite
            // the consumer's published value.
            if d.handshake_exposed && address.selector == STREAM_SELECTOR {
                d.last_token = Some(value.to_owned());
            }
        })
        .ok_or(VcamError::Property("unknown stream"))
    }

    fn sink_queue(&self, stream: StreamId) -> Option<Arc<dyn SampleQueue>> {
        self.with_device_of_stream(stream, |d| {
            if d.sink_stream() == Some(stream) {
                Some(Arc::clone(&d.queue) as Arc<dyn SampleQueue>)
            } else {
                None
            }
        })
        .flatten()
    }

    fn subscribe_connections(&self) -> broadcast::Receiver<DeviceId> {
        self.notify.subscribe()
    }
}

// ── Tests ────────────────────────────────────────────────────────
