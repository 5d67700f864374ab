//! Device and stream discovery.
//!
//! Finds the named virtual camera in the registry and resolves its
//! two streams: the first published stream carries the extension's
//! own output (source), the second accepts relayed frames (sink).
//! A device that is mid-publication can briefly expose the wrong
//! stream count; that is reported as an incomplete layout and retried
//! on the next device-connected notification.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::device::virtual_device::{DeviceId, StreamId, VirtualCamera};
use crate::error::VcamError;

/// Number of streams the virtual camera publishes.
const EXPECTED_STREAMS: usize = 2;

// ── StreamEndpoints ──────────────────────────────────────────────

/// Resolved handles onto the virtual camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamEndpoints {
    pub device: DeviceId,
    /// The extension's output stream; carries the handshake property.
    pub source_stream: StreamId,
    /// The stream whose queue accepts relayed frames.
    pub sink_stream: StreamId,
}

/// Resolve the named device's source and sink streams.
///
/// Several registered devices may carry the name (e.g. one
/// mid-publication); the first with a complete stream layout wins.
pub fn discover(camera: &dyn VirtualCamera, name: &str) -> Result<StreamEndpoints, VcamError> {
    let mut incomplete_layout = None;
    for device in camera.device_ids() {
        if camera.device_name(device).as_deref() != Some(name) {
            continue;
        }
        let streams = camera.stream_ids(device);
        if streams.len() != EXPECTED_STREAMS {
            incomplete_layout = Some(streams.len());
            continue;
        }
        let endpoints = StreamEndpoints {
            device,
            source_stream: streams[0],
            sink_stream: streams[1],
        };
        let uid = camera.device_uid(device).unwrap_or_default();
        debug!(
            device = endpoints.device,
            %uid,
            source = endpoints.source_stream,
            sink = endpoints.sink_stream,
            "resolved virtual camera streams"
        );
        return Ok(endpoints);
    }
    match incomplete_layout {
        Some(actual) => Err(VcamError::StreamLayout {
            expected: EXPECTED_STREAMS,
            actual,
        }),
        None => Err(VcamError::DeviceNotFound(name.to_owned())),
    }
}

// ── DiscoveryWatcher ─────────────────────────────────────────────

/// Retries discovery as devices appear in the registry.
pub struct DiscoveryWatcher {
    camera: Arc<dyn VirtualCamera>,
    name: String,
}

impl DiscoveryWatcher {
    pub fn new(camera: Arc<dyn VirtualCamera>, name: impl Into<String>) -> Self {
        Self {
            camera,
            name: name.into(),
        }
    }

    /// Try once, without waiting.
    pub fn try_discover(&self) -> Result<StreamEndpoints, VcamError> {
        discover(self.camera.as_ref(), &self.name)
    }

    /// Resolve the endpoints, waiting on device-connected
    /// notifications until the named device publishes a complete
    /// stream layout. Cancel by dropping the future.
    pub async fn wait_for_endpoints(&self) -> StreamEndpoints {
        // Subscribe before probing so a publication racing the first
        // attempt is not missed.
        let mut notifications = self.camera.subscribe_connections();
        loop {
            match self.try_discover() {
                Ok(endpoints) => {
                    info!(device = endpoints.device, name = %self.name, "virtual camera connected");
                    return endpoints;
                }
                Err(e) => debug!(name = %self.name, "discovery pending: {e}"),
            }
            match notifications.recv().await {
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => {
                    // Registry gone; nothing will ever publish. Poll
                    // slowly so callers can still cancel us.
                    warn!("device notification channel closed");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::loopback::LoopbackCamera;
    use std::time::Duration;

    #[test]
    fn finds_the_named_device() {
        let camera = LoopbackCamera::with_device("Relay Cam", 5);
        let endpoints = discover(camera.as_ref(), "Relay Cam").unwrap();
        let streams = camera.stream_ids(endpoints.device);
        assert_eq!(endpoints.source_stream, streams[0]);
        assert_eq!(endpoints.sink_stream, streams[1]);
    }

    #[test]
    fn missing_device_is_reported_by_name() {
        let camera = LoopbackCamera::with_device("Relay Cam", 5);
        let err = discover(camera.as_ref(), "Other Cam").unwrap_err();
        assert!(matches!(err, VcamError::DeviceNotFound(name) if name == "Other Cam"));
    }

    #[test]
    fn incomplete_stream_layout_is_rejected() {
        let camera = LoopbackCamera::empty();
        camera.publish_device("Relay Cam", 1, 5);
        let err = discover(camera.as_ref(), "Relay Cam").unwrap_err();
        assert!(matches!(
            err,
            VcamError::StreamLayout {
                expected: 2,
                actual: 1
            }
        ));
    }

    #[tokio::test]
    async fn watcher_binds_when_the_device_publishes_late() {
        let camera = LoopbackCamera::empty();
        let watcher = DiscoveryWatcher::new(
            Arc::clone(&camera) as Arc<dyn VirtualCamera>,
            "Late Cam",
        );

        let publisher = Arc::clone(&camera);
        let task = tokio::spawn(async move { watcher.wait_for_endpoints().await });

        // Let the watcher reach its subscription, then publish a decoy
        // followed by the real device.
        tokio::time::sleep(Duration::from_millis(20)).await;
        publisher.publish_device("Decoy", 2, 5);
        publisher.publish_device("Late Cam", 2, 5);

        let endpoints = tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            camera.device_name(endpoints.device).as_deref(),
            Some("Late Cam")
        );
    }
}
