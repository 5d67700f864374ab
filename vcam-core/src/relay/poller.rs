//! Streaming-state poller.
//!
//! The device layer has no push channel for "a client opened the
//! camera", so the relay polls the handshake property on the source
//! stream: write a liveness token, read the value back, and treat
//! anything other than the streaming-wanted magic as "no consumer".
//! Poll failures and an absent property degrade to not-streaming
//! rather than erroring.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::device::property::{PropertyAddress, STREAM_SELECTOR, STREAMING_WANTED};
use crate::device::virtual_device::{StreamId, VirtualCamera};
use crate::relay::controller::RelayController;

/// How often the handshake property is sampled.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

// ── PropertyPoller ───────────────────────────────────────────────

/// Periodically mirrors the device's streaming state into the
/// relay controller.
pub struct PropertyPoller {
    camera: Arc<dyn VirtualCamera>,
    controller: Arc<RelayController>,
    /// Source stream, filled in once discovery binds.
    source: Arc<Mutex<Option<StreamId>>>,
    interval: Duration,
    sequence: AtomicU64,
}

impl PropertyPoller {
    pub fn new(
        camera: Arc<dyn VirtualCamera>,
        controller: Arc<RelayController>,
        source: Arc<Mutex<Option<StreamId>>>,
        interval: Duration,
    ) -> Self {
        Self {
            camera,
            controller,
            source,
            interval,
            sequence: AtomicU64::new(0),
        }
    }

    /// One poll cycle: ping, read back, update the controller.
    pub fn poll_once(&self) {
        let Some(stream) = *self.source.lock().unwrap() else {
            self.controller.set_need_to_stream(false);
            return;
        };

        let address = PropertyAddress::global_main(STREAM_SELECTOR);
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        if let Err(e) = self
            .camera
            .set_string_property(stream, &address, &format!("ping={seq}"))
        {
            debug!("liveness write failed: {e}");
        }

        let wanted = match self.camera.string_property(stream, &address) {
            Ok(Some(value)) => value == STREAMING_WANTED,
            Ok(None) => false,
            Err(e) => {
                debug!("handshake read failed: {e}");
                false
            }
        };
        self.controller.set_need_to_stream(wanted);
    }

    /// Run the poll loop until `token` is cancelled.
    pub fn spawn(self, token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => self.poll_once(),
                }
            }
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::loopback::LoopbackCamera;

    fn poller_for(
        camera: &Arc<LoopbackCamera>,
        source: Option<StreamId>,
    ) -> (PropertyPoller, Arc<RelayController>) {
        let controller = Arc::new(RelayController::new());
        let poller = PropertyPoller::new(
            Arc::clone(camera) as Arc<dyn VirtualCamera>,
            Arc::clone(&controller),
            Arc::new(Mutex::new(source)),
            Duration::from_millis(5),
        );
        (poller, controller)
    }

    #[test]
    fn mirrors_the_consumer_streaming_state() {
        let camera = LoopbackCamera::with_device("Cam", 5);
        let device = camera.device_ids()[0];
        let source = camera.stream_ids(device)[0];
        let (poller, controller) = poller_for(&camera, Some(source));

        poller.poll_once();
        assert!(!controller.streaming_wanted());

        camera.set_streaming_wanted(device, true);
        poller.poll_once();
        assert!(controller.streaming_wanted());

        camera.set_streaming_wanted(device, false);
        poller.poll_once();
        assert!(!controller.streaming_wanted());
    }

    #[test]
    fn absent_property_means_not_streaming() {
        let camera = LoopbackCamera::with_device("Cam", 5);
        let device = camera.device_ids()[0];
        let source = camera.stream_ids(device)[0];
        camera.set_streaming_wanted(device, true);
        camera.remove_handshake_property(device);

        let (poller, controller) = poller_for(&camera, Some(source));
        poller.poll_once();
        assert!(!controller.streaming_wanted());
    }

    #[test]
    fn unbound_source_means_not_streaming() {
        let camera = LoopbackCamera::with_device("Cam", 5);
        let (poller, controller) = poller_for(&camera, None);
        controller.set_need_to_stream(true);
        poller.poll_once();
        assert!(!controller.streaming_wanted());
    }

    #[test]
    fn each_poll_writes_a_fresh_liveness_token() {
        let camera = LoopbackCamera::with_device("Cam", 5);
        let device = camera.device_ids()[0];
        let source = camera.stream_ids(device)[0];
        let (poller, _) = poller_for(&camera, Some(source));

        poller.poll_once();
        let first = camera.last_written_token(device).unwrap();
        poller.poll_once();
        let second = camera.last_written_token(device).unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn spawned_loop_polls_and_cancels() {
        let camera = LoopbackCamera::with_device("Cam", 5);
        let device = camera.device_ids()[0];
        let source = camera.stream_ids(device)[0];
        camera.set_streaming_wanted(device, true);

        let (poller, controller) = poller_for(&camera, Some(source));
        let token = CancellationToken::new();
        let handle = poller.spawn(token.clone());

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(controller.streaming_wanted());

        token.cancel();
        handle.await.unwrap();
    }
}
