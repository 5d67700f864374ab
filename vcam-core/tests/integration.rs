//! Integration tests — full pipeline lifecycle over the in-process
//! loopback camera: capture, conversion, the streaming handshake, and
//! single-frame-in-flight backpressure.

use std::sync::Arc;
use std::time::Duration;

use vcam_core::{
    CaptureConfig, CaptureTarget, FormatDescriptor, LoopbackCamera, RelayOptions, RelayService,
    SyntheticSource, VirtualCamera, capture::PixelFormat,
};

const CAM_NAME: &str = "Integration Cam";
const OUT_W: u32 = 64;
const OUT_H: u32 = 32;

// ── Helpers ──────────────────────────────────────────────────────

/// A service wired to `camera`, capturing a fast synthetic pattern.
fn relay_service(camera: &Arc<LoopbackCamera>) -> RelayService<SyntheticSource> {
    let capture = CaptureConfig {
        min_frame_interval: Duration::from_millis(1),
        ..CaptureConfig::with_fps(32, 16, 60)
    };
    let options = RelayOptions {
        camera_name: CAM_NAME.to_owned(),
        format: FormatDescriptor {
            width: OUT_W,
            height: OUT_H,
            pixel_format: PixelFormat::Bgra8,
            frame_rate: 30,
        },
        poll_interval: Duration::from_millis(5),
        pool_capacity: 4,
        ..RelayOptions::default()
    };
    RelayService::new(
        Arc::clone(camera) as Arc<dyn vcam_core::VirtualCamera>,
        SyntheticSource::new(),
        capture,
        options,
    )
}

async fn started_service(camera: &Arc<LoopbackCamera>) -> RelayService<SyntheticSource> {
    let mut service = relay_service(camera);
    service
        .recorder_mut()
        .select_target(CaptureTarget::Display(0))
        .await;
    service.start().await.unwrap();
    service
}

/// Poll `probe` every few milliseconds until it returns true.
async fn wait_until(mut probe: impl FnMut() -> bool) -> bool {
    for _ in 0..600 {
        if probe() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    false
}

// ── End-to-end relay ─────────────────────────────────────────────

#[tokio::test]
async fn frames_reach_the_sink_in_the_configured_format() {
    let camera = LoopbackCamera::with_device(CAM_NAME, 5);
    let device = camera.device_ids()[0];
    let mut service = started_service(&camera).await;

    camera.set_streaming_wanted(device, true);
    assert!(wait_until(|| camera.take_sample(device).is_some()).await);

    // Grab one more and inspect it.
    let consumer = Arc::clone(&camera);
    let got = wait_until(move || {
        if let Some(sample) = consumer.take_sample(device) {
            assert_eq!(sample.format.width, OUT_W);
            assert_eq!(sample.format.height, OUT_H);
            assert_eq!(sample.format.pixel_format, PixelFormat::Bgra8);
            assert_eq!(
                sample.buffer.as_slice().len(),
                (OUT_W * OUT_H * 4) as usize
            );
            true
        } else {
            false
        }
    })
    .await;
    assert!(got);
    service.stop().await;
}

#[tokio::test]
async fn timestamps_are_monotonic_across_samples() {
    let camera = LoopbackCamera::with_device(CAM_NAME, 5);
    let device = camera.device_ids()[0];
    let mut service = started_service(&camera).await;
    camera.set_streaming_wanted(device, true);

    let mut last = Duration::ZERO;
    let mut seen = 0;
    for _ in 0..600 {
        if let Some(sample) = camera.take_sample(device) {
            assert!(sample.pts >= last);
            last = sample.pts;
            seen += 1;
            if seen == 5 {
                break;
            }
        } else {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
    assert_eq!(seen, 5, "pipeline produced too few samples");
    service.stop().await;
}

// ── Backpressure ─────────────────────────────────────────────────

#[tokio::test]
async fn at_most_one_sample_waits_for_a_stalled_consumer() {
    let camera = LoopbackCamera::with_device(CAM_NAME, 5);
    let device = camera.device_ids()[0];
    let mut service = started_service(&camera).await;
    camera.set_streaming_wanted(device, true);

    // The consumer never drains; far more frames are captured than
    // the queue could hold, yet only the first sample is enqueued.
    assert!(wait_until(|| service.stats().enqueued >= 1).await);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(service.stats().enqueued, 1);

    // Draining one sample releases exactly one more.
    assert!(camera.take_sample(device).is_some());
    assert!(wait_until(|| service.stats().enqueued == 2).await);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(service.stats().enqueued, 2);

    service.stop().await;
}

#[tokio::test]
async fn steady_draining_recycles_the_pool_indefinitely() {
    let camera = LoopbackCamera::with_device(CAM_NAME, 5);
    let device = camera.device_ids()[0];
    let mut service = started_service(&camera).await;
    camera.set_streaming_wanted(device, true);

    // Relay far more samples than the pool holds buffers.
    let mut drained = 0u64;
    let ok = wait_until(|| {
        if camera.take_sample(device).is_some() {
            drained += 1;
        }
        drained >= 20
    })
    .await;
    assert!(ok, "pipeline stalled after {drained} samples");
    service.stop().await;
}

// ── Streaming handshake ──────────────────────────────────────────

#[tokio::test]
async fn flow_follows_the_consumer_streaming_state() {
    let camera = LoopbackCamera::with_device(CAM_NAME, 5);
    let device = camera.device_ids()[0];
    let mut service = started_service(&camera).await;

    // No consumer yet: nothing flows.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(service.stats().enqueued, 0);

    // Consumer opens the camera.
    camera.set_streaming_wanted(device, true);
    assert!(wait_until(|| camera.take_sample(device).is_some()).await);

    // Consumer closes it again: the flow stops within a poll cycle.
    camera.set_streaming_wanted(device, false);
    tokio::time::sleep(Duration::from_millis(50)).await;
    while camera.take_sample(device).is_some() {}
    let settled = service.stats().enqueued;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(service.stats().enqueued, settled);

    service.stop().await;
}

#[tokio::test]
async fn missing_handshake_property_halts_the_flow_gracefully() {
    let camera = LoopbackCamera::with_device(CAM_NAME, 5);
    let device = camera.device_ids()[0];
    let mut service = started_service(&camera).await;

    camera.set_streaming_wanted(device, true);
    assert!(wait_until(|| camera.take_sample(device).is_some()).await);

    camera.remove_handshake_property(device);
    tokio::time::sleep(Duration::from_millis(50)).await;
    while camera.take_sample(device).is_some() {}
    let settled = service.stats().enqueued;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(service.stats().enqueued, settled);
    assert!(service.is_running());

    service.stop().await;
}

// ── Discovery ────────────────────────────────────────────────────

#[tokio::test]
async fn binds_and_relays_after_late_device_publication() {
    let camera = LoopbackCamera::empty();
    let mut service = started_service(&camera).await;
    assert!(!service.is_bound());

    let device = camera.publish_device(CAM_NAME, 2, 5);
    assert!(wait_until(|| service.is_bound()).await);

    camera.set_streaming_wanted(device, true);
    assert!(wait_until(|| camera.take_sample(device).is_some()).await);
    service.stop().await;
}

#[tokio::test]
async fn malformed_device_is_skipped_until_a_complete_one_publishes() {
    let camera = LoopbackCamera::empty();
    // Same name, wrong shape: discovery must reject it.
    camera.publish_device(CAM_NAME, 1, 5);

    let mut service = started_service(&camera).await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(!service.is_bound());

    let device = camera.publish_device(CAM_NAME, 2, 5);
    assert!(wait_until(|| service.is_bound()).await);
    camera.set_streaming_wanted(device, true);
    assert!(wait_until(|| camera.take_sample(device).is_some()).await);
    service.stop().await;
}

// ── Lifecycle ────────────────────────────────────────────────────

#[tokio::test]
async fn restart_produces_a_working_pipeline() {
    let camera = LoopbackCamera::with_device(CAM_NAME, 5);
    let device = camera.device_ids()[0];
    let mut service = started_service(&camera).await;

    camera.set_streaming_wanted(device, true);
    assert!(wait_until(|| camera.take_sample(device).is_some()).await);

    service.stop().await;
    assert!(!service.is_running());
    while camera.take_sample(device).is_some() {}

    service.start().await.unwrap();
    camera.set_streaming_wanted(device, true);
    assert!(wait_until(|| camera.take_sample(device).is_some()).await);
    service.stop().await;
}
