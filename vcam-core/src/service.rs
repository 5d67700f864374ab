//! Pipeline orchestration.
//!
//! Wires the capture recorder, the frame converter, the relay
//! controller and the device bridge into one running service: a
//! watcher task that binds to the virtual camera as soon as it
//! publishes, a poller task that mirrors the device's streaming state,
//! and a single relay task that serializes admit → convert → enqueue
//! so frames reach the sink queue in capture order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::bridge::queue::SampleQueue;
use crate::bridge::relay::DeviceBridge;
use crate::bridge::sample::FormatDescriptor;
use crate::capture::config::CaptureConfig;
use crate::capture::engine::FrameStream;
use crate::capture::recorder::ScreenRecorder;
use crate::capture::source::CaptureSource;
use crate::capture::types::{PixelFormat, Size};
use crate::convert::converter::FrameConverter;
use crate::device::discovery;
use crate::device::virtual_device::{StreamId, VirtualCamera};
use crate::error::VcamError;
use crate::relay::controller::{Admission, RelayController};
use crate::relay::poller::{DEFAULT_POLL_INTERVAL, PropertyPoller};

// ── Defaults ─────────────────────────────────────────────────────

/// Name under which the virtual camera publishes itself.
pub const DEVICE_NAME: &str = "Relay Virtual Camera";
/// Fixed output geometry every relayed sample carries.
pub const OUTPUT_WIDTH: u32 = 1280;
pub const OUTPUT_HEIGHT: u32 = 720;
/// Nominal output frame rate advertised to consumers.
pub const OUTPUT_FRAME_RATE: u32 = 30;

const DEFAULT_POOL_CAPACITY: usize = 8;

// ── RelayOptions ─────────────────────────────────────────────────

/// Tunables for one relay service instance.
#[derive(Debug, Clone)]
pub struct RelayOptions {
    /// Device name to discover in the registry.
    pub camera_name: String,
    /// Fixed output format (pool geometry, sample descriptor).
    pub format: FormatDescriptor,
    /// Handshake-property poll cadence.
    pub poll_interval: Duration,
    /// Mirror output horizontally.
    pub mirror: bool,
    /// Pre-allocated buffers per device connection.
    pub pool_capacity: usize,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            camera_name: DEVICE_NAME.to_owned(),
            format: FormatDescriptor {
                width: OUTPUT_WIDTH,
                height: OUTPUT_HEIGHT,
                pixel_format: PixelFormat::Bgra8,
                frame_rate: OUTPUT_FRAME_RATE,
            },
            poll_interval: DEFAULT_POLL_INTERVAL,
            mirror: false,
            pool_capacity: DEFAULT_POOL_CAPACITY,
        }
    }
}

/// Counters exposed for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Samples handed to the sink queue.
    pub enqueued: u64,
    /// Admitted frames the queue or device layer rejected.
    pub rejected: u64,
    /// Frames dropped by the streaming/backpressure gate.
    pub gated: u64,
}

// ── Connection ───────────────────────────────────────────────────

/// Everything bound to one discovered device.
///
/// Pool, bridge and converter live exactly as long as the binding.
#[derive(Clone)]
struct Connection {
    endpoints: discovery::StreamEndpoints,
    queue: Arc<dyn SampleQueue>,
    bridge: Arc<DeviceBridge>,
    converter: Arc<FrameConverter>,
}

type ConnectionSlot = Arc<Mutex<Option<Connection>>>;

/// Discover the device and bind queue, pool and converter to it.
fn bind_device(
    camera: &Arc<dyn VirtualCamera>,
    options: &RelayOptions,
    controller: &Arc<RelayController>,
    connection: &ConnectionSlot,
    source_stream: &Arc<Mutex<Option<StreamId>>>,
) -> Result<(), VcamError> {
    let endpoints = discovery::discover(camera.as_ref(), &options.camera_name)?;
    let queue = camera
        .sink_queue(endpoints.sink_stream)
        .ok_or(VcamError::Property("sink stream exposes no sample queue"))?;

    let ready = Arc::clone(controller);
    queue.set_ready_callback(Some(Box::new(move || ready.mark_ready())));
    camera.start_stream(endpoints.device, endpoints.sink_stream)?;

    let bridge = Arc::new(DeviceBridge::new(
        options.format,
        options.pool_capacity,
        None,
    ));
    let converter = Arc::new(FrameConverter::new(bridge.pool().clone()));

    *source_stream.lock().unwrap() = Some(endpoints.source_stream);
    *connection.lock().unwrap() = Some(Connection {
        endpoints,
        queue,
        bridge,
        converter,
    });
    info!(
        device = endpoints.device,
        sink = endpoints.sink_stream,
        "bound to virtual camera"
    );
    Ok(())
}

// ── RelayService ─────────────────────────────────────────────────

/// The assembled capture → convert → enqueue pipeline.
pub struct RelayService<S: CaptureSource> {
    camera: Arc<dyn VirtualCamera>,
    options: RelayOptions,
    recorder: ScreenRecorder<S>,
    controller: Arc<RelayController>,
    connection: ConnectionSlot,
    source_stream: Arc<Mutex<Option<StreamId>>>,
    content_size: Arc<Mutex<Size>>,
    gated: Arc<AtomicU64>,
    token: Option<CancellationToken>,
    tasks: Vec<JoinHandle<()>>,
}

impl<S: CaptureSource> RelayService<S> {
    pub fn new(
        camera: Arc<dyn VirtualCamera>,
        source: S,
        capture_config: CaptureConfig,
        options: RelayOptions,
    ) -> Self {
        Self {
            camera,
            options,
            recorder: ScreenRecorder::new(source, capture_config),
            controller: Arc::new(RelayController::new()),
            connection: Arc::new(Mutex::new(None)),
            source_stream: Arc::new(Mutex::new(None)),
            content_size: Arc::new(Mutex::new(Size::new(1, 1))),
            gated: Arc::new(AtomicU64::new(0)),
            token: None,
            tasks: Vec::new(),
        }
    }

    /// Capture selection and exclusions live on the recorder.
    pub fn recorder_mut(&mut self) -> &mut ScreenRecorder<S> {
        &mut self.recorder
    }

    pub fn recorder(&self) -> &ScreenRecorder<S> {
        &self.recorder
    }

    pub fn is_running(&self) -> bool {
        self.token.is_some()
    }

    /// Whether discovery has bound to the device yet.
    pub fn is_bound(&self) -> bool {
        self.connection.lock().unwrap().is_some()
    }

    /// Content size of the most recently relayed frame.
    pub fn content_size(&self) -> Size {
        *self.content_size.lock().unwrap()
    }

    pub fn stats(&self) -> RelayStats {
        let (enqueued, rejected) = match self.connection.lock().unwrap().as_ref() {
            Some(conn) => (conn.bridge.enqueued_count(), conn.bridge.rejected_count()),
            None => (0, 0),
        };
        RelayStats {
            enqueued,
            rejected,
            gated: self.gated.load(Ordering::Relaxed),
        }
    }

    /// Start the pipeline.
    ///
    /// An unpublished device is not fatal: the service starts in the
    /// unbound state and binds on the device-connected notification.
    /// A missing capture selection is fatal to this call only.
    pub async fn start(&mut self) -> Result<(), VcamError> {
        if self.token.is_some() {
            return Err(VcamError::CaptureActive);
        }
        let token = CancellationToken::new();

        // Subscribe before the first probe so a device publishing in
        // between cannot slip past the watcher.
        let notifications = self.camera.subscribe_connections();

        if let Err(e) = bind_device(
            &self.camera,
            &self.options,
            &self.controller,
            &self.connection,
            &self.source_stream,
        ) {
            match e {
                VcamError::DeviceNotFound(_) | VcamError::StreamLayout { .. } => {
                    debug!("device not ready ({e}); will bind when it publishes");
                }
                other => return Err(other),
            }
        }

        let watcher = self.spawn_watcher(notifications, token.clone());
        let poller = PropertyPoller::new(
            Arc::clone(&self.camera),
            Arc::clone(&self.controller),
            Arc::clone(&self.source_stream),
            self.options.poll_interval,
        )
        .spawn(token.clone());

        let stream = match self.recorder.start().await {
            Ok(stream) => stream,
            Err(e) => {
                token.cancel();
                let _ = watcher.await;
                let _ = poller.await;
                return Err(e);
            }
        };
        let relay = self.spawn_relay(stream, token.clone());

        self.tasks = vec![watcher, poller, relay];
        self.token = Some(token);
        info!(camera = %self.options.camera_name, "relay service started");
        Ok(())
    }

    /// Stop the pipeline. Idempotent; the device binding survives so a
    /// later `start` skips rediscovery delay.
    pub async fn stop(&mut self) {
        let Some(token) = self.token.take() else {
            return;
        };
        // Ending capture finalizes the frame stream, which lets the
        // relay task drain and exit before cancellation races it.
        self.recorder.stop().await;
        token.cancel();
        for task in self.tasks.drain(..) {
            let _ = task.await;
        }

        let binding = self.connection.lock().unwrap().clone();
        if let Some(conn) = binding {
            if let Err(e) = self
                .camera
                .stop_stream(conn.endpoints.device, conn.endpoints.sink_stream)
            {
                warn!("sink stream stop reported: {e}");
            }
        }
        self.controller.reset();
        info!("relay service stopped");
    }

    // ── Tasks ────────────────────────────────────────────────────

    fn spawn_watcher(
        &self,
        mut notifications: tokio::sync::broadcast::Receiver<crate::device::DeviceId>,
        token: CancellationToken,
    ) -> JoinHandle<()> {
        let camera = Arc::clone(&self.camera);
        let options = self.options.clone();
        let controller = Arc::clone(&self.controller);
        let connection = Arc::clone(&self.connection);
        let source_stream = Arc::clone(&self.source_stream);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    event = notifications.recv() => {
                        if event.is_err() {
                            // Lagged is harmless; Closed means the
                            // registry is gone for good.
                            if matches!(
                                event,
                                Err(tokio::sync::broadcast::error::RecvError::Closed)
                            ) {
                                break;
                            }
                        }
                        if connection.lock().unwrap().is_some() {
                            continue;
                        }
                        if let Err(e) = bind_device(
                            &camera,
                            &options,
                            &controller,
                            &connection,
                            &source_stream,
                        ) {
                            debug!("discovery retry pending: {e}");
                        }
                    }
                }
            }
        })
    }

    fn spawn_relay(&self, mut stream: FrameStream, token: CancellationToken) -> JoinHandle<()> {
        let controller = Arc::clone(&self.controller);
        let connection = Arc::clone(&self.connection);
        let content_size = Arc::clone(&self.content_size);
        let gated = Arc::clone(&self.gated);
        let mirror = self.options.mirror;

        tokio::spawn(async move {
            loop {
                let frame = tokio::select! {
                    _ = token.cancelled() => break,
                    next = stream.next() => match next {
                        Some(frame) => frame,
                        None => break,
                    },
                };
                *content_size.lock().unwrap() = frame.size();

                if !controller.streaming_wanted() {
                    gated.fetch_add(1, Ordering::Relaxed);
                    continue;
                }
                let binding = connection.lock().unwrap().clone();
                let Some(conn) = binding else {
                    gated.fetch_add(1, Ordering::Relaxed);
                    continue;
                };
                // Pool exhaustion or an invalid frame: skip, next
                // frame gets a fresh chance.
                let Some(buffer) = conn.converter.convert(&frame, mirror) else {
                    trace!("frame skipped, no buffer available");
                    continue;
                };
                match controller.admit() {
                    Admission::Drop => {
                        gated.fetch_add(1, Ordering::Relaxed);
                        // Buffer drops back into the pool here.
                    }
                    Admission::Attempt => {
                        let outcome = conn.bridge.enqueue(conn.queue.as_ref(), buffer);
                        controller.record_outcome(outcome);
                    }
                }
            }
            debug!("relay loop finished");
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────
