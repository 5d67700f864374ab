//! Deterministic synthetic capture source.
//!
//! Generates a moving white stripe over a dark background — the same
//! pattern the device extension uses as its placeholder feed — at the
//! configured frame cap. Serves as the daemon's demo producer and as
//! the test double for engine/service tests: it honours the full
//! [`CaptureSource`] contract including mid-stream reconfiguration
//! and clean teardown.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::capture::config::{CaptureConfig, ContentFilter};
use crate::capture::source::{CaptureSource, CaptureUnit, FrameSender};
use crate::capture::types::{CapturedFrame, FrameStatus, PixelFormat, Surface};
use crate::error::VcamError;

/// BGRA background the stripe moves across.
const BACKGROUND: [u8; 4] = [40, 40, 40, 255];
/// BGRA stripe colour.
const STRIPE: [u8; 4] = [255, 255, 255, 255];
/// Stripe thickness in rows.
const STRIPE_HEIGHT: u32 = 8;
/// Rows the stripe advances per frame.
const STRIPE_STEP: u32 = 4;

// ── SyntheticSource ──────────────────────────────────────────────

/// A paced test-pattern producer.
pub struct SyntheticSource {
    /// Emit a non-complete unit every N frames (test hook).
    idle_every: Option<u64>,
    /// Make `update` fail (test hook for last-good-config behaviour).
    fail_updates: bool,
    running: Option<Running>,
}

struct Running {
    token: CancellationToken,
    handle: JoinHandle<()>,
    shared: Arc<Mutex<CaptureConfig>>,
}

impl SyntheticSource {
    pub fn new() -> Self {
        Self {
            idle_every: None,
            fail_updates: false,
            running: None,
        }
    }

    /// Interleave an `Idle` unit every `n` deliveries.
    pub fn with_idle_every(mut self, n: u64) -> Self {
        self.idle_every = Some(n.max(2));
        self
    }

    /// Make every `update` call fail, leaving the session running.
    pub fn with_failing_updates(mut self) -> Self {
        self.fail_updates = true;
        self
    }

    /// Render one BGRA stripe frame at `stripe_row`.
    fn render(config: &CaptureConfig, stripe_row: u32) -> CapturedFrame {
        let (width, height) = (config.width, config.height);
        let stride = width * 4;
        let mut data = vec![0u8; (stride * height) as usize];
        for y in 0..height {
            let in_stripe = y >= stripe_row && y < stripe_row.saturating_add(STRIPE_HEIGHT);
            let colour = if in_stripe { STRIPE } else { BACKGROUND };
            let row = &mut data[(y * stride) as usize..((y + 1) * stride) as usize];
            for px in row.chunks_exact_mut(4) {
                px.copy_from_slice(&colour);
            }
        }
        let surface = Arc::new(Surface {
            width,
            height,
            stride,
            format: PixelFormat::Bgra8,
            data: Bytes::from(data),
        });
        CapturedFrame::full_surface(surface, 1.0, 2.0)
    }
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaptureSource for SyntheticSource {
    async fn start(
        &mut self,
        config: &CaptureConfig,
        _filter: &ContentFilter,
        tx: FrameSender,
    ) -> Result<(), VcamError> {
        if self.running.is_some() {
            return Err(VcamError::CaptureActive);
        }

        let token = CancellationToken::new();
        let shared = Arc::new(Mutex::new(config.clone()));
        let task_token = token.clone();
        let task_shared = Arc::clone(&shared);
        let idle_every = self.idle_every;

        let handle = tokio::spawn(async move {
            let mut stripe_row: u32 = 0;
            let mut ascending = true;
            let mut sequence: u64 = 0;

            loop {
                let (interval, config) = {
                    let cfg = task_shared.lock().unwrap();
                    (cfg.min_frame_interval, cfg.clone())
                };
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }

                sequence += 1;
                let unit = match idle_every {
                    Some(n) if sequence % n == 0 => CaptureUnit {
                        status: FrameStatus::Idle,
                        frame: CapturedFrame::INVALID,
                    },
                    _ => {
                        let frame = Self::render(&config, stripe_row);
                        // Bounce the stripe between the frame edges.
                        let limit = config.height.saturating_sub(STRIPE_HEIGHT);
                        if ascending {
                            stripe_row = stripe_row.saturating_add(STRIPE_STEP);
                            if stripe_row >= limit {
                                stripe_row = limit;
                                ascending = false;
                            }
                        } else {
                            stripe_row = stripe_row.saturating_sub(STRIPE_STEP);
                            if stripe_row == 0 {
                                ascending = true;
                            }
                        }
                        CaptureUnit::complete(frame)
                    }
                };

                // Receiver gone means the engine finished the stream.
                if tx.send(unit).await.is_err() {
                    break;
                }
            }
        });

        self.running = Some(Running {
            token,
            handle,
            shared,
        });
        Ok(())
    }

    async fn update(
        &mut self,
        config: &CaptureConfig,
        _filter: &ContentFilter,
    ) -> Result<(), VcamError> {
        if self.fail_updates {
            return Err(VcamError::Native {
                op: "update_configuration",
                status: -1,
            });
        }
        if let Some(running) = &self.running {
            *running.shared.lock().unwrap() = config.clone();
        }
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), VcamError> {
        if let Some(running) = self.running.take() {
            running.token.cancel();
            let _ = running.handle.await;
        }
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
