//! Capture engine: turns a [`CaptureSource`] into a lazy frame stream.
//!
//! The engine owns the one-session-per-adapter guard, the funnel task
//! that silently discards non-complete deliveries, mid-stream
//! reconfiguration with last-good fallback, and clean, awaited
//! teardown. The returned [`FrameStream`] ends without an error when
//! capture stops; it is not restartable — a new `start_capture` call
//! produces a fresh stream.

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::capture::config::{CaptureConfig, ContentFilter};
use crate::capture::source::CaptureSource;
use crate::capture::types::{CapturedFrame, FrameStatus};
use crate::error::VcamError;

// ── FrameStream ──────────────────────────────────────────────────

/// The lazy, cancellable sequence of complete captured frames.
///
/// Yields frames in capture order; returns `None` once the session
/// has been stopped (clean end-of-stream, never an error).
#[derive(Debug)]
pub struct FrameStream {
    rx: mpsc::Receiver<CapturedFrame>,
}

impl FrameStream {
    /// Await the next complete frame, or `None` at end-of-stream.
    pub async fn next(&mut self) -> Option<CapturedFrame> {
        self.rx.recv().await
    }
}

impl Stream for FrameStream {
    type Item = CapturedFrame;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

// ── CaptureEngine ────────────────────────────────────────────────

/// Wraps a capture source and exposes its output as a [`FrameStream`].
pub struct CaptureEngine<S: CaptureSource> {
    source: S,
    session: Option<Session>,
    last_good: Option<(CaptureConfig, ContentFilter)>,
    dropped_incomplete: Arc<AtomicU64>,
}

struct Session {
    funnel: JoinHandle<()>,
}

impl<S: CaptureSource> CaptureEngine<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            session: None,
            last_good: None,
            dropped_incomplete: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Whether a capture session is currently live.
    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    /// Units discarded because their status was not `Complete`.
    pub fn dropped_incomplete(&self) -> u64 {
        self.dropped_incomplete.load(Ordering::Relaxed)
    }

    /// The configuration the running session currently uses.
    pub fn current_config(&self) -> Option<&CaptureConfig> {
        self.last_good.as_ref().map(|(c, _)| c)
    }

    /// Start a capture session and return its frame stream.
    ///
    /// Exactly one native session may be alive per engine; a second
    /// call while running fails with [`VcamError::CaptureActive`]
    /// rather than creating a second session.
    pub async fn start_capture(
        &mut self,
        config: &CaptureConfig,
        filter: &ContentFilter,
    ) -> Result<FrameStream, VcamError> {
        if self.session.is_some() {
            return Err(VcamError::CaptureActive);
        }

        let depth = config.queue_depth.max(1) as usize;
        let (raw_tx, mut raw_rx) = mpsc::channel(depth);
        let (out_tx, out_rx) = mpsc::channel(depth);

        self.source.start(config, filter, raw_tx).await?;

        // Funnel: forward complete frames, silently drop the rest.
        // Partial frames are expected during resize/reconfigure and
        // must not break the sequence.
        let dropped = Arc::clone(&self.dropped_incomplete);
        let funnel = tokio::spawn(async move {
            while let Some(unit) = raw_rx.recv().await {
                if unit.status == FrameStatus::Complete && unit.frame.is_valid() {
                    if out_tx.send(unit.frame).await.is_err() {
                        break;
                    }
                } else {
                    dropped.fetch_add(1, Ordering::Relaxed);
                    trace!(status = ?unit.status, "dropping non-complete capture unit");
                }
            }
        });

        self.session = Some(Session { funnel });
        self.last_good = Some((config.clone(), filter.clone()));
        debug!(
            width = config.width,
            height = config.height,
            "capture session started"
        );
        Ok(FrameStream { rx: out_rx })
    }

    /// Reconfigure the running session without losing stream identity.
    ///
    /// A failed update is logged and the previous configuration stays
    /// in effect; the stream keeps running either way. No-op when no
    /// session is live.
    pub async fn update(&mut self, config: &CaptureConfig, filter: &ContentFilter) {
        if self.session.is_none() {
            return;
        }
        match self.source.update(config, filter).await {
            Ok(()) => {
                self.last_good = Some((config.clone(), filter.clone()));
                debug!("capture configuration updated");
            }
            Err(e) => {
                warn!("capture update failed, keeping previous configuration: {e}");
            }
        }
    }

    /// Stop the session and finalize the stream.
    ///
    /// Awaited: the native session and the funnel task are released
    /// before this returns, so a subsequent `start_capture` sees a
    /// clean slate. Idempotent and safe when never started.
    pub async fn stop_capture(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        if let Err(e) = self.source.stop().await {
            warn!("capture source stop reported: {e}");
        }
        // The source dropped its sender; the funnel drains and exits.
        let _ = session.funnel.await;
        debug!("capture session stopped");
    }
}

// ── Tests ────────────────────────────────────────────────────────
