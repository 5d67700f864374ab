//! The compositor collaborator seam.
//!
//! A [`CaptureSource`] wraps whatever platform API actually produces
//! display frames. The engine never talks to the platform directly;
//! it drives a source and receives `(status, frame)` units over a
//! bounded channel, which keeps the delivery context decoupled from
//! conversion (the delivery side must never stall longer than one
//! frame interval).

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::capture::config::{CaptureConfig, ContentFilter};
use crate::capture::types::{CapturedFrame, FrameStatus};
use crate::error::VcamError;

/// One delivery from the compositor: a status plus the frame payload.
///
/// Units whose status is not [`FrameStatus::Complete`] carry
/// [`CapturedFrame::INVALID`] or partially filled frames; the engine
/// drops them without surfacing an error.
#[derive(Debug, Clone)]
pub struct CaptureUnit {
    pub status: FrameStatus,
    pub frame: CapturedFrame,
}

impl CaptureUnit {
    /// A complete, valid delivery.
    pub fn complete(frame: CapturedFrame) -> Self {
        Self {
            status: FrameStatus::Complete,
            frame,
        }
    }
}

/// Channel half a source delivers into.
pub type FrameSender = mpsc::Sender<CaptureUnit>;

/// An asynchronous, reconfigurable screen-capture producer.
///
/// # Contract
///
/// - `start` begins exactly one native capture session and delivers
///   units into `tx` until `stop` is called or the session errors.
///   Dropping `tx`'s receiver must make the source wind down on its
///   own.
/// - `update` applies a new configuration/filter to the *running*
///   session without changing stream identity. Failures leave the
///   last-good configuration in effect.
/// - `stop` tears the native session down synchronously from the
///   caller's perspective and must be idempotent.
#[async_trait]
pub trait CaptureSource: Send {
    /// Start the native session, delivering frames into `tx`.
    async fn start(
        &mut self,
        config: &CaptureConfig,
        filter: &ContentFilter,
        tx: FrameSender,
    ) -> Result<(), VcamError>;

    /// Reconfigure the running session in place.
    async fn update(
        &mut self,
        config: &CaptureConfig,
        filter: &ContentFilter,
    ) -> Result<(), VcamError>;

    /// Tear the native session down. Safe to call when not running.
    async fn stop(&mut self) -> Result<(), VcamError>;
}
