//! Domain-specific error types for the virtual-camera relay.
//!
//! All fallible operations return `Result<T, VcamError>`.
//! Transient pipeline conditions (queue full, pool exhausted, partial
//! frame, absent property) are deliberately **not** errors — they are
//! ordinary outcomes the relay absorbs. Only configuration mistakes,
//! discovery failures, and native device-layer faults surface here.

use std::time::Duration;
use thiserror::Error;

/// The canonical error type for the relay.
#[derive(Debug, Error)]
pub enum VcamError {
    // ── Capture Errors ───────────────────────────────────────────
    /// `start_capture` was called while a session is already live.
    #[error("capture session already active")]
    CaptureActive,

    /// An operation required a live capture session and none exists.
    #[error("no active capture session")]
    CaptureNotStarted,

    /// A capture session was started with no display or window chosen.
    #[error("no display or window selected for capture")]
    NoContentSelected,

    // ── Discovery Errors ─────────────────────────────────────────
    /// No device with the configured name is currently enumerable.
    #[error("virtual camera device not found: {0}")]
    DeviceNotFound(String),

    /// The device did not expose the expected source + sink stream pair.
    ///
    /// Discovery is incomplete, not broken: callers retry on the next
    /// device-connected notification.
    #[error("unexpected stream layout: expected {expected} streams, found {actual}")]
    StreamLayout { expected: usize, actual: usize },

    /// The relay is not connected to the device (no resolved endpoints).
    #[error("not connected to the virtual camera")]
    NotConnected,

    // ── Device-Layer Errors ──────────────────────────────────────
    /// The device-emulation layer returned a non-zero status.
    #[error("device call {op} failed with status {status}")]
    Native { op: &'static str, status: i32 },

    /// A stream property exists but could not be read or written.
    #[error("property access failed: {0}")]
    Property(&'static str),

    // ── Plumbing Errors ──────────────────────────────────────────
    /// An mpsc channel was closed unexpectedly.
    #[error("channel closed")]
    ChannelClosed,

    /// An operation exceeded its deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    // ── Configuration Errors ─────────────────────────────────────
    /// A configuration value is out of range or inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for VcamError {
    fn from(s: String) -> Self {
        VcamError::Other(s)
    }
}

impl From<&str> for VcamError {
    fn from(s: &str) -> Self {
        VcamError::Other(s.to_string())
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for VcamError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        VcamError::ChannelClosed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = VcamError::DeviceNotFound("Sample Camera".into());
        assert!(e.to_string().contains("Sample Camera"));

        let e = VcamError::StreamLayout {
            expected: 2,
            actual: 1,
        };
        assert!(e.to_string().contains('2'));
        assert!(e.to_string().contains('1'));

        let e = VcamError::Native {
            op: "start_stream",
            status: -50,
        };
        assert!(e.to_string().contains("start_stream"));
        assert!(e.to_string().contains("-50"));
    }

    #[test]
    fn from_string() {
        let e: VcamError = "something broke".into();
        assert!(matches!(e, VcamError::Other(_)));
    }

    #[test]
    fn from_send_error() {
        let (tx, rx) = tokio::sync::mpsc::channel::<u8>(1);
        drop(rx);
        let send_err = tx.try_send(1).unwrap_err();
        if let tokio::sync::mpsc::error::TrySendError::Closed(_) = send_err {
            let e: VcamError = tokio::sync::mpsc::error::SendError(1u8).into();
            assert!(matches!(e, VcamError::ChannelClosed));
        }
    }
}
