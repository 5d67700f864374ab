//! Single-frame-in-flight backpressure controller.
//!
//! Decouples a fast capture rate from the consumer's actual drain
//! rate: at most one unacknowledged frame is ever pushed toward the
//! device queue, and the freshest frame always wins over queuing
//! stale ones. Three callback contexts feed this state — capture
//! delivery, queue readiness, and the property poll — so everything
//! lives behind one coarse mutex; unsynchronized flag races here are
//! the classic source of dropped or duplicated frames.

use std::sync::Mutex;

use crate::bridge::queue::EnqueueOutcome;

// ── RelayPhase ───────────────────────────────────────────────────

/// Where the relay stands with respect to the device queue.
///
/// ```text
///  Idle ──(enqueue succeeded)──► PendingEnqueue ──(reset)──► Idle
///                                     │  ▲
///          (ready fired, attempt) ────┘  │ stays pending
///                                        │ regardless of outcome
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelayPhase {
    /// No frame pending acknowledgement.
    #[default]
    Idle,
    /// A frame was enqueued; waiting for the consumer to drain it.
    PendingEnqueue,
}

/// Verdict for one converted frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Drop the frame; no enqueue attempt.
    Drop,
    /// Attempt exactly one enqueue, then report via `record_outcome`.
    Attempt,
}

// ── RelayController ──────────────────────────────────────────────

#[derive(Debug, Default)]
struct ControllerState {
    phase: RelayPhase,
    need_to_stream: bool,
    ready_to_enqueue: bool,
}

/// The polling/readiness state machine gating every enqueue.
#[derive(Debug, Default)]
pub struct RelayController {
    state: Mutex<ControllerState>,
}

impl RelayController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue readiness callback: the consumer drained a buffer.
    ///
    /// May be invoked from any context.
    pub fn mark_ready(&self) {
        self.state.lock().unwrap().ready_to_enqueue = true;
    }

    /// Poll result: does the downstream consumer want frames?
    ///
    /// An absent handshake property degrades to `false`.
    pub fn set_need_to_stream(&self, wanted: bool) {
        self.state.lock().unwrap().need_to_stream = wanted;
    }

    /// Cheap pre-conversion gate (no state change).
    pub fn streaming_wanted(&self) -> bool {
        self.state.lock().unwrap().need_to_stream
    }

    pub fn phase(&self) -> RelayPhase {
        self.state.lock().unwrap().phase
    }

    /// Evaluate the transition rules for one converted frame.
    ///
    /// - Not streaming → `Drop`, no state change.
    /// - `Idle` → `Attempt` (the outcome decides the transition).
    /// - `PendingEnqueue` → `Attempt` only if readiness fired since
    ///   entering the phase; the flag is consumed here and the phase
    ///   stays `PendingEnqueue` whatever the outcome.
    pub fn admit(&self) -> Admission {
        let mut state = self.state.lock().unwrap();
        if !state.need_to_stream {
            return Admission::Drop;
        }
        match state.phase {
            RelayPhase::Idle => Admission::Attempt,
            RelayPhase::PendingEnqueue => {
                if state.ready_to_enqueue {
                    state.ready_to_enqueue = false;
                    Admission::Attempt
                } else {
                    Admission::Drop
                }
            }
        }
    }

    /// Report the outcome of an admitted enqueue attempt.
    pub fn record_outcome(&self, outcome: EnqueueOutcome) {
        let mut state = self.state.lock().unwrap();
        if state.phase == RelayPhase::Idle && outcome == EnqueueOutcome::Enqueued {
            state.phase = RelayPhase::PendingEnqueue;
        }
        // PendingEnqueue stays pending: the next readiness callback
        // re-arms the attempt flag.
    }

    /// Return to the pristine state (used by `stop()`).
    pub fn reset(&self) {
        *self.state.lock().unwrap() = ControllerState::default();
    }
}

// ── Tests ────────────────────────────────────────────────────────
