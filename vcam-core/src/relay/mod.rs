//! Relay control: the enqueue state machine and the streaming-state
//! poller that feeds it.

pub mod controller;
pub mod poller;

// ── Re-exports ───────────────────────────────────────────────────

pub use controller::{Admission, RelayController, RelayPhase};
pub use poller::{DEFAULT_POLL_INTERVAL, PropertyPoller};
