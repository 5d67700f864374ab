//! # vcam-relay — Virtual Camera Relay Daemon
//!
//! Foreground daemon that captures the screen and relays converted
//! frames into a virtual camera device's sink queue, throttled by the
//! device's streaming handshake.
//!
//! Configuration loads from a TOML file (`--config`); the excluded
//! application list persists separately and survives restarts.

pub mod config;
pub mod exclusions;
