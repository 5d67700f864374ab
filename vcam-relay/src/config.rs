//! Configuration for the relay daemon.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use vcam_core::capture::PixelFormat;
use vcam_core::{CaptureConfig, FormatDescriptor, RelayOptions};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Virtual camera device settings.
    pub camera: CameraConfig,
    /// Screen capture settings.
    pub capture: CaptureSettings,
    /// Relay tuning.
    pub relay: RelaySettings,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Capture exclusions.
    pub exclusions: ExclusionsConfig,
}

/// Virtual camera device settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Device name to discover in the registry.
    pub name: String,
    /// Output frame width in pixels.
    pub width: u32,
    /// Output frame height in pixels.
    pub height: u32,
    /// Nominal output frame rate.
    pub fps: u32,
    /// Sink queue capacity in samples.
    pub queue_capacity: usize,
}

/// Screen capture settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Display index to capture (0 = primary).
    pub display: u32,
    /// Capture frame-rate cap; the relay gate throttles below this.
    pub fps: u32,
    /// Depth of the capture delivery queue.
    pub queue_depth: u32,
}

/// Relay tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaySettings {
    /// Handshake-property poll interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Mirror the output horizontally.
    pub mirror: bool,
    /// Buffers pre-allocated per device connection.
    pub pool_capacity: usize,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

/// Capture exclusions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExclusionsConfig {
    /// File the excluded-application list persists to.
    pub file: PathBuf,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            capture: CaptureSettings::default(),
            relay: RelaySettings::default(),
            logging: LoggingConfig::default(),
            exclusions: ExclusionsConfig::default(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            name: vcam_core::DEVICE_NAME.into(),
            width: 1280,
            height: 720,
            fps: 30,
            queue_capacity: 5,
        }
    }
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            display: 0,
            fps: 60,
            queue_depth: 5,
        }
    }
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            mirror: false,
            pool_capacity: 8,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl Default for ExclusionsConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("vcam-relay-exclusions.txt"),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl RelayConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write the default configuration to a file (for bootstrapping).
    pub fn write_default(path: &Path) -> std::io::Result<()> {
        let cfg = Self::default();
        let text = toml::to_string_pretty(&cfg).map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }

    /// Capture settings as the core crate's `CaptureConfig`.
    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            queue_depth: self.capture.queue_depth.max(1),
            ..CaptureConfig::with_fps(
                self.camera.width,
                self.camera.height,
                self.capture.fps.clamp(1, 120),
            )
        }
    }

    /// Relay tuning as the core crate's `RelayOptions`.
    pub fn relay_options(&self) -> RelayOptions {
        RelayOptions {
            camera_name: self.camera.name.clone(),
            format: FormatDescriptor {
                width: self.camera.width,
                height: self.camera.height,
                pixel_format: PixelFormat::Bgra8,
                frame_rate: self.camera.fps.clamp(1, 60),
            },
            poll_interval: Duration::from_millis(self.relay.poll_interval_ms.max(50)),
            mirror: self.relay.mirror,
            pool_capacity: self.relay.pool_capacity.max(2),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let cfg = RelayConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        assert!(text.contains("poll_interval_ms"));
        assert!(text.contains("queue_capacity"));
    }

    #[test]
    fn roundtrip_config() {
        let cfg = RelayConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        let parsed: RelayConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.camera.width, 1280);
        assert_eq!(parsed.relay.poll_interval_ms, 500);
    }

    #[test]
    fn relay_options_clamp_extremes() {
        let mut cfg = RelayConfig::default();
        cfg.camera.fps = 240;
        cfg.relay.poll_interval_ms = 0;
        cfg.relay.pool_capacity = 0;
        let options = cfg.relay_options();
        assert_eq!(options.format.frame_rate, 60);
        assert_eq!(options.poll_interval, Duration::from_millis(50));
        assert_eq!(options.pool_capacity, 2);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let parsed: RelayConfig = toml::from_str("[relay]\nmirror = true\n").unwrap();
        assert!(parsed.relay.mirror);
        assert_eq!(parsed.camera.name, vcam_core::DEVICE_NAME);
    }
}
