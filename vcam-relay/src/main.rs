//! Virtual camera relay — entry point.
//!
//! ```text
//! vcam-relay                   Run in the foreground
//! vcam-relay --config <path>   Load a custom config TOML
//! vcam-relay --gen-config      Write default config to stdout
//! vcam-relay --mirror          Mirror the output horizontally
//! vcam-relay --display <n>     Capture display n
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use vcam_core::{CaptureTarget, LoopbackCamera, RelayService, SyntheticSource};

use vcam_relay::config::RelayConfig;
use vcam_relay::exclusions::ExclusionStore;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "vcam-relay", about = "Screen to virtual-camera relay daemon")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "vcam-relay.toml")]
    config: PathBuf,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,

    /// Mirror the output horizontally (overrides the config).
    #[arg(long)]
    mirror: bool,

    /// Display index to capture (overrides the config).
    #[arg(long)]
    display: Option<u32>,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        let text = toml::to_string_pretty(&RelayConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = RelayConfig::load(&cli.config);
    if cli.mirror {
        config.relay.mirror = true;
    }
    if let Some(display) = cli.display {
        config.capture.display = display;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("vcam-relay v{}", env!("CARGO_PKG_VERSION"));
    info!("camera: {}", config.camera.name);
    info!(
        "output: {}x{} @ {} fps",
        config.camera.width, config.camera.height, config.camera.fps
    );
    info!("capturing display {}", config.capture.display);

    // The in-process camera stands in for the platform registry; it
    // publishes the device the relay then discovers and binds to.
    let camera = LoopbackCamera::with_device(&config.camera.name, config.camera.queue_capacity);

    let mut service = RelayService::new(
        camera,
        SyntheticSource::new(),
        config.capture_config(),
        config.relay_options(),
    );

    // Excluded apps: restore the persisted set, write it back on
    // every change.
    let store = ExclusionStore::new(config.exclusions.file.clone());
    let persisted = store.load();
    if !persisted.is_empty() {
        info!("restoring {} excluded applications", persisted.len());
    }
    service
        .recorder_mut()
        .on_exclusions_changed(Box::new(move |apps| {
            if let Err(e) = store.save(apps) {
                warn!("failed to persist exclusions: {e}");
            }
        }));
    service.recorder_mut().set_excluded_apps(persisted).await;

    service
        .recorder_mut()
        .select_target(CaptureTarget::Display(config.capture.display))
        .await;
    service.start().await?;

    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received — shutting down");
    service.stop().await;

    Ok(())
}
