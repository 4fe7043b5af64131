//! # Padsense
//!
//! Monitor a game controller through the uniform control model.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Load configuration (first argument, default `config/default.toml`)
//!    - Set up logging with tracing subscriber
//!    - Open the controller and select its profile
//!
//! 2. **Main Loop**
//!    - Pump raw events into the controller on a background reader
//!    - Every poll interval, print presses/releases and active axes as one
//!      JSON line
//!    - Pressing `home` re-centres the sticks
//!
//! 3. **Shutdown**
//!    - On disconnect or Ctrl+C
//!
//! Expected output:
//! ```text
//! INFO padsense: Padsense v0.1.0 starting...
//! INFO padsense::device: Found DualSense at: /dev/input/event21
//! {"axes":{"lx":0.42,"ly":-0.13},"pressed":["cross"],"released":[]}
//! ```

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use padsense::config::{Config, LoggingConfig};
use padsense::controller::buttons::PressSnapshot;
use padsense::controller::Controller;
use padsense::device::EvdevSource;
use padsense::pump::spawn_consumer;

/// Configuration file used when no path is given
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// One line of monitor output.
#[derive(Debug, Serialize)]
struct Report<'a> {
    axes: BTreeMap<String, f32>,
    #[serde(flatten)]
    presses: &'a PressSnapshot,
}

/// Initializes console logging and, when configured, a daily log file.
///
/// `RUST_LOG` overrides the configured level. The returned guard must be
/// kept alive for file output to be flushed.
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "padsense.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;

    let _log_guard = init_logging(&config.logging);
    info!("Padsense v{} starting...", env!("CARGO_PKG_VERSION"));

    let profile_name = config.device.profile.as_deref();
    let mut source = if config.device.path.is_empty() {
        EvdevSource::scan(&config.profiles, profile_name)?
    } else {
        EvdevSource::open(&config.device.path, &config.profiles, profile_name)?
    };
    if config.device.grab {
        source.grab()?;
    }

    let zones = config.calibration.zones_for(source.profile())?;
    let controller = Arc::new(Controller::new(source.profile(), zones)?);
    info!(
        "Using profile '{}' ({} axes, {} buttons)",
        controller.profile_name(),
        controller.axis_names().len(),
        controller.button_names().len()
    );

    if controller.has_controls(&["home"]) {
        let weak = Arc::downgrade(&controller);
        controller.register_handler(
            move |_| {
                if let Some(controller) = weak.upgrade() {
                    controller.set_axis_centres();
                    info!("Sticks re-centred");
                }
            },
            &["home"],
        )?;
    }

    let (tx, rx) = mpsc::channel(config.monitor.channel_capacity);
    let _reader = source.spawn_reader(tx)?;
    let consumer = spawn_consumer(Arc::clone(&controller), rx);

    let mut poll = interval(Duration::from_millis(config.monitor.poll_interval_ms));
    info!("Press Ctrl+C to exit");

    loop {
        tokio::select! {
            _ = poll.tick() => {
                if !controller.connected() {
                    warn!("Controller disconnected, exiting");
                    break;
                }

                let presses = controller.check_and_clear();
                let axes: BTreeMap<String, f32> = controller.active_axes().into_iter().collect();
                if axes.is_empty() && !presses.has_presses() && !presses.has_releases() {
                    continue;
                }

                let report = Report { axes, presses: &presses };
                println!("{}", serde_json::to_string(&report)?);
            }

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    consumer.abort();
    Ok(())
}
