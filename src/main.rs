//! Drishti daemon
//!
//! - **Sensor (TCP client)**: start command out, distance frames in
//! - **Consumer (TCP server, one peer)**: zone events out, commands in,
//!   acknowledgements out

use drishti::app::DetectorApp;
use drishti::{Config, Error, Result};
use std::env;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Parse config path from command line arguments.
///
/// Supports:
/// - `drishti <path>` (positional)
/// - `drishti --config <path>` (flag-based)
/// - `drishti -c <path>` (short flag)
///
/// Defaults to `/etc/drishti.toml` if not specified.
fn parse_config_path() -> String {
    let args: Vec<String> = env::args().collect();

    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }

    if args.len() > 1 && !args[1].starts_with('-') {
        return args[1].clone();
    }

    "/etc/drishti.toml".to_string()
}

fn main() -> Result<()> {
    let config_path = parse_config_path();
    let (config, used) = Config::load(&config_path)?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    log::info!("Drishti v{} starting...", env!("CARGO_PKG_VERSION"));
    if used.as_path() != std::path::Path::new(&config_path) {
        log::warn!(
            "Cannot read {}, using fallback {}",
            config_path,
            used.display()
        );
    }
    log::info!("Using config: {}", used.display());
    log::info!(
        "{} points over {}°, debounce on={} off={}, run length {}, CRC {}",
        config.radar.num_points,
        config.radar.sweep_deg,
        config.debounce.frame_on,
        config.debounce.frame_off,
        config.debounce.point_count,
        config.protocol.crc
    );

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    let result = DetectorApp::new(config, running).run();
    match &result {
        Ok(()) => log::info!("Drishti stopped"),
        Err(e) => log::error!("Drishti stopped: {}", e),
    }
    result
}
