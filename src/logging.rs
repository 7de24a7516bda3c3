/// Tracing setup.
///
/// The terminal is in raw mode and owns stdout, so logs go to a file:
/// `$OVERWORLD_LOG`, default `overworld.log` in the working directory.
/// Filtering follows `RUST_LOG` (default `info`).

use std::fs::File;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

const LOG_ENV_VAR: &str = "OVERWORLD_LOG";
const DEFAULT_LOG_FILE: &str = "overworld.log";

pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let path = std::env::var(LOG_ENV_VAR).unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());

    // No log file means no logging; the game still runs.
    let Ok(file) = File::create(&path) else { return };

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .compact()
        .try_init();
    if installed.is_ok() {
        tracing::info!(log = %path, "logging started");
    }
}
