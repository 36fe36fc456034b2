//! Logging utilities
//!
//! Logger setup and request-level log lines.

use env_logger::Env;
use log::info;

/// Setup logging for the store. `RUST_LOG` overrides the default `info` level.
pub fn setup_logging() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
}

/// Log a shell command
pub fn log_command(command: &str) {
    info!("Shell executed: {}", command.trim());
}
