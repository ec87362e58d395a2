#![cfg_attr(
    all(target_os = "windows", not(debug_assertions), not(feature = "console")),
    windows_subsystem = "windows"
)]

use tracing::metadata::LevelFilter;

use crate::config::Config;

mod ble;
mod config;
mod gui;
mod link;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::DEBUG)
        .init();

    let config = Config::load();
    tracing::info!(version = VERSION, ?config, "Starting");

    // Start gui on the main thread
    gui::run(config);
}
