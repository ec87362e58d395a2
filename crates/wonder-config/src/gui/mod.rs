use eframe::{run_native, NativeOptions};

use crate::config::Config;

use self::app::WonderConfig;

mod app;
pub mod handle;
mod player_card;

const PADDING: f32 = 8.;

/// Entry point for the gui. Intended to run on the main thread.
/// Doesn't return until the window is closed.
pub fn run(config: Config) {
    let window_options = NativeOptions {
        initial_window_size: Some((480., 720.).into()),
        ..Default::default()
    };

    run_native(
        "Slicks Wonder Button Config",
        window_options,
        Box::new(|cc| Box::new(WonderConfig::new(cc, config))),
    );
}
