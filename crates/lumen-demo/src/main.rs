//! Demo binary: a lit scene rendered through the bloom and blur post-process.
//!
//! Configuration is loaded from `config.ron` and can be overridden via CLI flags.
//! Edits to the post-process and scene sections are picked up while running.
//! Run with `cargo run -p lumen-demo -- --width 1920 --height 1080` to override size.

mod scene;

use std::process::ExitCode;

use clap::Parser;
use lumen_config::{CliArgs, Config, default_config_dir};
use tracing::{error, info};

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let config_dir = match args.config.clone().map_or_else(default_config_dir, Ok) {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("Failed to resolve config directory: {e}");
            return ExitCode::FAILURE;
        }
    };

    let (mut config, watch) = match Config::load_or_create(&config_dir) {
        Ok(on_disk) => (on_disk.clone(), Some((config_dir.clone(), on_disk))),
        Err(e) => {
            eprintln!("Failed to load config: {e}, using defaults");
            (Config::default(), None)
        }
    };
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.join("logs");
    lumen_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));
    info!(
        "Starting {}x{}, vsync {}, {} bloom levels, threshold {}",
        config.window.width,
        config.window.height,
        config.window.vsync,
        config.post_process.bloom_levels,
        config.post_process.bloom_threshold
    );

    match lumen_app::run_with_config(config, watch, Box::new(scene::build)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
