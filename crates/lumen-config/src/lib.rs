//! Configuration system for the Lumen renderer.
//!
//! Settings persist to disk as `config.ron`. Every section is `#[serde(default)]`
//! so older or partial files keep loading, and CLI flags (clap) override whatever
//! was read from disk.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    CameraConfig, Config, DebugConfig, IntermediateFormat, PostProcessConfig, SceneConfig,
    WindowConfig, config_path, default_config_dir,
};
pub use error::ConfigError;
