//! `lumen` command line. Every flag is optional and wins over `config.ron`.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

#[derive(Parser, Debug, Default)]
#[command(name = "lumen", about = "Lumen bloom and blur renderer")]
pub struct CliArgs {
    #[arg(long, help = "Window width in logical pixels")]
    pub width: Option<u32>,

    #[arg(long, help = "Window height in logical pixels")]
    pub height: Option<u32>,

    #[arg(long, help = "Wait for vertical sync (true/false)")]
    pub vsync: Option<bool>,

    /// Active bloom levels at start, clamped to 0-5.
    #[arg(long)]
    pub bloom_levels: Option<u32>,

    /// Luminance threshold at start, floored at 0.
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Filter directive, e.g. `debug` or `info,lumen_render=trace`.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Directory holding `config.ron` and `logs/`.
    #[arg(long, value_name = "DIR")]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Overwrite the fields `args` sets. Bloom values are brought into range
    /// here so parameters never start out of bounds.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        let window = &mut self.window;
        window.width = args.width.unwrap_or(window.width);
        window.height = args.height.unwrap_or(window.height);
        window.vsync = args.vsync.unwrap_or(window.vsync);

        let post = &mut self.post_process;
        if let Some(levels) = args.bloom_levels {
            post.bloom_levels = levels.min(5);
        }
        if let Some(threshold) = args.threshold {
            post.bloom_threshold = threshold.max(0.0);
        }
        if let Some(level) = &args.log_level {
            self.debug.log_level.clone_from(level);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CameraConfig, WindowConfig};

    #[test]
    fn test_only_given_flags_change_config() {
        let mut config = Config::default();
        config.apply_cli_overrides(&CliArgs {
            width: Some(1920),
            bloom_levels: Some(3),
            log_level: Some("debug".into()),
            ..Default::default()
        });
        assert_eq!(config.window.width, 1920);
        assert_eq!(config.post_process.bloom_levels, 3);
        assert_eq!(config.debug.log_level, "debug");
        assert_eq!(config.window.height, WindowConfig::default().height);
        assert_eq!(config.camera, CameraConfig::default());

        let mut untouched = Config::default();
        untouched.apply_cli_overrides(&CliArgs::default());
        assert_eq!(untouched, Config::default());
    }

    #[test]
    fn test_cli_bloom_values_clamped() {
        let mut config = Config::default();
        let args = CliArgs {
            bloom_levels: Some(9),
            threshold: Some(-2.0),
            ..Default::default()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.post_process.bloom_levels, 5);
        assert_eq!(config.post_process.bloom_threshold, 0.0);
    }

    #[test]
    fn test_cli_parses_flags() {
        let args = CliArgs::parse_from(["lumen", "--width", "640", "--vsync", "true"]);
        assert_eq!(args.width, Some(640));
        assert_eq!(args.vsync, Some(true));
        assert!(args.config.is_none());
    }
}
