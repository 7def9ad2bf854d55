//! `config.ron`: every setting the demo reads at start-up.
//!
//! Each section is `#[serde(default)]`, so a file only needs the fields it
//! changes and unknown fields from newer builds are skipped.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const APP_NAME: &str = "lumen";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub post_process: PostProcessConfig,
    pub camera: CameraConfig,
    pub scene: SceneConfig,
    pub debug: DebugConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    /// Logical pixels.
    pub width: u32,
    pub height: u32,
    /// Borderless fullscreen on the current monitor.
    pub fullscreen: bool,
    /// Off presents as fast as the platform allows.
    pub vsync: bool,
    pub title: String,
}

/// Pixel format used for the off-screen post-process targets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum IntermediateFormat {
    /// 8 bits per channel, values clamp to \[0, 1\].
    Rgba8Unorm,
    /// Half-float HDR; scene values above 1.0 survive until the final pass.
    Rgba16Float,
}

/// Post-process configuration: the starting values of the run-time parameters
/// plus the constants the parameter controller works with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PostProcessConfig {
    /// Starting user-adjusted blur radius (0..=15).
    pub additional_blur_amount: u32,
    /// The constant `k` that the blur multiplier toggles to when camera blur is on.
    pub blur_multiplier: f32,
    /// Whether camera-speed blur starts enabled (multiplier = `k`) or muted (0).
    pub camera_blur_enabled: bool,
    /// Starting luminance threshold for bloom extraction.
    pub bloom_threshold: f32,
    /// Threshold change per second while a threshold key is held.
    pub threshold_ramp_rate: f32,
    /// Starting number of active bloom levels (0..=5).
    pub bloom_levels: u32,
    /// Whether bloom starts enabled.
    pub bloom_enabled: bool,
    /// Per-level weights used when recombining bloom levels with the scene.
    pub level_intensities: [f32; 5],
    /// Format of every intermediate target.
    pub intermediate_format: IntermediateFormat,
}

/// Fly camera configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    /// Starting position in world space.
    pub position: [f32; 3],
    /// Base movement speed in units per second.
    pub move_speed: f32,
    /// Speed gained per second while the boost key is held.
    pub speed_up_rate: f32,
    /// Upper bound for the boosted speed.
    pub max_speed: f32,
    /// Radians of rotation per pixel of mouse motion per second.
    pub mouse_look_speed: f32,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    /// Near clip distance.
    pub near: f32,
    /// Far clip distance.
    pub far: f32,
}

/// Scene-wide colors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SceneConfig {
    /// Ambient light color added to every lit surface.
    pub ambient_color: [f32; 3],
    /// Backbuffer clear color.
    pub clear_color: [f32; 4],
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fullscreen: false,
            vsync: false,
            title: String::from("Lumen"),
        }
    }
}

impl Default for PostProcessConfig {
    fn default() -> Self {
        Self {
            additional_blur_amount: 0,
            blur_multiplier: 1.0,
            camera_blur_enabled: true,
            bloom_threshold: 1.0,
            threshold_ramp_rate: 0.5,
            bloom_levels: 5,
            bloom_enabled: true,
            level_intensities: [1.0; 5],
            intermediate_format: IntermediateFormat::Rgba16Float,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 2.0, 10.0],
            move_speed: 5.0,
            speed_up_rate: 5.0,
            max_speed: 15.0,
            mouse_look_speed: 0.5,
            fov_y: std::f32::consts::FRAC_PI_4,
            near: 0.01,
            far: 100.0,
        }
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            ambient_color: [0.1, 0.1, 0.15],
            clear_color: [0.4, 0.6, 0.75, 1.0],
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: String::from("info"),
        }
    }
}

/// Platform config directory for Lumen (e.g. `~/.config/lumen` on Linux).
pub fn default_config_dir() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_NAME))
        .ok_or(ConfigError::NoConfigDir)
}

const CONFIG_FILE: &str = "config.ron";

/// Path of the config file inside `config_dir`.
pub fn config_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE)
}

fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    ron::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

impl Config {
    /// Read `config.ron` from `config_dir`. A missing file is replaced by the
    /// defaults, which are written back so the user has something to edit.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = config_path(config_dir);
        if !path.exists() {
            let config = Self::default();
            config.save(config_dir)?;
            log::info!("Wrote default config to {}", path.display());
            return Ok(config);
        }
        let config = read_config(&path)?;
        log::info!("Config loaded from {}", path.display());
        Ok(config)
    }

    /// Write `config.ron` into `config_dir`, creating the directory if needed.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        let path = config_path(config_dir);
        let write_error = |source| ConfigError::Write {
            path: path.clone(),
            source,
        };
        std::fs::create_dir_all(config_dir).map_err(write_error)?;

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);
        let text = ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::Serialize)?;
        std::fs::write(&path, text).map_err(write_error)
    }

    /// Re-read the file. `Some` carries the new config only when it differs from `self`.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let fresh = read_config(&config_path(config_dir))?;
        if fresh == *self {
            return Ok(None);
        }
        log::info!("Config changed on disk");
        Ok(Some(fresh))
    }
}
