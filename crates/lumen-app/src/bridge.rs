//! Conversions from input and configuration into the snapshots the renderer
//! and scene consume.

use glam::Vec3;
use lumen_config::{CameraConfig, IntermediateFormat, PostProcessConfig};
use lumen_input::{Action, ActionState, MouseState};
use lumen_render::{ParameterController, PixelFormat, PostProcessInput, PostProcessParameters};
use lumen_scene::{Camera, CameraInput};

/// Controller input for this frame. Toggles and steps fire on the press edge,
/// threshold ramps while held.
pub fn post_process_input(actions: &ActionState) -> PostProcessInput {
    PostProcessInput {
        blur_increase: actions.just_triggered(Action::BlurIncrease),
        blur_decrease: actions.just_triggered(Action::BlurDecrease),
        camera_blur_toggle: actions.just_triggered(Action::CameraBlurToggle),
        threshold_increase: actions.is_held(Action::ThresholdIncrease),
        threshold_decrease: actions.is_held(Action::ThresholdDecrease),
        bloom_levels_up: actions.just_triggered(Action::BloomLevelUp),
        bloom_levels_down: actions.just_triggered(Action::BloomLevelDown),
        bloom_toggle: actions.just_triggered(Action::BloomToggle),
        quit: actions.just_triggered(Action::Quit),
    }
}

/// Camera input for this frame. Mouse motion only counts while look is held.
pub fn camera_input(actions: &ActionState, mouse: &MouseState) -> CameraInput {
    CameraInput {
        forward: actions.is_held(Action::MoveForward),
        back: actions.is_held(Action::MoveBack),
        left: actions.is_held(Action::MoveLeft),
        right: actions.is_held(Action::MoveRight),
        up: actions.is_held(Action::MoveUp),
        down: actions.is_held(Action::MoveDown),
        boost: actions.is_held(Action::Boost),
        look: actions.is_held(Action::Look).then(|| mouse.delta()),
    }
}

/// Starting parameters from config, clamped into range.
pub fn initial_parameters(config: &PostProcessConfig) -> PostProcessParameters {
    let mut params = PostProcessParameters {
        blur_amount: 0,
        additional_blur_amount: config.additional_blur_amount,
        blur_multiplier: if config.camera_blur_enabled {
            config.blur_multiplier
        } else {
            0.0
        },
        bloom_threshold: config.bloom_threshold,
        active_bloom_levels: config.bloom_levels as usize,
        bloom_enabled: config.bloom_enabled,
        level_intensities: config.level_intensities,
    };
    params.clamp();
    params.blur_amount = params.additional_blur_amount;
    params
}

pub fn parameter_controller(config: &PostProcessConfig) -> ParameterController {
    ParameterController::new(config.blur_multiplier, config.threshold_ramp_rate)
}

pub fn pixel_format(format: IntermediateFormat) -> PixelFormat {
    match format {
        IntermediateFormat::Rgba8Unorm => PixelFormat::Rgba8Unorm,
        IntermediateFormat::Rgba16Float => PixelFormat::Rgba16Float,
    }
}

/// A camera with the configured placement, lens and speeds.
pub fn camera_from_config(config: &CameraConfig, aspect_ratio: f32) -> Camera {
    let mut camera = Camera::new(Vec3::from_array(config.position), aspect_ratio);
    camera.fov_y = config.fov_y;
    camera.near = config.near;
    camera.far = config.far.max(config.near + f32::EPSILON);
    camera.move_speed = config.move_speed;
    camera.speed_up_rate = config.speed_up_rate;
    camera.max_speed = config.max_speed;
    camera.look_speed = config.mouse_look_speed;
    camera
}
