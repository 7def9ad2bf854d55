//! Post-process parameters and the per-frame controller that drives them.

use crate::target::MAX_BLOOM_LEVELS;

/// Largest blur radius, in texels.
pub const MAX_BLUR_AMOUNT: u32 = 15;

/// Tunables read by the bloom/blur pipeline. Only the controller mutates them
/// during a run, and every mutation is followed by [`clamp`](Self::clamp).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostProcessParameters {
    /// Final blur radius, derived every frame. `0..=MAX_BLUR_AMOUNT`.
    pub blur_amount: u32,
    /// User-added blur. `0..=MAX_BLUR_AMOUNT`.
    pub additional_blur_amount: u32,
    /// Either 0 or the controller's constant; scales camera speed into blur.
    pub blur_multiplier: f32,
    /// Luminance a pixel must exceed to bloom. Never negative.
    pub bloom_threshold: f32,
    /// `0..=MAX_BLOOM_LEVELS`.
    pub active_bloom_levels: usize,
    pub bloom_enabled: bool,
    pub level_intensities: [f32; MAX_BLOOM_LEVELS],
}

impl Default for PostProcessParameters {
    fn default() -> Self {
        Self {
            blur_amount: 0,
            additional_blur_amount: 0,
            blur_multiplier: 1.0,
            bloom_threshold: 1.0,
            active_bloom_levels: MAX_BLOOM_LEVELS,
            bloom_enabled: true,
            level_intensities: [1.0; MAX_BLOOM_LEVELS],
        }
    }
}

impl PostProcessParameters {
    /// Force every field into its valid range.
    pub fn clamp(&mut self) {
        self.blur_amount = self.blur_amount.min(MAX_BLUR_AMOUNT);
        self.additional_blur_amount = self.additional_blur_amount.min(MAX_BLUR_AMOUNT);
        if self.bloom_threshold.is_nan() || self.bloom_threshold < 0.0 {
            self.bloom_threshold = 0.0;
        }
        self.active_bloom_levels = self.active_bloom_levels.min(MAX_BLOOM_LEVELS);
        for w in &mut self.level_intensities {
            if !w.is_finite() || *w < 0.0 {
                *w = 0.0;
            }
        }
    }

    /// Bloom levels the pipeline actually blurs this frame.
    pub fn effective_bloom_levels(&self) -> usize {
        if self.bloom_enabled {
            self.active_bloom_levels
        } else {
            0
        }
    }
}

/// Input snapshot the controller consumes. Built fresh every frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostProcessInput {
    /// Edge: one more step of user blur.
    pub blur_increase: bool,
    /// Edge: one step less.
    pub blur_decrease: bool,
    /// Edge: switch camera-speed blur on or off.
    pub camera_blur_toggle: bool,
    /// Held: the "increase threshold" key. Lowers the threshold.
    pub threshold_increase: bool,
    /// Held: the "decrease threshold" key. Raises the threshold.
    pub threshold_decrease: bool,
    /// Edge.
    pub bloom_levels_up: bool,
    /// Edge.
    pub bloom_levels_down: bool,
    /// Edge.
    pub bloom_toggle: bool,
    pub quit: bool,
}

/// Maps camera speed and input to [`PostProcessParameters`].
#[derive(Debug, Clone)]
pub struct ParameterController {
    /// Value the blur multiplier takes when camera blur is on.
    pub blur_multiplier_k: f32,
    /// Threshold change per second while a threshold key is held.
    pub threshold_ramp_rate: f32,
    quit_requested: bool,
}

impl Default for ParameterController {
    fn default() -> Self {
        Self::new(1.0, 0.5)
    }
}

impl ParameterController {
    pub fn new(blur_multiplier_k: f32, threshold_ramp_rate: f32) -> Self {
        Self {
            blur_multiplier_k,
            threshold_ramp_rate,
            quit_requested: false,
        }
    }

    /// Set once a quit was requested. Checked once per frame.
    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    /// Apply one frame of input. `camera_speed` is the camera's speed this frame.
    pub fn update(
        &mut self,
        params: &mut PostProcessParameters,
        input: &PostProcessInput,
        camera_speed: f32,
        dt: f32,
    ) {
        if input.quit {
            log::info!("Quit requested");
            self.quit_requested = true;
        }

        if input.blur_increase {
            params.additional_blur_amount = params.additional_blur_amount.saturating_add(1);
        }
        if input.blur_decrease {
            params.additional_blur_amount = params.additional_blur_amount.saturating_sub(1);
        }
        params.additional_blur_amount = params.additional_blur_amount.min(MAX_BLUR_AMOUNT);
        if input.blur_increase || input.blur_decrease {
            log::debug!("Additional blur: {}", params.additional_blur_amount);
        }

        if input.camera_blur_toggle {
            params.blur_multiplier = if params.blur_multiplier == 0.0 {
                self.blur_multiplier_k
            } else {
                0.0
            };
            log::debug!("Blur multiplier: {}", params.blur_multiplier);
        }

        params.blur_amount = derived_blur_amount(
            camera_speed,
            params.blur_multiplier,
            params.additional_blur_amount,
        );

        let ramp = dt * self.threshold_ramp_rate;
        if input.threshold_decrease {
            params.bloom_threshold += ramp;
        }
        if input.threshold_increase {
            params.bloom_threshold -= ramp;
        }
        params.bloom_threshold = params.bloom_threshold.max(0.0);

        if input.bloom_levels_up {
            params.active_bloom_levels = (params.active_bloom_levels + 1).min(MAX_BLOOM_LEVELS);
        }
        if input.bloom_levels_down {
            params.active_bloom_levels = params.active_bloom_levels.saturating_sub(1);
        }
        if input.bloom_levels_up || input.bloom_levels_down {
            log::debug!("Bloom levels: {}", params.active_bloom_levels);
        }

        if input.bloom_toggle {
            params.bloom_enabled = !params.bloom_enabled;
            log::debug!("Bloom enabled: {}", params.bloom_enabled);
        }

        params.clamp();
    }
}

/// `clamp(speed * multiplier + additional, 0, MAX)`, truncated to whole texels.
fn derived_blur_amount(camera_speed: f32, multiplier: f32, additional: u32) -> u32 {
    let raw = camera_speed * multiplier + additional as f32;
    if raw.is_nan() {
        return additional.min(MAX_BLUR_AMOUNT);
    }
    raw.clamp(0.0, MAX_BLUR_AMOUNT as f32) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press_blur_increase() -> PostProcessInput {
        PostProcessInput {
            blur_increase: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_stationary_camera_blur_follows_additional() {
        let mut ctl = ParameterController::new(1.0, 0.5);
        let mut params = PostProcessParameters {
            additional_blur_amount: 5,
            ..Default::default()
        };
        ctl.update(&mut params, &PostProcessInput::default(), 0.0, 0.016);
        assert_eq!(params.blur_amount, 5);

        ctl.update(&mut params, &press_blur_increase(), 0.0, 0.016);
        assert_eq!(params.blur_amount, 6);
    }

    #[test]
    fn test_twenty_presses_cap_at_fifteen() {
        let mut ctl = ParameterController::default();
        let mut params = PostProcessParameters::default();
        for _ in 0..20 {
            ctl.update(&mut params, &press_blur_increase(), 0.0, 0.016);
        }
        assert_eq!(params.additional_blur_amount, 15);
        assert_eq!(params.blur_amount, 15);
    }

    #[test]
    fn test_decrease_floors_at_zero() {
        let mut ctl = ParameterController::default();
        let mut params = PostProcessParameters::default();
        let input = PostProcessInput {
            blur_decrease: true,
            ..Default::default()
        };
        ctl.update(&mut params, &input, 0.0, 0.016);
        assert_eq!(params.additional_blur_amount, 0);
    }

    #[test]
    fn test_fast_camera_blur_is_clamped() {
        let mut ctl = ParameterController::default();
        let mut params = PostProcessParameters {
            additional_blur_amount: 10,
            ..Default::default()
        };
        ctl.update(&mut params, &PostProcessInput::default(), 15.0, 0.016);
        assert_eq!(params.blur_amount, 15);
    }

    #[test]
    fn test_blur_amount_truncates() {
        let mut ctl = ParameterController::default();
        let mut params = PostProcessParameters::default();
        ctl.update(&mut params, &PostProcessInput::default(), 2.9, 0.016);
        assert_eq!(params.blur_amount, 2);
    }

    #[test]
    fn test_toggle_mutes_camera_blur() {
        let mut ctl = ParameterController::new(2.0, 0.5);
        let mut params = PostProcessParameters::default();
        let toggle = PostProcessInput {
            camera_blur_toggle: true,
            ..Default::default()
        };

        ctl.update(&mut params, &toggle, 4.0, 0.016);
        assert_eq!(params.blur_multiplier, 0.0);
        assert_eq!(params.blur_amount, 0);

        ctl.update(&mut params, &toggle, 4.0, 0.016);
        assert_eq!(params.blur_multiplier, 2.0);
        assert_eq!(params.blur_amount, 8);
    }

    #[test]
    fn test_threshold_keys_are_inverted_and_continuous() {
        let mut ctl = ParameterController::new(1.0, 0.5);
        let mut params = PostProcessParameters::default();

        let raise = PostProcessInput {
            threshold_decrease: true,
            ..Default::default()
        };
        ctl.update(&mut params, &raise, 0.5, 1.0);
        assert!((params.bloom_threshold - 1.5).abs() < 1e-6);

        let lower = PostProcessInput {
            threshold_increase: true,
            ..Default::default()
        };
        ctl.update(&mut params, &lower, 0.0, 0.2);
        assert!((params.bloom_threshold - 1.4).abs() < 1e-6);
    }

    #[test]
    fn test_threshold_never_negative() {
        let mut ctl = ParameterController::new(1.0, 0.5);
        let mut params = PostProcessParameters::default();
        let lower = PostProcessInput {
            threshold_increase: true,
            ..Default::default()
        };
        for _ in 0..100 {
            ctl.update(&mut params, &lower, 0.0, 0.1);
            assert!(params.bloom_threshold >= 0.0);
        }
        assert_eq!(params.bloom_threshold, 0.0);
    }

    #[test]
    fn test_bloom_levels_clamped() {
        let mut ctl = ParameterController::default();
        let mut params = PostProcessParameters::default();
        let up = PostProcessInput {
            bloom_levels_up: true,
            ..Default::default()
        };
        ctl.update(&mut params, &up, 0.0, 0.016);
        assert_eq!(params.active_bloom_levels, MAX_BLOOM_LEVELS);

        let down = PostProcessInput {
            bloom_levels_down: true,
            ..Default::default()
        };
        for _ in 0..8 {
            ctl.update(&mut params, &down, 0.0, 0.016);
        }
        assert_eq!(params.active_bloom_levels, 0);
    }

    #[test]
    fn test_bloom_toggle_and_effective_levels() {
        let mut ctl = ParameterController::default();
        let mut params = PostProcessParameters::default();
        let toggle = PostProcessInput {
            bloom_toggle: true,
            ..Default::default()
        };
        ctl.update(&mut params, &toggle, 0.0, 0.016);
        assert!(!params.bloom_enabled);
        assert_eq!(params.effective_bloom_levels(), 0);
        assert_eq!(params.active_bloom_levels, MAX_BLOOM_LEVELS);
    }

    #[test]
    fn test_quit_sets_flag() {
        let mut ctl = ParameterController::default();
        let mut params = PostProcessParameters::default();
        assert!(!ctl.quit_requested());
        let quit = PostProcessInput {
            quit: true,
            ..Default::default()
        };
        ctl.update(&mut params, &quit, 0.0, 0.016);
        assert!(ctl.quit_requested());
    }

    #[test]
    fn test_blur_stays_in_range_under_random_walk() {
        let mut ctl = ParameterController::new(3.0, 0.5);
        let mut params = PostProcessParameters::default();
        for i in 0..200u32 {
            let input = PostProcessInput {
                blur_increase: i % 3 == 0,
                blur_decrease: i % 7 == 0,
                camera_blur_toggle: i % 11 == 0,
                ..Default::default()
            };
            ctl.update(&mut params, &input, (i % 17) as f32, 0.016);
            assert!(params.blur_amount <= MAX_BLUR_AMOUNT);
            assert!(params.additional_blur_amount <= MAX_BLUR_AMOUNT);
        }
    }

    #[test]
    fn test_clamp_repairs_config_values() {
        let mut params = PostProcessParameters {
            blur_amount: 99,
            additional_blur_amount: 40,
            bloom_threshold: -2.0,
            active_bloom_levels: 9,
            level_intensities: [1.0, -1.0, f32::NAN, 0.5, 2.0],
            ..Default::default()
        };
        params.clamp();
        assert_eq!(params.blur_amount, 15);
        assert_eq!(params.additional_blur_amount, 15);
        assert_eq!(params.bloom_threshold, 0.0);
        assert_eq!(params.active_bloom_levels, 5);
        assert_eq!(params.level_intensities, [1.0, 0.0, 0.0, 0.5, 2.0]);
    }
}
