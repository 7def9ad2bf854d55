//! Free-fly camera with a speed ramp.
//!
//! The camera's current speed is exposed because the post-process blur is
//! driven by it: standing still gives zero, holding boost ramps it up.

use glam::{Mat4, Vec2, Vec3};
use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

use crate::transform::Transform;

/// Pitch stays this far away from straight up or down.
const PITCH_MARGIN: f32 = 0.01;

/// Movement intent for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CameraInput {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    /// Ramp speed up while held.
    pub boost: bool,
    /// Mouse motion in pixels, present only while mouse-look is engaged.
    pub look: Option<Vec2>,
}

/// A perspective camera.
#[derive(Debug, Clone)]
pub struct Camera {
    pub transform: Transform,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub aspect_ratio: f32,
    /// Near clip distance, positive.
    pub near: f32,
    /// Far clip distance, greater than `near`.
    pub far: f32,
    /// Speed when moving without boost, units per second.
    pub move_speed: f32,
    /// Speed gained per second of boost.
    pub speed_up_rate: f32,
    /// Boosted speed ceiling.
    pub max_speed: f32,
    /// Radians per pixel per second of mouse motion.
    pub look_speed: f32,
    current_speed: f32,
}

impl Camera {
    /// A camera at `position` looking down -Z with the demo's default tuning.
    #[must_use]
    pub fn new(position: Vec3, aspect_ratio: f32) -> Self {
        Self {
            transform: Transform::from_position(position),
            fov_y: FRAC_PI_4,
            aspect_ratio,
            near: 0.01,
            far: 100.0,
            move_speed: 5.0,
            speed_up_rate: 5.0,
            max_speed: 15.0,
            look_speed: 0.5,
            current_speed: 5.0,
        }
    }

    /// Speed reached this frame. Zero when the camera did not move.
    pub fn current_speed(&self) -> f32 {
        self.current_speed
    }

    pub fn position(&self) -> Vec3 {
        self.transform.position()
    }

    /// Apply one frame of movement and look.
    pub fn update(&mut self, dt: f32, input: &CameraInput) {
        if input.boost {
            self.current_speed =
                (self.current_speed + self.speed_up_rate * dt).clamp(0.0, self.max_speed);
        } else {
            self.current_speed = self.move_speed;
        }

        let step = self.current_speed * dt;
        let mut offset = Vec3::ZERO;
        let mut moving = false;
        for (held, dir) in [
            (input.forward, Vec3::NEG_Z),
            (input.back, Vec3::Z),
            (input.right, Vec3::X),
            (input.left, Vec3::NEG_X),
            (input.up, Vec3::Y),
            (input.down, Vec3::NEG_Y),
        ] {
            if held {
                offset += dir * step;
                moving = true;
            }
        }

        if moving {
            self.transform.move_relative(offset);
        } else {
            self.current_speed = 0.0;
        }

        if let Some(delta) = input.look {
            let scale = self.look_speed * dt;
            self.transform
                .rotate(Vec3::new(-delta.y * scale, -delta.x * scale, 0.0));

            let limit = FRAC_PI_2 - PITCH_MARGIN;
            let mut pyr = self.transform.pitch_yaw_roll();
            if pyr.x.abs() > limit {
                pyr.x = pyr.x.clamp(-limit, limit);
                self.transform.set_rotation(pyr);
            }
        }
    }

    /// Update the aspect ratio after a resize. Zero-height sizes are ignored.
    pub fn set_aspect_ratio(&mut self, width: u32, height: u32) {
        if height > 0 {
            self.aspect_ratio = width as f32 / height as f32;
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.transform.position(), self.transform.forward(), Vec3::Y)
    }

    /// Reverse-Z perspective: the near plane maps to depth 1, the far plane to 0.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect_ratio, self.far, self.near)
    }
}
