//! Position, Euler orientation and scale, with the derived world matrices.
//!
//! Right-handed, Y up, local forward along -Z. Orientation is stored as
//! pitch (X), yaw (Y) and roll (Z) and applied roll first, then pitch, then yaw.

use glam::{EulerRot, Mat4, Quat, Vec3};

/// A placement in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    position: Vec3,
    pitch_yaw_roll: Vec3,
    scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            pitch_yaw_roll: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Identity transform.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity rotation and scale at `position`.
    #[must_use]
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Builder-style uniform scale.
    #[must_use]
    pub fn with_uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::splat(scale);
        self
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// `(pitch, yaw, roll)` in radians.
    pub fn pitch_yaw_roll(&self) -> Vec3 {
        self.pitch_yaw_roll
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn set_rotation(&mut self, pitch_yaw_roll: Vec3) {
        self.pitch_yaw_roll = pitch_yaw_roll;
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
    }

    /// Translate in world space, ignoring orientation.
    pub fn move_absolute(&mut self, offset: Vec3) {
        self.position += offset;
    }

    /// Translate along the local axes (x right, y up, -z forward).
    pub fn move_relative(&mut self, offset: Vec3) {
        self.position += self.rotation() * offset;
    }

    /// Add to pitch, yaw and roll.
    pub fn rotate(&mut self, delta_pitch_yaw_roll: Vec3) {
        self.pitch_yaw_roll += delta_pitch_yaw_roll;
    }

    /// Multiply the current scale component-wise.
    pub fn scale_by(&mut self, factor: Vec3) {
        self.scale *= factor;
    }

    /// Orientation as a quaternion.
    pub fn rotation(&self) -> Quat {
        let Vec3 {
            x: pitch,
            y: yaw,
            z: roll,
        } = self.pitch_yaw_roll;
        Quat::from_euler(EulerRot::YXZ, yaw, pitch, roll)
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation() * Vec3::NEG_Z
    }

    pub fn right(&self) -> Vec3 {
        self.rotation() * Vec3::X
    }

    pub fn up(&self) -> Vec3 {
        self.rotation() * Vec3::Y
    }

    /// Translation × rotation × scale.
    pub fn world_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation(), self.position)
    }

    /// Inverse transpose of the world matrix, for transforming normals.
    pub fn world_inverse_transpose(&self) -> Mat4 {
        self.world_matrix().inverse().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn test_default_is_identity() {
        let t = Transform::new();
        assert_eq!(t.world_matrix(), Mat4::IDENTITY);
        assert!(approx(t.forward(), Vec3::NEG_Z));
    }

    #[test]
    fn test_move_relative_follows_yaw() {
        let mut t = Transform::new();
        t.rotate(Vec3::new(0.0, FRAC_PI_2, 0.0));
        t.move_relative(Vec3::new(0.0, 0.0, -1.0));
        // Yawing a quarter turn left makes forward point down -X.
        assert!(approx(t.position(), Vec3::new(-1.0, 0.0, 0.0)));
    }

    #[test]
    fn test_move_absolute_ignores_rotation() {
        let mut t = Transform::new();
        t.rotate(Vec3::new(0.3, 1.2, 0.0));
        t.move_absolute(Vec3::X);
        assert!(approx(t.position(), Vec3::X));
    }

    #[test]
    fn test_positive_pitch_looks_up() {
        let mut t = Transform::new();
        t.set_rotation(Vec3::new(0.5, 0.0, 0.0));
        assert!(t.forward().y > 0.0);
    }

    #[test]
    fn test_world_matrix_applies_scale_before_translation() {
        let mut t = Transform::from_position(Vec3::new(1.0, 2.0, 3.0));
        t.scale_by(Vec3::splat(2.0));
        let p = t.world_matrix().transform_point3(Vec3::X);
        assert!(approx(p, Vec3::new(3.0, 2.0, 3.0)));
    }

    #[test]
    fn test_inverse_transpose_keeps_normals_perpendicular() {
        let mut t = Transform::new();
        t.set_scale(Vec3::new(4.0, 1.0, 1.0));
        t.set_rotation(Vec3::new(0.0, 0.0, 0.4));

        let tangent = t.world_matrix().transform_vector3(Vec3::new(1.0, 1.0, 0.0));
        let normal = t
            .world_inverse_transpose()
            .transform_vector3(Vec3::new(1.0, -1.0, 0.0));
        assert!(tangent.dot(normal).abs() < 1e-4);
    }
}
