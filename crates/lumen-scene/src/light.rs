//! Scene lights.

use glam::Vec3;

/// Lights beyond this count are ignored by the lit pipeline.
pub const MAX_LIGHTS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    Directional,
    Point,
}

/// A directional or point light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub color: Vec3,
    pub intensity: f32,
    /// Direction the light travels. Directional lights only.
    pub direction: Vec3,
    /// World position. Point lights only.
    pub position: Vec3,
    /// Distance at which a point light's contribution reaches zero.
    pub range: f32,
}

impl Light {
    /// A directional light; `direction` is normalized.
    #[must_use]
    pub fn directional(direction: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            kind: LightKind::Directional,
            color,
            intensity,
            direction: direction.normalize_or_zero(),
            position: Vec3::ZERO,
            range: 0.0,
        }
    }

    #[must_use]
    pub fn point(position: Vec3, color: Vec3, intensity: f32, range: f32) -> Self {
        Self {
            kind: LightKind::Point,
            color,
            intensity,
            direction: Vec3::ZERO,
            position,
            range,
        }
    }

    /// Lambert contribution at `point` with surface `normal`.
    ///
    /// Point lights fall off as `(1 - d/range)^2` and vanish past `range`.
    pub fn diffuse_at(&self, point: Vec3, normal: Vec3) -> Vec3 {
        let (to_light, attenuation) = match self.kind {
            LightKind::Directional => (-self.direction, 1.0),
            LightKind::Point => {
                let offset = self.position - point;
                let dist = offset.length();
                if self.range <= 0.0 || dist >= self.range {
                    return Vec3::ZERO;
                }
                let falloff = 1.0 - dist / self.range;
                (offset.normalize_or_zero(), falloff * falloff)
            }
        };
        let n_dot_l = normal.dot(to_light).max(0.0);
        self.color * self.intensity * n_dot_l * attenuation
    }
}
