//! The per-frame scene: camera, entities, materials, lights and sky.

use glam::Vec3;

use crate::camera::Camera;
use crate::handle::{MaterialHandle, MeshHandle, TextureHandle};
use crate::light::Light;
use crate::material::Material;
use crate::transform::Transform;

/// A drawable instance of a mesh.
#[derive(Debug, Clone)]
pub struct Entity {
    pub transform: Transform,
    pub mesh: MeshHandle,
    pub material: MaterialHandle,
}

impl Entity {
    #[must_use]
    pub fn new(transform: Transform, mesh: MeshHandle, material: MaterialHandle) -> Self {
        Self {
            transform,
            mesh,
            material,
        }
    }
}

/// Cubemap background, drawn behind everything else.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sky {
    pub cubemap: TextureHandle,
    /// Multiplied with the cubemap sample.
    pub tint: Vec3,
}

/// Everything the frame renders. Read-only while a frame is drawn.
#[derive(Debug, Clone)]
pub struct Scene {
    pub camera: Camera,
    pub entities: Vec<Entity>,
    pub materials: Vec<Material>,
    pub lights: Vec<Light>,
    pub sky: Option<Sky>,
    pub ambient: Vec3,
}

impl Scene {
    #[must_use]
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            entities: Vec::new(),
            materials: Vec::new(),
            lights: Vec::new(),
            sky: None,
            ambient: Vec3::splat(0.1),
        }
    }

    pub fn add_material(&mut self, material: Material) -> MaterialHandle {
        self.materials.push(material);
        MaterialHandle(self.materials.len() as u32 - 1)
    }

    pub fn add_entity(&mut self, entity: Entity) {
        self.entities.push(entity);
    }

    pub fn material(&self, handle: MaterialHandle) -> Option<&Material> {
        self.materials.get(handle.index())
    }

    /// Visit each entity together with its material, in insertion order.
    ///
    /// Entities whose material handle does not resolve are skipped.
    pub fn for_each_entity(&self, mut f: impl FnMut(&Entity, &Material)) {
        for entity in &self.entities {
            match self.material(entity.material) {
                Some(material) => f(entity, material),
                None => log::warn!(
                    "Skipping entity with unknown material {:?}",
                    entity.material
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn scene() -> Scene {
        Scene::new(Camera::new(Vec3::ZERO, 1.0))
    }

    #[test]
    fn test_material_handles_are_sequential() {
        let mut s = scene();
        let a = s.add_material(Material::new(Vec4::ONE, 0.0));
        let b = s.add_material(Material::new(Vec4::ZERO, 1.0));
        assert_eq!(a, MaterialHandle(0));
        assert_eq!(b, MaterialHandle(1));
        assert_eq!(s.material(b).map(|m| m.roughness), Some(1.0));
    }

    #[test]
    fn test_for_each_entity_visits_in_order() {
        let mut s = scene();
        let m = s.add_material(Material::new(Vec4::ONE, 0.0));
        for i in 0..3 {
            s.add_entity(Entity::new(Transform::new(), MeshHandle(i), m));
        }
        let mut seen = Vec::new();
        s.for_each_entity(|e, _| seen.push(e.mesh));
        assert_eq!(seen, [MeshHandle(0), MeshHandle(1), MeshHandle(2)]);
    }

    #[test]
    fn test_unresolved_material_is_skipped() {
        let mut s = scene();
        let m = s.add_material(Material::new(Vec4::ONE, 0.0));
        s.add_entity(Entity::new(Transform::new(), MeshHandle(0), m));
        s.add_entity(Entity::new(Transform::new(), MeshHandle(1), MaterialHandle(9)));
        let mut count = 0;
        s.for_each_entity(|_, _| count += 1);
        assert_eq!(count, 1);
    }
}
