//! The procedural demo scene: a textured floor, scattered lit shapes, a few
//! over-bright emissive objects for the bloom to catch, and a gradient sky.

use glam::{Vec3, Vec4};
use lumen_app::AppError;
use lumen_render::{GpuBackend, gradient_cubemap};
use lumen_scene::{
    Camera, Entity, Light, Material, MeshData, MeshHandle, SamplerKind, Scene, Sky, TextureHandle,
    Transform,
};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;

/// Fixed seed so every run shows the same layout.
pub const SCENE_SEED: u64 = 42;

const SCATTERED_OBJECTS: usize = 24;
const SCATTER_RADIUS: f32 = 14.0;
const FLOOR_SIZE: f32 = 40.0;
const SKY_FACE_SIZE: u32 = 64;

/// Handles to everything the scene needs uploaded.
#[derive(Debug, Clone, Copy)]
pub struct DemoAssets {
    pub cube: MeshHandle,
    pub sphere: MeshHandle,
    pub plane: MeshHandle,
    pub checker: TextureHandle,
    pub sky: TextureHandle,
}

impl DemoAssets {
    pub fn upload(backend: &mut GpuBackend) -> Result<Self, AppError> {
        let checker = checkerboard(256, 256, 32);
        let sky_faces = gradient_cubemap(
            SKY_FACE_SIZE,
            Vec3::new(0.12, 0.25, 0.65),
            Vec3::new(0.75, 0.8, 0.9),
            Vec3::new(0.2, 0.18, 0.16),
        );
        Ok(Self {
            cube: backend.upload_mesh("cube", &MeshData::cube(1.0)),
            sphere: backend.upload_mesh("sphere", &MeshData::uv_sphere(0.5, 32, 16)),
            plane: backend.upload_mesh("floor", &MeshData::plane(FLOOR_SIZE, FLOOR_SIZE / 4.0)),
            checker: backend.upload_texture("checker", &checker, 256, 256)?,
            sky: backend.upload_cubemap("sky", &sky_faces, SKY_FACE_SIZE)?,
        })
    }
}

/// Upload the assets and build the scene around `camera`.
pub fn build(backend: &mut GpuBackend, camera: Camera) -> Result<Scene, AppError> {
    let assets = DemoAssets::upload(backend)?;
    Ok(populate(Scene::new(camera), &assets, SCENE_SEED))
}

/// Fill `scene` with the demo layout. Deterministic for a given seed.
pub fn populate(mut scene: Scene, assets: &DemoAssets, seed: u64) -> Scene {
    let mut rng = Xoshiro256StarStar::seed_from_u64(seed);

    let floor = scene.add_material(
        Material::new(Vec4::new(0.8, 0.8, 0.8, 1.0), 0.9)
            .with_texture("diffuse", assets.checker)
            .with_sampler("diffuse", SamplerKind::LinearWrap),
    );
    scene.add_entity(Entity::new(Transform::new(), assets.plane, floor));

    for _ in 0..SCATTERED_OBJECTS {
        let angle = rng.gen_range(0.0..std::f32::consts::TAU);
        let distance = rng.gen_range(2.0..SCATTER_RADIUS);
        let size = rng.gen_range(0.5..1.8);
        let color = Vec4::new(
            rng.gen_range(0.2..1.0),
            rng.gen_range(0.2..1.0),
            rng.gen_range(0.2..1.0),
            1.0,
        );
        let material = scene.add_material(Material::new(color, rng.gen_range(0.1..0.9)));
        let mesh = if rng.gen_bool(0.5) {
            assets.sphere
        } else {
            assets.cube
        };

        let mut transform = Transform::from_position(Vec3::new(
            angle.cos() * distance,
            size * 0.5,
            angle.sin() * distance,
        ))
        .with_uniform_scale(size);
        transform.set_rotation(Vec3::new(0.0, rng.gen_range(0.0..std::f32::consts::TAU), 0.0));
        scene.add_entity(Entity::new(transform, mesh, material));
    }

    // Tints well above 1.0 survive into the HDR target and cross the bloom threshold.
    let emissive = [
        (Vec3::new(0.0, 1.5, 0.0), Vec4::new(8.0, 6.0, 2.0, 1.0)),
        (Vec3::new(-4.0, 1.0, -3.0), Vec4::new(1.5, 4.0, 10.0, 1.0)),
        (Vec3::new(5.0, 0.8, 2.0), Vec4::new(10.0, 1.5, 1.5, 1.0)),
    ];
    for (position, tint) in emissive {
        let material = scene.add_material(Material::new(tint, 0.2));
        scene.add_entity(Entity::new(
            Transform::from_position(position).with_uniform_scale(0.6),
            assets.sphere,
            material,
        ));
        scene.lights.push(Light::point(position, tint.truncate().normalize(), 3.0, 6.0));
    }

    scene.lights.push(Light::directional(
        Vec3::new(-0.4, -1.0, -0.3),
        Vec3::new(1.0, 0.95, 0.85),
        1.0,
    ));
    scene.sky = Some(Sky {
        cubemap: assets.sky,
        tint: Vec3::ONE,
    });
    scene
}

/// RGBA8 checkerboard of light and dark grey cells.
pub fn checkerboard(width: u32, height: u32, cell_size: u32) -> Vec<u8> {
    let cell = cell_size.max(1);
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            let value = if (x / cell + y / cell) % 2 == 0 { 220 } else { 90 };
            data.extend([value, value, value, 255]);
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_scene::{LightKind, MAX_LIGHTS};

    fn assets() -> DemoAssets {
        DemoAssets {
            cube: MeshHandle(0),
            sphere: MeshHandle(1),
            plane: MeshHandle(2),
            checker: TextureHandle(0),
            sky: TextureHandle(1),
        }
    }

    fn scene(seed: u64) -> Scene {
        populate(Scene::new(Camera::new(Vec3::new(0.0, 2.0, 10.0), 16.0 / 9.0)), &assets(), seed)
    }

    #[test]
    fn test_scene_layout() {
        let s = scene(SCENE_SEED);
        assert_eq!(s.entities.len(), 1 + SCATTERED_OBJECTS + 3);
        assert_eq!(s.entities[0].mesh, MeshHandle(2));
        assert!(s.sky.is_some());
        assert!(s.lights.len() <= MAX_LIGHTS);
        assert_eq!(
            s.lights.iter().filter(|l| l.kind == LightKind::Directional).count(),
            1
        );
    }

    #[test]
    fn test_every_entity_has_a_material() {
        let s = scene(SCENE_SEED);
        assert!(s.entities.iter().all(|e| s.material(e.material).is_some()));
    }

    #[test]
    fn test_scene_has_bloom_sources() {
        let s = scene(SCENE_SEED);
        let bright = s
            .materials
            .iter()
            .filter(|m| m.color_tint.truncate().max_element() > 1.0)
            .count();
        assert_eq!(bright, 3);
    }

    #[test]
    fn test_same_seed_same_layout() {
        let a = scene(7);
        let b = scene(7);
        let positions = |s: &Scene| -> Vec<Vec3> {
            s.entities.iter().map(|e| e.transform.position()).collect()
        };
        assert_eq!(positions(&a), positions(&b));
        assert_ne!(positions(&a), positions(&scene(8)));
    }

    #[test]
    fn test_floor_samples_checker_texture() {
        let s = scene(SCENE_SEED);
        let floor = s.material(s.entities[0].material).unwrap();
        assert_eq!(floor.texture("diffuse"), Some(TextureHandle(0)));
        assert_eq!(floor.sampler("diffuse"), Some(SamplerKind::LinearWrap));
    }

    #[test]
    fn test_checkerboard_alternates() {
        let data = checkerboard(4, 4, 2);
        assert_eq!(data.len(), 64);
        assert_eq!(data[0], 220);
        assert_eq!(data[2 * 4], 90);
        assert_eq!(data[(2 * 4 + 2) * 4], 220);
        assert!(data.chunks(4).all(|px| px[3] == 255));
    }
}
