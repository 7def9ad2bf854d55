//! GPU uniform layouts and the per-frame dynamic-offset uniform ring.

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4};
use static_assertions::assert_eq_size;

use lumen_scene::{Light, LightKind, Material, Sky, MAX_LIGHTS};

use crate::backend::SceneView;

/// One light as `scene.wgsl` reads it.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GpuLight {
    /// rgb color, a intensity.
    pub color: [f32; 4],
    /// xyz direction of travel, w kind (0 directional, 1 point).
    pub direction: [f32; 4],
    /// xyz position, w range.
    pub position: [f32; 4],
}

assert_eq_size!(GpuLight, [u8; 48]);

impl From<&Light> for GpuLight {
    fn from(light: &Light) -> Self {
        let kind = match light.kind {
            LightKind::Directional => 0.0,
            LightKind::Point => 1.0,
        };
        Self {
            color: light.color.extend(light.intensity).to_array(),
            direction: light.direction.extend(kind).to_array(),
            position: light.position.extend(light.range).to_array(),
        }
    }
}

/// Per-frame scene constants.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct FrameUniform {
    pub view_proj: [[f32; 4]; 4],
    /// w holds seconds since startup.
    pub camera_position: [f32; 4],
    pub ambient: [f32; 4],
    /// x holds the number of valid entries in `lights`.
    pub light_count: [u32; 4],
    pub lights: [GpuLight; MAX_LIGHTS],
}

assert_eq_size!(FrameUniform, [u8; 496]);

impl FrameUniform {
    /// Lights past [`MAX_LIGHTS`] are dropped.
    pub fn new(view: &SceneView<'_>) -> Self {
        if view.lights.len() > MAX_LIGHTS {
            log::debug!(
                "{} lights in scene, only the first {MAX_LIGHTS} are used",
                view.lights.len()
            );
        }
        let mut lights = [GpuLight::default(); MAX_LIGHTS];
        for (slot, light) in lights.iter_mut().zip(view.lights) {
            *slot = light.into();
        }
        Self {
            view_proj: view.view_projection().to_cols_array_2d(),
            camera_position: view.camera_position.extend(view.total_time).to_array(),
            ambient: view.ambient.extend(1.0).to_array(),
            light_count: [view.lights.len().min(MAX_LIGHTS) as u32, 0, 0, 0],
            lights,
        }
    }
}

/// Per-entity constants.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct ObjectUniform {
    pub world: [[f32; 4]; 4],
    pub world_inverse_transpose: [[f32; 4]; 4],
    pub color_tint: [f32; 4],
    /// x roughness.
    pub surface: [f32; 4],
}

assert_eq_size!(ObjectUniform, [u8; 160]);

impl ObjectUniform {
    pub fn new(world: Mat4, world_inverse_transpose: Mat4, material: &Material) -> Self {
        Self {
            world: world.to_cols_array_2d(),
            world_inverse_transpose: world_inverse_transpose.to_cols_array_2d(),
            color_tint: material.color_tint.to_array(),
            surface: [material.roughness, 0.0, 0.0, 0.0],
        }
    }
}

/// Sky constants: un-projects screen positions into world directions.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct SkyUniform {
    pub inverse_view_projection: [[f32; 4]; 4],
    pub tint: [f32; 4],
}

assert_eq_size!(SkyUniform, [u8; 80]);

impl SkyUniform {
    /// The view's translation is dropped so the sky stays at infinity.
    pub fn new(view: Mat4, projection: Mat4, sky: &Sky) -> Self {
        let rotation_only = Mat4::from_mat3(Mat3::from_mat4(view));
        Self {
            inverse_view_projection: (projection * rotation_only).inverse().to_cols_array_2d(),
            tint: sky.tint.extend(1.0).to_array(),
        }
    }
}

/// Round `value` up to a multiple of `align`.
pub fn align_up(value: u64, align: u64) -> u64 {
    value.div_ceil(align) * align
}

/// Space reserved for the largest uniform type.
fn slot_stride(align: u64) -> u64 {
    align_up(size_of::<FrameUniform>() as u64, align)
}

/// Ring size for a frame issuing `draws` uniform writes.
pub fn ring_size_for(draws: usize, align: u64) -> u64 {
    draws.max(1) as u64 * slot_stride(align)
}

/// A uniform buffer written front to back once per frame.
///
/// Each push lands at a fresh aligned offset, so every draw of the frame
/// sees its own values once the queue writes are flushed at submit.
pub struct UniformRing {
    buffer: wgpu::Buffer,
    size: u64,
    align: u64,
    cursor: u64,
}

impl UniformRing {
    pub fn new(device: &wgpu::Device, size: u64) -> Self {
        let align = u64::from(device.limits().min_uniform_buffer_offset_alignment);
        let size = align_up(size.max(align), align);
        Self {
            buffer: create_ring_buffer(device, size),
            size,
            align,
            cursor: 0,
        }
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn align(&self) -> u64 {
        self.align
    }

    /// Start a new frame. Returns true if the buffer was recreated to hold
    /// `needed` bytes; bind groups referencing it must then be rebuilt.
    pub fn begin_frame(&mut self, device: &wgpu::Device, needed: u64) -> bool {
        self.cursor = 0;
        if needed <= self.size {
            return false;
        }
        self.size = align_up(needed.next_power_of_two(), self.align);
        self.buffer = create_ring_buffer(device, self.size);
        log::debug!("Uniform ring grown to {} bytes", self.size);
        true
    }

    /// Write `value` at the next free offset. `None` if the ring is full.
    pub fn push<T: Pod>(&mut self, queue: &wgpu::Queue, value: &T) -> Option<u32> {
        let len = size_of::<T>() as u64;
        if self.cursor + len > self.size {
            return None;
        }
        let offset = self.cursor;
        queue.write_buffer(&self.buffer, offset, bytemuck::bytes_of(value));
        self.cursor = align_up(offset + len, self.align);
        u32::try_from(offset).ok()
    }
}

fn create_ring_buffer(device: &wgpu::Device, size: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("uniform-ring"),
        size,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}
