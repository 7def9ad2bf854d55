//! 2D textures and cubemaps, addressed by [`TextureHandle`].

use glam::Vec3;
use lumen_scene::TextureHandle;

/// Every texture is stored as 8-bit sRGB RGBA.
pub const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

const BYTES_PER_TEXEL: usize = 4;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TextureError {
    #[error("texture dimensions must be non-zero, got {width}x{height}")]
    ZeroDimensions { width: u32, height: u32 },

    #[error("texture data is {actual} bytes, expected {expected} for {width}x{height}x{layers}")]
    DataSizeMismatch {
        actual: usize,
        expected: usize,
        width: u32,
        height: u32,
        layers: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureKind {
    D2,
    Cube,
}

pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub kind: TextureKind,
}

#[derive(Default)]
pub struct TextureStore {
    textures: Vec<GpuTexture>,
}

impl TextureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upload tightly packed RGBA8 texels.
    pub fn upload_2d(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        rgba: &[u8],
        width: u32,
        height: u32,
    ) -> Result<TextureHandle, TextureError> {
        validate(rgba, width, height, 1)?;
        let texture = create_and_write(device, queue, label, rgba, width, height, 1);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(self.push(label, texture, view, TextureKind::D2))
    }

    /// Upload six square faces in +X, -X, +Y, -Y, +Z, -Z order.
    pub fn upload_cubemap(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        faces: &[u8],
        size: u32,
    ) -> Result<TextureHandle, TextureError> {
        validate(faces, size, size, 6)?;
        let texture = create_and_write(device, queue, label, faces, size, size, 6);
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });
        Ok(self.push(label, texture, view, TextureKind::Cube))
    }

    pub fn get(&self, handle: TextureHandle) -> Option<&GpuTexture> {
        self.textures.get(handle.index())
    }

    /// The texture behind `handle` if it is of `kind`.
    pub fn view(&self, handle: TextureHandle, kind: TextureKind) -> Option<&wgpu::TextureView> {
        self.get(handle)
            .filter(|t| t.kind == kind)
            .map(|t| &t.view)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    fn push(
        &mut self,
        label: &str,
        texture: wgpu::Texture,
        view: wgpu::TextureView,
        kind: TextureKind,
    ) -> TextureHandle {
        log::debug!(
            "Uploaded {kind:?} texture '{label}' ({}x{})",
            texture.width(),
            texture.height()
        );
        self.textures.push(GpuTexture {
            texture,
            view,
            kind,
        });
        TextureHandle(self.textures.len() as u32 - 1)
    }
}

fn validate(data: &[u8], width: u32, height: u32, layers: u32) -> Result<(), TextureError> {
    if width == 0 || height == 0 {
        return Err(TextureError::ZeroDimensions { width, height });
    }
    let expected = width as usize * height as usize * layers as usize * BYTES_PER_TEXEL;
    if data.len() != expected {
        return Err(TextureError::DataSizeMismatch {
            actual: data.len(),
            expected,
            width,
            height,
            layers,
        });
    }
    Ok(())
}

fn create_and_write(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    data: &[u8],
    width: u32,
    height: u32,
    layers: u32,
) -> wgpu::Texture {
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: layers,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TEXTURE_FORMAT,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        data,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(width * BYTES_PER_TEXEL as u32),
            rows_per_image: Some(height),
        },
        size,
    );
    texture
}

/// World direction through texel `(u, v)` of cube face `face`, with `u`, `v` in `[-1, 1]`.
///
/// Faces follow the +X, -X, +Y, -Y, +Z, -Z layer order; `v` grows downwards.
pub fn cube_face_direction(face: usize, u: f32, v: f32) -> Vec3 {
    let dir = match face {
        0 => Vec3::new(1.0, -v, -u),
        1 => Vec3::new(-1.0, -v, u),
        2 => Vec3::new(u, 1.0, v),
        3 => Vec3::new(u, -1.0, -v),
        4 => Vec3::new(u, -v, 1.0),
        _ => Vec3::new(-u, -v, -1.0),
    };
    dir.normalize()
}

/// Six RGBA8 faces of a vertical sky gradient: `ground` below the horizon,
/// blending from `horizon` up to `zenith` above it.
pub fn gradient_cubemap(size: u32, zenith: Vec3, horizon: Vec3, ground: Vec3) -> Vec<u8> {
    let size = size.max(1);
    let mut data = Vec::with_capacity(6 * (size * size) as usize * BYTES_PER_TEXEL);
    for face in 0..6 {
        for y in 0..size {
            for x in 0..size {
                let u = (x as f32 + 0.5) / size as f32 * 2.0 - 1.0;
                let v = (y as f32 + 0.5) / size as f32 * 2.0 - 1.0;
                let up = cube_face_direction(face, u, v).y;
                let color = if up >= 0.0 {
                    horizon.lerp(zenith, up.sqrt())
                } else {
                    horizon.lerp(ground, (-up * 4.0).min(1.0))
                };
                let c = color.clamp(Vec3::ZERO, Vec3::ONE) * 255.0;
                data.extend([c.x.round() as u8, c.y.round() as u8, c.z.round() as u8, 255]);
            }
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::create_test_device_queue;

    #[test]
    fn test_face_centres_point_along_axes() {
        let axes = [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z];
        for (face, axis) in axes.into_iter().enumerate() {
            assert!(cube_face_direction(face, 0.0, 0.0).abs_diff_eq(axis, 1e-6));
        }
    }

    #[test]
    fn test_side_faces_have_up_at_top() {
        for face in [0, 1, 4, 5] {
            assert!(cube_face_direction(face, 0.0, -1.0).y > 0.0);
        }
    }

    #[test]
    fn test_gradient_cubemap_size_and_colors() {
        let zenith = Vec3::new(0.0, 0.0, 1.0);
        let ground = Vec3::new(0.0, 1.0, 0.0);
        let data = gradient_cubemap(4, zenith, Vec3::ONE, ground);
        assert_eq!(data.len(), 6 * 4 * 4 * 4);

        let face = |f: usize| &data[f * 64..(f + 1) * 64];
        // +Y is mostly zenith blue, -Y ground green.
        assert!(face(2).chunks(4).all(|px| px[2] > px[0]));
        assert!(face(3).chunks(4).all(|px| px[1] > px[0]));
        assert!(data.chunks(4).all(|px| px[3] == 255));
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        assert_eq!(
            validate(&[], 0, 4, 1),
            Err(TextureError::ZeroDimensions {
                width: 0,
                height: 4
            })
        );
        assert!(matches!(
            validate(&[0; 10], 2, 2, 1),
            Err(TextureError::DataSizeMismatch { expected: 16, .. })
        ));
        assert!(validate(&[0; 96], 2, 2, 6).is_ok());
    }

    #[test]
    fn test_cubemap_view_kind_is_checked() {
        let Some((device, queue)) = create_test_device_queue() else {
            return;
        };
        let mut store = TextureStore::new();
        let flat = store
            .upload_2d(&device, &queue, "white", &[255; 4], 1, 1)
            .unwrap();
        let sky = store
            .upload_cubemap(&device, &queue, "sky", &gradient_cubemap(2, Vec3::Z, Vec3::ONE, Vec3::Y), 2)
            .unwrap();
        assert!(store.view(flat, TextureKind::D2).is_some());
        assert!(store.view(flat, TextureKind::Cube).is_none());
        assert!(store.view(sky, TextureKind::Cube).is_some());
    }
}
