//! Reverse-Z depth buffer shared by the scene pass.
//!
//! The near plane maps to 1.0 and the far plane to 0.0, so the buffer clears
//! to 0.0 and the test passes when the incoming depth is greater or equal.

use crate::backend::Extent;

pub struct DepthBuffer {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    extent: Extent,
}

impl DepthBuffer {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Far plane.
    pub const CLEAR_VALUE: f32 = 0.0;

    /// Nearer fragments have larger depth.
    pub const COMPARE_FUNCTION: wgpu::CompareFunction = wgpu::CompareFunction::GreaterEqual;

    /// Zero dimensions are raised to 1.
    pub fn new(device: &wgpu::Device, extent: Extent) -> Self {
        let extent = Extent::new(extent.width.max(1), extent.height.max(1));
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth-buffer"),
            size: wgpu::Extent3d {
                width: extent.width,
                height: extent.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            extent,
        }
    }

    /// Recreate at `extent`. No-op if the size is unchanged.
    pub fn resize(&mut self, device: &wgpu::Device, extent: Extent) {
        let extent = Extent::new(extent.width.max(1), extent.height.max(1));
        if self.extent == extent {
            return;
        }
        *self = Self::new(device, extent);
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// Depth-stencil state for pipelines drawing into this buffer.
    pub fn state(write: bool) -> wgpu::DepthStencilState {
        wgpu::DepthStencilState {
            format: Self::FORMAT,
            depth_write_enabled: write,
            depth_compare: Self::COMPARE_FUNCTION,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }
    }
}
