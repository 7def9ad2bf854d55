//! The seam between the frame logic and whatever executes it.
//!
//! [`PassBackend`] covers what the post-process chain needs: surfaces and
//! full-screen draws. [`FrameBackend`] adds the scene pass and presentation.
//! [`GpuBackend`](crate::GpuBackend) implements both with wgpu;
//! [`SoftwareBackend`](crate::SoftwareBackend) implements them on the CPU.

use glam::{Mat4, Vec3};
use lumen_scene::{Light, Material, MeshHandle, Sky};

use crate::fullscreen::{PassParams, ShaderStage};
use crate::target::TargetError;

/// Opaque reference to a backend-owned color surface (writable target plus readable view).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceHandle(pub u32);

/// Pixel formats for intermediate surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelFormat {
    Rgba8Unorm,
    #[default]
    Rgba16Float,
}

impl PixelFormat {
    pub fn to_wgpu(self) -> wgpu::TextureFormat {
        match self {
            Self::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
            Self::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
        }
    }
}

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// `floor(width * scale) x floor(height * scale)`.
    pub fn scaled(self, scale: f32) -> Self {
        let s = f64::from(scale);
        Self {
            width: (f64::from(self.width) * s).floor() as u32,
            height: (f64::from(self.height) * s).floor() as u32,
        }
    }

    /// True if either dimension is zero.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Component-wise minimum.
    pub fn min(self, other: Self) -> Self {
        Self {
            width: self.width.min(other.width),
            height: self.height.min(other.height),
        }
    }
}

/// Where a pass writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassTarget {
    Surface(SurfaceHandle),
    /// The presentable surface.
    Backbuffer,
}

/// One full-screen triangle draw, fully described.
#[derive(Debug, Clone, Copy)]
pub struct FullscreenDraw<'a> {
    pub stage: ShaderStage,
    /// Bound to texture slots 0.. in order.
    pub sources: &'a [SurfaceHandle],
    pub params: &'a PassParams,
    pub destination: PassTarget,
    /// Viewport anchored at the destination's top-left corner.
    pub viewport: Extent,
}

/// Per-frame constants for the scene pass.
#[derive(Debug, Clone, Copy)]
pub struct SceneView<'a> {
    pub view: Mat4,
    pub projection: Mat4,
    pub camera_position: Vec3,
    pub ambient: Vec3,
    pub lights: &'a [Light],
    /// Seconds since startup.
    pub total_time: f32,
}

impl SceneView<'_> {
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }
}

/// One entity draw in the scene pass.
#[derive(Debug, Clone, Copy)]
pub struct EntityDraw<'a> {
    pub mesh: MeshHandle,
    pub material: &'a Material,
    pub world: Mat4,
    pub world_inverse_transpose: Mat4,
}

/// Surface management and full-screen draws.
pub trait PassBackend {
    /// Current presentable surface size.
    fn backbuffer_extent(&self) -> Extent;

    /// Allocate a color surface usable both as a render output and a shader input.
    fn allocate_surface(
        &mut self,
        extent: Extent,
        format: PixelFormat,
    ) -> Result<SurfaceHandle, TargetError>;

    /// Release a surface. Unknown handles are ignored.
    fn release_surface(&mut self, surface: SurfaceHandle);

    /// Size of a live surface.
    fn surface_extent(&self, surface: SurfaceHandle) -> Option<Extent>;

    /// Fill the whole target with `color`.
    fn clear_target(&mut self, target: PassTarget, color: [f32; 4]);

    /// Overwrite the destination: everything inside the viewport gets the stage's
    /// output, everything outside is cleared to black.
    fn draw_fullscreen(&mut self, draw: &FullscreenDraw<'_>);
}

/// The scene pass and presentation, on top of [`PassBackend`].
pub trait FrameBackend: PassBackend {
    /// Reset the depth buffer to "furthest".
    fn clear_depth(&mut self);

    /// Route subsequent entity and sky draws into `surface`, with depth.
    fn bind_scene_target(&mut self, surface: SurfaceHandle, view: &SceneView<'_>);

    fn draw_entity(&mut self, draw: &EntityDraw<'_>);

    /// Draw the sky behind everything already drawn. Does not write depth.
    fn draw_sky(&mut self, sky: &Sky);

    /// Make the backbuffer and depth buffer the render output again.
    fn bind_backbuffer(&mut self);

    fn present(&mut self);
}
