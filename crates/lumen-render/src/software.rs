//! CPU reference backend.
//!
//! Executes the full-screen stages with the same math as `post.wgsl` on plain
//! `[f32; 4]` buffers, and records every call as a [`Command`]. The scene pass
//! is approximated: each entity writes its material tint as a small square at
//! its projected origin, and the sky fills whatever no entity covered.
//!
//! `Rgba8Unorm` surfaces clamp and quantize on write; `Rgba16Float` surfaces
//! and the backbuffer keep full `f32` values.

use glam::{Mat4, Vec4};
use lumen_scene::{MeshHandle, Sky};

use crate::backend::{
    EntityDraw, Extent, FrameBackend, FullscreenDraw, PassBackend, PassTarget, PixelFormat,
    SceneView, SurfaceHandle,
};
use crate::fullscreen::{PassParams, ShaderStage, GAUSSIAN_WEIGHTS, LUMINANCE};
use crate::target::TargetError;

/// Largest surface edge the software backend accepts.
pub const MAX_SURFACE_DIMENSION: u32 = 16384;

/// Half-width in pixels of the square an entity draw covers.
const ENTITY_SPLAT_RADIUS: i64 = 2;

const BLACK: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Clear {
        target: PassTarget,
        color: [f32; 4],
    },
    Fullscreen {
        stage: ShaderStage,
        sources: Vec<SurfaceHandle>,
        params: PassParams,
        destination: PassTarget,
        viewport: Extent,
    },
    ClearDepth,
    BindSceneTarget(SurfaceHandle),
    DrawEntity {
        mesh: MeshHandle,
    },
    DrawSky,
    BindBackbuffer,
    Present,
}

#[derive(Debug, Clone)]
struct Surface {
    extent: Extent,
    format: PixelFormat,
    pixels: Vec<[f32; 4]>,
}

impl Surface {
    fn new(extent: Extent, format: PixelFormat) -> Self {
        Self {
            extent,
            format,
            pixels: vec![BLACK; extent.width as usize * extent.height as usize],
        }
    }

    fn store(&self, color: [f32; 4]) -> [f32; 4] {
        store(self.format, color)
    }

    fn texel(&self, x: i64, y: i64) -> [f32; 4] {
        let x = x.clamp(0, i64::from(self.extent.width) - 1) as usize;
        let y = y.clamp(0, i64::from(self.extent.height) - 1) as usize;
        self.pixels[y * self.extent.width as usize + x]
    }

    /// Bilinear sample with clamp-to-edge addressing.
    fn sample(&self, uv: [f32; 2]) -> [f32; 4] {
        let x = uv[0] * self.extent.width as f32 - 0.5;
        let y = uv[1] * self.extent.height as f32 - 0.5;
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;
        let (ix, iy) = (x0 as i64, y0 as i64);

        let a = self.texel(ix, iy);
        let b = self.texel(ix + 1, iy);
        let c = self.texel(ix, iy + 1);
        let d = self.texel(ix + 1, iy + 1);
        std::array::from_fn(|i| {
            let top = a[i] + (b[i] - a[i]) * fx;
            let bottom = c[i] + (d[i] - c[i]) * fx;
            top + (bottom - top) * fy
        })
    }
}

/// What a texel of `format` holds after writing `color`.
fn store(format: PixelFormat, color: [f32; 4]) -> [f32; 4] {
    match format {
        PixelFormat::Rgba16Float => color,
        PixelFormat::Rgba8Unorm => color.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() / 255.0),
    }
}

/// Where scene draws currently land.
#[derive(Debug, Clone, Copy)]
struct SceneBinding {
    surface: SurfaceHandle,
    view_projection: Mat4,
}

/// CPU implementation of [`PassBackend`] and [`FrameBackend`].
#[derive(Debug)]
pub struct SoftwareBackend {
    /// Released slots stay `None`; handles are never reused.
    surfaces: Vec<Option<Surface>>,
    backbuffer: Surface,
    depth: Vec<f32>,
    scene: Option<SceneBinding>,
    commands: Vec<Command>,
    fail_allocations: bool,
}

impl SoftwareBackend {
    pub fn new(backbuffer: Extent) -> Self {
        Self {
            surfaces: Vec::new(),
            backbuffer: Surface::new(backbuffer, PixelFormat::Rgba16Float),
            depth: Vec::new(),
            scene: None,
            commands: Vec::new(),
            fail_allocations: false,
        }
    }

    /// Simulate a window resize. Backbuffer contents are reset to black.
    pub fn set_backbuffer_extent(&mut self, extent: Extent) {
        self.backbuffer = Surface::new(extent, PixelFormat::Rgba16Float);
    }

    /// Make every following allocation fail.
    pub fn fail_allocations(&mut self, fail: bool) {
        self.fail_allocations = fail;
    }

    pub fn live_surface_count(&self) -> usize {
        self.surfaces.iter().flatten().count()
    }

    /// Overwrite a surface pixel by pixel. Not recorded as a command.
    pub fn fill_surface(&mut self, surface: SurfaceHandle, mut f: impl FnMut(u32, u32) -> [f32; 4]) {
        let Some(s) = self.surface_mut(surface) else {
            log::warn!("fill of unknown surface {surface:?}");
            return;
        };
        let (width, format) = (s.extent.width, s.format);
        for (i, px) in s.pixels.iter_mut().enumerate() {
            let x = i as u32 % width;
            let y = i as u32 / width;
            *px = store(format, f(x, y));
        }
    }

    /// Pixels of a live surface, row-major.
    pub fn surface_pixels(&self, surface: SurfaceHandle) -> Option<&[[f32; 4]]> {
        self.surface(surface).map(|s| s.pixels.as_slice())
    }

    /// Backbuffer pixels, row-major.
    pub fn backbuffer_pixels(&self) -> &[[f32; 4]] {
        &self.backbuffer.pixels
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    fn surface(&self, handle: SurfaceHandle) -> Option<&Surface> {
        self.surfaces.get(handle.0 as usize).and_then(Option::as_ref)
    }

    fn surface_mut(&mut self, handle: SurfaceHandle) -> Option<&mut Surface> {
        self.surfaces
            .get_mut(handle.0 as usize)
            .and_then(Option::as_mut)
    }

    fn target_mut(&mut self, target: PassTarget) -> Option<&mut Surface> {
        match target {
            PassTarget::Backbuffer => Some(&mut self.backbuffer),
            PassTarget::Surface(handle) => self.surface_mut(handle),
        }
    }

    fn target_extent(&self, target: PassTarget) -> Option<Extent> {
        match target {
            PassTarget::Backbuffer => Some(self.backbuffer.extent),
            PassTarget::Surface(handle) => self.surface(handle).map(|s| s.extent),
        }
    }

    /// Evaluate one fragment of `draw` at `uv`.
    fn shade(&self, draw: &FullscreenDraw<'_>, uv: [f32; 2]) -> [f32; 4] {
        let sample = |slot: usize, uv: [f32; 2]| -> [f32; 4] {
            draw.sources
                .get(slot)
                .and_then(|h| self.surface(*h))
                .map_or(BLACK, |s| s.sample(uv))
        };
        let p = draw.params;

        match draw.stage {
            ShaderStage::BloomExtract => {
                let c = sample(0, uv);
                let luma = c[0] * LUMINANCE[0] + c[1] * LUMINANCE[1] + c[2] * LUMINANCE[2];
                if luma > p.threshold {
                    [c[0], c[1], c[2], 1.0]
                } else {
                    BLACK
                }
            }
            ShaderStage::GaussianBlur => {
                let mut sum = [0.0; 4];
                for i in -4_i32..=4 {
                    let w = GAUSSIAN_WEIGHTS[i.unsigned_abs() as usize];
                    let offset = [
                        p.direction[0] * p.pixel_size[0] * i as f32,
                        p.direction[1] * p.pixel_size[1] * i as f32,
                    ];
                    let c = sample(0, [uv[0] + offset[0], uv[1] + offset[1]]);
                    for k in 0..4 {
                        sum[k] += c[k] * w;
                    }
                }
                sum
            }
            ShaderStage::BloomCombine => {
                let scene = sample(0, uv);
                let mut rgb = [scene[0], scene[1], scene[2]];
                for level in 0..crate::MAX_BLOOM_LEVELS {
                    let c = sample(level + 1, uv);
                    let w = p.intensity(level);
                    for k in 0..3 {
                        rgb[k] += c[k] * w;
                    }
                }
                [rgb[0], rgb[1], rgb[2], scene[3]]
            }
            ShaderStage::FullscreenBlur => box_blur(p, uv, |uv| sample(0, uv)),
        }
    }
}

/// Average over a `(2r+1)^2` texel window; `r == 0` is a plain copy.
fn box_blur(params: &PassParams, uv: [f32; 2], sample: impl Fn([f32; 2]) -> [f32; 4]) -> [f32; 4] {
    let radius = params.blur_amount as i32;
    if radius <= 0 {
        return sample(uv);
    }
    let mut sum = [0.0; 4];
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let c = sample([
                uv[0] + dx as f32 * params.pixel_size[0],
                uv[1] + dy as f32 * params.pixel_size[1],
            ]);
            for k in 0..4 {
                sum[k] += c[k];
            }
        }
    }
    let n = ((2 * radius + 1) * (2 * radius + 1)) as f32;
    sum.map(|c| c / n)
}

impl PassBackend for SoftwareBackend {
    fn backbuffer_extent(&self) -> Extent {
        self.backbuffer.extent
    }

    fn allocate_surface(
        &mut self,
        extent: Extent,
        format: PixelFormat,
    ) -> Result<SurfaceHandle, TargetError> {
        let refuse = |reason: &str| TargetError::AllocationFailed {
            width: extent.width,
            height: extent.height,
            format,
            reason: reason.to_string(),
        };
        if self.fail_allocations {
            return Err(refuse("allocations disabled"));
        }
        if extent.is_empty() {
            return Err(refuse("zero-sized surface"));
        }
        if extent.width > MAX_SURFACE_DIMENSION || extent.height > MAX_SURFACE_DIMENSION {
            return Err(refuse("exceeds the maximum surface dimension"));
        }

        let handle = SurfaceHandle(self.surfaces.len() as u32);
        self.surfaces.push(Some(Surface::new(extent, format)));
        Ok(handle)
    }

    fn release_surface(&mut self, surface: SurfaceHandle) {
        if let Some(slot) = self.surfaces.get_mut(surface.0 as usize) {
            *slot = None;
        }
    }

    fn surface_extent(&self, surface: SurfaceHandle) -> Option<Extent> {
        self.surface(surface).map(|s| s.extent)
    }

    fn clear_target(&mut self, target: PassTarget, color: [f32; 4]) {
        self.commands.push(Command::Clear { target, color });
        if let Some(s) = self.target_mut(target) {
            let stored = s.store(color);
            s.pixels.fill(stored);
        }
    }

    fn draw_fullscreen(&mut self, draw: &FullscreenDraw<'_>) {
        self.commands.push(Command::Fullscreen {
            stage: draw.stage,
            sources: draw.sources.to_vec(),
            params: *draw.params,
            destination: draw.destination,
            viewport: draw.viewport,
        });

        let Some(dest) = self.target_extent(draw.destination) else {
            log::warn!("{} draw into released surface", draw.stage.label());
            return;
        };
        let vw = draw.viewport.width.min(dest.width);
        let vh = draw.viewport.height.min(dest.height);

        let mut out = vec![BLACK; dest.width as usize * dest.height as usize];
        for y in 0..vh {
            for x in 0..vw {
                let uv = [
                    (x as f32 + 0.5) / vw as f32,
                    (y as f32 + 0.5) / vh as f32,
                ];
                out[(y * dest.width + x) as usize] = self.shade(draw, uv);
            }
        }

        if let Some(s) = self.target_mut(draw.destination) {
            let format = s.format;
            for (px, c) in s.pixels.iter_mut().zip(out) {
                *px = store(format, c);
            }
        }
    }
}

impl FrameBackend for SoftwareBackend {
    fn clear_depth(&mut self) {
        self.commands.push(Command::ClearDepth);
        self.depth.fill(0.0);
    }

    fn bind_scene_target(&mut self, surface: SurfaceHandle, view: &SceneView<'_>) {
        self.commands.push(Command::BindSceneTarget(surface));
        let Some(extent) = self.surface_extent(surface) else {
            log::warn!("scene target {surface:?} is not a live surface");
            self.scene = None;
            return;
        };
        let texels = extent.width as usize * extent.height as usize;
        if self.depth.len() != texels {
            self.depth = vec![0.0; texels];
        }
        self.scene = Some(SceneBinding {
            surface,
            view_projection: view.view_projection(),
        });
    }

    fn draw_entity(&mut self, draw: &EntityDraw<'_>) {
        self.commands.push(Command::DrawEntity { mesh: draw.mesh });
        let Some(binding) = self.scene else {
            log::trace!("entity draw with no scene target bound");
            return;
        };

        let clip = binding.view_projection * draw.world * Vec4::new(0.0, 0.0, 0.0, 1.0);
        if clip.w <= 0.0 {
            return;
        }
        let ndc = clip.truncate() / clip.w;
        if !(0.0..=1.0).contains(&ndc.z) {
            return;
        }

        let tint = draw.material.color_tint;
        let color = [tint.x, tint.y, tint.z, tint.w];
        let depth = &mut self.depth;
        let Some(s) = self
            .surfaces
            .get_mut(binding.surface.0 as usize)
            .and_then(Option::as_mut)
        else {
            return;
        };
        let (w, h) = (i64::from(s.extent.width), i64::from(s.extent.height));
        let cx = ((ndc.x * 0.5 + 0.5) * w as f32).floor() as i64;
        let cy = ((0.5 - ndc.y * 0.5) * h as f32).floor() as i64;
        let stored = s.store(color);

        for y in (cy - ENTITY_SPLAT_RADIUS).max(0)..=(cy + ENTITY_SPLAT_RADIUS).min(h - 1) {
            for x in (cx - ENTITY_SPLAT_RADIUS).max(0)..=(cx + ENTITY_SPLAT_RADIUS).min(w - 1) {
                let i = (y * w + x) as usize;
                // Reverse-Z: larger is nearer.
                if ndc.z >= depth[i] {
                    depth[i] = ndc.z;
                    s.pixels[i] = stored;
                }
            }
        }
    }

    fn draw_sky(&mut self, sky: &Sky) {
        self.commands.push(Command::DrawSky);
        let Some(binding) = self.scene else {
            log::trace!("sky draw with no scene target bound");
            return;
        };
        let depth = &self.depth;
        let Some(s) = self
            .surfaces
            .get_mut(binding.surface.0 as usize)
            .and_then(Option::as_mut)
        else {
            return;
        };
        let stored = s.store([sky.tint.x, sky.tint.y, sky.tint.z, 1.0]);
        for (px, d) in s.pixels.iter_mut().zip(depth) {
            if *d == 0.0 {
                *px = stored;
            }
        }
    }

    fn bind_backbuffer(&mut self) {
        self.commands.push(Command::BindBackbuffer);
        self.scene = None;
    }

    fn present(&mut self) {
        self.commands.push(Command::Present);
    }
}
