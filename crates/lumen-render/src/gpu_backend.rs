//! wgpu implementation of [`PassBackend`] and [`FrameBackend`].
//!
//! Every call records into one command encoder per frame, opened by
//! [`GpuBackend::begin_frame`] and submitted by `present`. Each clear and each
//! full-screen draw is its own render pass. Scene draws between
//! `bind_scene_target` and the next non-scene call are deferred and flushed
//! together in a single pass that shares the depth buffer.
//!
//! Uniforms go through a [`UniformRing`] with dynamic offsets, so every draw
//! of the frame keeps its own values. Pipelines are created on first use per
//! (stage, target format).

use std::collections::HashMap;
use std::num::NonZeroU64;

use glam::Mat4;
use lumen_scene::{MeshData, MeshHandle, SamplerKind, Sky, TextureHandle};

use crate::backend::{
    EntityDraw, Extent, FrameBackend, FullscreenDraw, PassBackend, PassTarget, PixelFormat,
    SceneView, SurfaceHandle,
};
use crate::bloom::MAX_PASSES_PER_FRAME;
use crate::depth::DepthBuffer;
use crate::fullscreen::{PassParams, ShaderStage, MAX_PASS_SOURCES};
use crate::mesh_store::{vertex_layout, MeshStore};
use crate::shader::{ShaderLibrary, POST_SHADER, SCENE_SHADER, SKY_SHADER};
use crate::target::TargetError;
use crate::texture::{TextureError, TextureKind, TextureStore};
use crate::uniforms::{ring_size_for, FrameUniform, ObjectUniform, SkyUniform, UniformRing};

/// Material texture slot sampled by the lit shader.
pub const DIFFUSE_SLOT: &str = "diffuse";

/// Uniform writes per frame beyond one per entity: every post pass plus the
/// frame and sky blocks.
const FIXED_UNIFORM_WRITES: usize = MAX_PASSES_PER_FRAME + 2;

struct GpuSurface {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    extent: Extent,
}

struct FrameState {
    encoder: wgpu::CommandEncoder,
    surface_texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
}

enum SceneDraw {
    Entity {
        mesh: MeshHandle,
        object_offset: u32,
        material: wgpu::BindGroup,
    },
    Sky {
        uniform_offset: u32,
        cubemap: wgpu::BindGroup,
    },
}

/// Scene draws waiting for a flush.
struct ScenePass {
    target: SurfaceHandle,
    view: Mat4,
    projection: Mat4,
    frame_offset: u32,
    draws: Vec<SceneDraw>,
}

struct Layouts {
    pass_params: wgpu::BindGroupLayout,
    sources: wgpu::BindGroupLayout,
    frame: wgpu::BindGroupLayout,
    object: wgpu::BindGroupLayout,
    material: wgpu::BindGroupLayout,
    sky: wgpu::BindGroupLayout,
    cubemap: wgpu::BindGroupLayout,
}

/// Bind groups over the uniform ring, one per uniform type.
struct UniformGroups {
    pass_params: wgpu::BindGroup,
    frame: wgpu::BindGroup,
    object: wgpu::BindGroup,
    sky: wgpu::BindGroup,
}

#[derive(Clone)]
struct ScenePipelines {
    lit: wgpu::RenderPipeline,
    sky: wgpu::RenderPipeline,
}

pub struct GpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_format: wgpu::TextureFormat,
    backbuffer: Extent,
    depth: DepthBuffer,
    shaders: ShaderLibrary,
    layouts: Layouts,
    samplers: HashMap<SamplerKind, wgpu::Sampler>,
    post_sampler: wgpu::Sampler,
    ring: UniformRing,
    uniform_groups: UniformGroups,
    /// Released slots stay `None`; handles are never reused.
    surfaces: Vec<Option<GpuSurface>>,
    meshes: MeshStore,
    textures: TextureStore,
    black: wgpu::TextureView,
    white: wgpu::TextureView,
    post_pipelines: HashMap<(ShaderStage, wgpu::TextureFormat), wgpu::RenderPipeline>,
    scene_pipelines: HashMap<wgpu::TextureFormat, ScenePipelines>,
    source_groups: HashMap<Vec<SurfaceHandle>, wgpu::BindGroup>,
    material_groups: HashMap<(Option<TextureHandle>, SamplerKind), wgpu::BindGroup>,
    cubemap_groups: HashMap<TextureHandle, wgpu::BindGroup>,
    frame: Option<FrameState>,
    scene: Option<ScenePass>,
}

impl GpuBackend {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        backbuffer: Extent,
    ) -> Self {
        let layouts = Layouts::new(device);
        let ring = UniformRing::new(device, ring_size_for(FIXED_UNIFORM_WRITES + 64, 256));
        let uniform_groups = UniformGroups::new(device, &layouts, &ring);

        let samplers = [
            SamplerKind::LinearWrap,
            SamplerKind::LinearClamp,
            SamplerKind::NearestWrap,
        ]
        .into_iter()
        .map(|kind| (kind, create_sampler(device, kind)))
        .collect();

        Self {
            device: device.clone(),
            queue: queue.clone(),
            surface_format,
            backbuffer,
            depth: DepthBuffer::new(device, backbuffer),
            shaders: ShaderLibrary::new(),
            post_sampler: create_sampler(device, SamplerKind::LinearClamp),
            samplers,
            ring,
            uniform_groups,
            surfaces: Vec::new(),
            meshes: MeshStore::new(),
            textures: TextureStore::new(),
            black: solid_texture(device, queue, "black", [0, 0, 0, 255]),
            white: solid_texture(device, queue, "white", [255, 255, 255, 255]),
            layouts,
            post_pipelines: HashMap::new(),
            scene_pipelines: HashMap::new(),
            source_groups: HashMap::new(),
            material_groups: HashMap::new(),
            cubemap_groups: HashMap::new(),
            frame: None,
            scene: None,
        }
    }

    /// Track a new swapchain size. The depth buffer follows.
    pub fn resize_backbuffer(&mut self, extent: Extent) {
        self.backbuffer = extent;
        self.depth.resize(&self.device, extent);
    }

    pub fn upload_mesh(&mut self, label: &str, data: &MeshData) -> MeshHandle {
        self.meshes.upload(&self.device, label, data)
    }

    pub fn upload_texture(
        &mut self,
        label: &str,
        rgba: &[u8],
        width: u32,
        height: u32,
    ) -> Result<TextureHandle, TextureError> {
        self.textures
            .upload_2d(&self.device, &self.queue, label, rgba, width, height)
    }

    pub fn upload_cubemap(
        &mut self,
        label: &str,
        faces: &[u8],
        size: u32,
    ) -> Result<TextureHandle, TextureError> {
        self.textures
            .upload_cubemap(&self.device, &self.queue, label, faces, size)
    }

    /// Open a frame that renders into `surface_texture`.
    ///
    /// `entity_count` sizes the uniform ring for this frame's draws.
    pub fn begin_frame(&mut self, surface_texture: wgpu::SurfaceTexture, entity_count: usize) {
        if self.frame.is_some() {
            log::warn!("begin_frame while a frame is open, dropping the old frame");
        }
        let needed = ring_size_for(entity_count + FIXED_UNIFORM_WRITES, self.ring.align());
        if self.ring.begin_frame(&self.device, needed) {
            self.uniform_groups = UniformGroups::new(&self.device, &self.layouts, &self.ring);
        }

        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame-encoder"),
            });
        self.frame = Some(FrameState {
            encoder,
            surface_texture,
            view,
        });
        self.scene = None;
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    fn target_view(&self, target: PassTarget) -> Option<(wgpu::TextureView, wgpu::TextureFormat)> {
        match target {
            PassTarget::Backbuffer => self
                .frame
                .as_ref()
                .map(|f| (f.view.clone(), self.surface_format)),
            PassTarget::Surface(handle) => self
                .surface(handle)
                .map(|s| (s.view.clone(), s.texture.format())),
        }
    }

    fn surface(&self, handle: SurfaceHandle) -> Option<&GpuSurface> {
        self.surfaces.get(handle.0 as usize).and_then(Option::as_ref)
    }

    fn post_pipeline(
        &mut self,
        stage: ShaderStage,
        format: wgpu::TextureFormat,
    ) -> Option<wgpu::RenderPipeline> {
        if let Some(p) = self.post_pipelines.get(&(stage, format)) {
            return Some(p.clone());
        }
        let module = self
            .shaders
            .get(&self.device, POST_SHADER)
            .map_err(|e| log::error!("{} pipeline unavailable: {e}", stage.label()))
            .ok()?;
        let pipeline = create_post_pipeline(&self.device, &self.layouts, &module, stage, format);
        self.post_pipelines.insert((stage, format), pipeline.clone());
        Some(pipeline)
    }

    fn scene_pipelines(&mut self, format: wgpu::TextureFormat) -> Option<ScenePipelines> {
        if let Some(p) = self.scene_pipelines.get(&format) {
            return Some(p.clone());
        }
        let compile = |shaders: &mut ShaderLibrary, name| {
            shaders
                .get(&self.device, name)
                .map_err(|e| log::error!("Scene pipeline unavailable: {e}"))
                .ok()
        };
        let scene = compile(&mut self.shaders, SCENE_SHADER)?;
        let sky = compile(&mut self.shaders, SKY_SHADER)?;
        let pipelines = ScenePipelines {
            lit: create_lit_pipeline(&self.device, &self.layouts, &scene, format),
            sky: create_sky_pipeline(&self.device, &self.layouts, &sky, format),
        };
        self.scene_pipelines.insert(format, pipelines.clone());
        Some(pipelines)
    }

    /// Bind group for `sources`, padding unused slots with black.
    fn source_group(&mut self, sources: &[SurfaceHandle]) -> wgpu::BindGroup {
        if let Some(group) = self.source_groups.get(sources) {
            return group.clone();
        }
        let views: [&wgpu::TextureView; MAX_PASS_SOURCES] = std::array::from_fn(|slot| {
            sources
                .get(slot)
                .and_then(|h| self.surface(*h))
                .map_or(&self.black, |s| &s.view)
        });
        let mut entries: Vec<wgpu::BindGroupEntry<'_>> = views
            .iter()
            .enumerate()
            .map(|(slot, view)| wgpu::BindGroupEntry {
                binding: slot as u32,
                resource: wgpu::BindingResource::TextureView(view),
            })
            .collect();
        entries.push(wgpu::BindGroupEntry {
            binding: MAX_PASS_SOURCES as u32,
            resource: wgpu::BindingResource::Sampler(&self.post_sampler),
        });
        let group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("pass-sources"),
            layout: &self.layouts.sources,
            entries: &entries,
        });
        self.source_groups.insert(sources.to_vec(), group.clone());
        group
    }

    fn material_group(&mut self, texture: Option<TextureHandle>, sampler: SamplerKind) -> wgpu::BindGroup {
        if let Some(group) = self.material_groups.get(&(texture, sampler)) {
            return group.clone();
        }
        let view = match texture {
            Some(handle) => self.textures.view(handle, TextureKind::D2).unwrap_or_else(|| {
                log::warn!("Material texture {handle:?} is not a 2D texture");
                &self.white
            }),
            None => &self.white,
        };
        let group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("material"),
            layout: &self.layouts.material,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.samplers[&sampler]),
                },
            ],
        });
        self.material_groups.insert((texture, sampler), group.clone());
        group
    }

    fn cubemap_group(&mut self, cubemap: TextureHandle) -> Option<wgpu::BindGroup> {
        if let Some(group) = self.cubemap_groups.get(&cubemap) {
            return Some(group.clone());
        }
        let view = self.textures.view(cubemap, TextureKind::Cube)?;
        let group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("sky-cubemap"),
            layout: &self.layouts.cubemap,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.samplers[&SamplerKind::LinearClamp]),
                },
            ],
        });
        self.cubemap_groups.insert(cubemap, group.clone());
        Some(group)
    }

    fn push_uniform<T: bytemuck::Pod>(&mut self, value: &T) -> Option<u32> {
        let offset = self.ring.push(&self.queue, value);
        if offset.is_none() {
            log::warn!("Uniform ring full, draw skipped");
        }
        offset
    }

    /// Record the deferred scene draws as one render pass.
    fn flush_scene(&mut self) {
        let Some(scene) = self.scene.take() else {
            return;
        };
        if scene.draws.is_empty() {
            return;
        }
        let Some((target_view, format)) = self.target_view(PassTarget::Surface(scene.target)) else {
            log::warn!("Scene target {:?} released before flush", scene.target);
            return;
        };
        if self.surface(scene.target).map(|s| s.extent) != Some(self.depth.extent()) {
            log::warn!("Scene target size differs from the depth buffer, scene pass skipped");
            return;
        }
        let Some(pipelines) = self.scene_pipelines(format) else {
            return;
        };

        let Self {
            frame,
            meshes,
            uniform_groups,
            depth,
            ..
        } = self;
        let Some(frame) = frame.as_mut() else {
            return;
        };

        let mut pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("scene"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &target_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            ..Default::default()
        });

        for draw in &scene.draws {
            match draw {
                SceneDraw::Entity {
                    mesh,
                    object_offset,
                    material,
                } => {
                    let Some(mesh) = meshes.get(*mesh) else {
                        continue;
                    };
                    pass.set_pipeline(&pipelines.lit);
                    pass.set_bind_group(0, &uniform_groups.frame, &[scene.frame_offset]);
                    pass.set_bind_group(1, &uniform_groups.object, &[*object_offset]);
                    pass.set_bind_group(2, material, &[]);
                    mesh.bind_and_draw(&mut pass);
                }
                SceneDraw::Sky {
                    uniform_offset,
                    cubemap,
                } => {
                    pass.set_pipeline(&pipelines.sky);
                    pass.set_bind_group(0, &uniform_groups.sky, &[*uniform_offset]);
                    pass.set_bind_group(1, cubemap, &[]);
                    pass.draw(0..3, 0..1);
                }
            }
        }
    }

    /// A single pass that clears `view` and optionally draws a full-screen triangle.
    fn color_pass(&mut self, view: &wgpu::TextureView, clear: [f32; 4], draw: Option<FullscreenRecord>) {
        let Some(frame) = self.frame.as_mut() else {
            log::trace!("Draw outside a frame ignored");
            return;
        };
        let mut pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(draw.as_ref().map_or("clear", |d| d.label)),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(to_color(clear)),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            ..Default::default()
        });
        if let Some(d) = draw {
            pass.set_viewport(
                0.0,
                0.0,
                d.viewport.width as f32,
                d.viewport.height as f32,
                0.0,
                1.0,
            );
            pass.set_pipeline(&d.pipeline);
            pass.set_bind_group(0, &self.uniform_groups.pass_params, &[d.params_offset]);
            pass.set_bind_group(1, &d.sources, &[]);
            pass.draw(0..3, 0..1);
        }
    }
}

/// Everything a full-screen draw needs once the pass is open.
struct FullscreenRecord {
    label: &'static str,
    pipeline: wgpu::RenderPipeline,
    sources: wgpu::BindGroup,
    params_offset: u32,
    viewport: Extent,
}

impl PassBackend for GpuBackend {
    fn backbuffer_extent(&self) -> Extent {
        self.backbuffer
    }

    fn allocate_surface(
        &mut self,
        extent: Extent,
        format: PixelFormat,
    ) -> Result<SurfaceHandle, TargetError> {
        let max = self.device.limits().max_texture_dimension_2d;
        let refuse = |reason: String| TargetError::AllocationFailed {
            width: extent.width,
            height: extent.height,
            format,
            reason,
        };
        if extent.is_empty() {
            return Err(refuse("zero-sized surface".to_string()));
        }
        if extent.width > max || extent.height > max {
            return Err(refuse(format!("exceeds the device limit of {max}")));
        }

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("post-target"),
            size: wgpu::Extent3d {
                width: extent.width,
                height: extent.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: format.to_wgpu(),
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let handle = SurfaceHandle(self.surfaces.len() as u32);
        self.surfaces.push(Some(GpuSurface {
            texture,
            view,
            extent,
        }));
        Ok(handle)
    }

    fn release_surface(&mut self, surface: SurfaceHandle) {
        if let Some(slot) = self.surfaces.get_mut(surface.0 as usize) {
            if let Some(s) = slot.take() {
                s.texture.destroy();
            }
            self.source_groups.clear();
        }
    }

    fn surface_extent(&self, surface: SurfaceHandle) -> Option<Extent> {
        self.surface(surface).map(|s| s.extent)
    }

    fn clear_target(&mut self, target: PassTarget, color: [f32; 4]) {
        self.flush_scene();
        let Some((view, _)) = self.target_view(target) else {
            log::trace!("Clear of {target:?} skipped: no such target");
            return;
        };
        self.color_pass(&view, color, None);
    }

    fn draw_fullscreen(&mut self, draw: &FullscreenDraw<'_>) {
        self.flush_scene();
        let Some((view, format)) = self.target_view(draw.destination) else {
            log::trace!("{} skipped: no destination", draw.stage.label());
            return;
        };
        let Some(pipeline) = self.post_pipeline(draw.stage, format) else {
            return;
        };
        let sources = self.source_group(draw.sources);
        let Some(params_offset) = self.push_uniform::<PassParams>(draw.params) else {
            return;
        };
        let black = [0.0, 0.0, 0.0, 1.0];
        if draw.viewport.is_empty() {
            self.color_pass(&view, black, None);
            return;
        }
        self.color_pass(
            &view,
            black,
            Some(FullscreenRecord {
                label: draw.stage.label(),
                pipeline,
                sources,
                params_offset,
                viewport: draw.viewport,
            }),
        );
    }
}

impl FrameBackend for GpuBackend {
    fn clear_depth(&mut self) {
        self.flush_scene();
        let Some(frame) = self.frame.as_mut() else {
            return;
        };
        let _pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("clear-depth"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(DepthBuffer::CLEAR_VALUE),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            ..Default::default()
        });
    }

    fn bind_scene_target(&mut self, surface: SurfaceHandle, view: &SceneView<'_>) {
        self.flush_scene();
        if self.surface(surface).is_none() {
            log::warn!("Scene target {surface:?} is not a live surface");
            return;
        }
        let Some(frame_offset) = self.push_uniform(&FrameUniform::new(view)) else {
            return;
        };
        self.scene = Some(ScenePass {
            target: surface,
            view: view.view,
            projection: view.projection,
            frame_offset,
            draws: Vec::new(),
        });
    }

    fn draw_entity(&mut self, draw: &EntityDraw<'_>) {
        if self.scene.is_none() {
            log::trace!("Entity draw with no scene target bound");
            return;
        }
        let texture = draw.material.texture(DIFFUSE_SLOT);
        let sampler = draw.material.sampler(DIFFUSE_SLOT).unwrap_or_default();
        let material = self.material_group(texture, sampler);
        let uniform = ObjectUniform::new(draw.world, draw.world_inverse_transpose, draw.material);
        let Some(object_offset) = self.push_uniform(&uniform) else {
            return;
        };
        if let Some(scene) = self.scene.as_mut() {
            scene.draws.push(SceneDraw::Entity {
                mesh: draw.mesh,
                object_offset,
                material,
            });
        }
    }

    fn draw_sky(&mut self, sky: &Sky) {
        let Some((view, projection)) = self.scene.as_ref().map(|s| (s.view, s.projection)) else {
            log::trace!("Sky draw with no scene target bound");
            return;
        };
        let Some(cubemap) = self.cubemap_group(sky.cubemap) else {
            log::warn!("Sky texture {:?} is not a cubemap", sky.cubemap);
            return;
        };
        let Some(uniform_offset) = self.push_uniform(&SkyUniform::new(view, projection, sky)) else {
            return;
        };
        if let Some(scene) = self.scene.as_mut() {
            scene.draws.push(SceneDraw::Sky {
                uniform_offset,
                cubemap,
            });
        }
    }

    fn bind_backbuffer(&mut self) {
        self.flush_scene();
    }

    fn present(&mut self) {
        self.flush_scene();
        let Some(frame) = self.frame.take() else {
            log::warn!("present without an open frame");
            return;
        };
        self.queue.submit(std::iter::once(frame.encoder.finish()));
        frame.surface_texture.present();
    }
}

impl Layouts {
    fn new(device: &wgpu::Device) -> Self {
        let uniform = |label: &str, size: usize, visibility: wgpu::ShaderStages| {
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(label),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: NonZeroU64::new(size as u64),
                    },
                    count: None,
                }],
            })
        };
        let texture_entry = |binding: u32, view_dimension: wgpu::TextureViewDimension| {
            wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension,
                    multisampled: false,
                },
                count: None,
            }
        };
        let sampler_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        };
        let texture_and_sampler = |label: &str, view_dimension| {
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(label),
                entries: &[texture_entry(0, view_dimension), sampler_entry(1)],
            })
        };

        let mut source_entries: Vec<_> = (0..MAX_PASS_SOURCES as u32)
            .map(|slot| texture_entry(slot, wgpu::TextureViewDimension::D2))
            .collect();
        source_entries.push(sampler_entry(MAX_PASS_SOURCES as u32));

        let vertex_fragment = wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT;
        Self {
            pass_params: uniform(
                "pass-params-layout",
                size_of::<PassParams>(),
                wgpu::ShaderStages::FRAGMENT,
            ),
            sources: device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("pass-sources-layout"),
                entries: &source_entries,
            }),
            frame: uniform("frame-layout", size_of::<FrameUniform>(), vertex_fragment),
            object: uniform("object-layout", size_of::<ObjectUniform>(), vertex_fragment),
            material: texture_and_sampler("material-layout", wgpu::TextureViewDimension::D2),
            sky: uniform(
                "sky-layout",
                size_of::<SkyUniform>(),
                wgpu::ShaderStages::FRAGMENT,
            ),
            cubemap: texture_and_sampler("cubemap-layout", wgpu::TextureViewDimension::Cube),
        }
    }
}

impl UniformGroups {
    fn new(device: &wgpu::Device, layouts: &Layouts, ring: &UniformRing) -> Self {
        let group = |label: &str, layout: &wgpu::BindGroupLayout, size: usize| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: ring.buffer(),
                        offset: 0,
                        size: NonZeroU64::new(size as u64),
                    }),
                }],
            })
        };
        Self {
            pass_params: group("pass-params", &layouts.pass_params, size_of::<PassParams>()),
            frame: group("frame", &layouts.frame, size_of::<FrameUniform>()),
            object: group("object", &layouts.object, size_of::<ObjectUniform>()),
            sky: group("sky", &layouts.sky, size_of::<SkyUniform>()),
        }
    }
}

fn create_post_pipeline(
    device: &wgpu::Device,
    layouts: &Layouts,
    module: &wgpu::ShaderModule,
    stage: ShaderStage,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(stage.label()),
        bind_group_layouts: &[&layouts.pass_params, &layouts.sources],
        immediate_size: 0,
    });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(stage.label()),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some("vs_fullscreen"),
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some(stage.entry_point()),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview_mask: None,
        cache: None,
    })
}

fn create_lit_pipeline(
    device: &wgpu::Device,
    layouts: &Layouts,
    module: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("lit-layout"),
        bind_group_layouts: &[&layouts.frame, &layouts.object, &layouts.material],
        immediate_size: 0,
    });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("lit"),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some("vs_main"),
            buffers: &[vertex_layout()],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(wgpu::Face::Back),
            ..Default::default()
        },
        depth_stencil: Some(DepthBuffer::state(true)),
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview_mask: None,
        cache: None,
    })
}

fn create_sky_pipeline(
    device: &wgpu::Device,
    layouts: &Layouts,
    module: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("sky-layout"),
        bind_group_layouts: &[&layouts.sky, &layouts.cubemap],
        immediate_size: 0,
    });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("sky"),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some("vs_sky"),
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            ..Default::default()
        },
        depth_stencil: Some(DepthBuffer::state(false)),
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some("fs_sky"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview_mask: None,
        cache: None,
    })
}

fn create_sampler(device: &wgpu::Device, kind: SamplerKind) -> wgpu::Sampler {
    let (filter, mipmap_filter, address) = match kind {
        SamplerKind::LinearWrap => (
            wgpu::FilterMode::Linear,
            wgpu::MipmapFilterMode::Linear,
            wgpu::AddressMode::Repeat,
        ),
        SamplerKind::LinearClamp => (
            wgpu::FilterMode::Linear,
            wgpu::MipmapFilterMode::Linear,
            wgpu::AddressMode::ClampToEdge,
        ),
        SamplerKind::NearestWrap => (
            wgpu::FilterMode::Nearest,
            wgpu::MipmapFilterMode::Nearest,
            wgpu::AddressMode::Repeat,
        ),
    };
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("sampler"),
        address_mode_u: address,
        address_mode_v: address,
        address_mode_w: address,
        mag_filter: filter,
        min_filter: filter,
        mipmap_filter,
        ..Default::default()
    })
}

/// 1x1 texture of one color, bound where a source or material texture is missing.
fn solid_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    rgba: [u8; 4],
) -> wgpu::TextureView {
    let size = wgpu::Extent3d {
        width: 1,
        height: 1,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
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
        &rgba,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4),
            rows_per_image: None,
        },
        size,
    );
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn to_color(c: [f32; 4]) -> wgpu::Color {
    wgpu::Color {
        r: f64::from(c[0]),
        g: f64::from(c[1]),
        b: f64::from(c[2]),
        a: f64::from(c[3]),
    }
}
