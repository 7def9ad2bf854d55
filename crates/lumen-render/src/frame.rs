//! Per-frame sequencing: scene into the off-screen target, post-process, present.

use lumen_scene::Scene;

use crate::backend::{EntityDraw, FrameBackend, PassTarget, PixelFormat, SceneView};
use crate::bloom::BloomPipeline;
use crate::params::PostProcessParameters;
use crate::target::{TargetError, TargetId, TargetPool};

/// Owns the target pool and bloom pipeline and drives a backend through one frame.
#[derive(Debug)]
pub struct FrameOrchestrator {
    pool: TargetPool,
    bloom: BloomPipeline,
    clear_color: [f32; 4],
}

impl FrameOrchestrator {
    /// Allocate every target. Any failure here is fatal for the caller.
    ///
    /// # Arguments
    ///
    /// * `backend` - Backend whose backbuffer size the targets follow.
    /// * `format` - Pixel format of every intermediate target.
    /// * `clear_color` - Backbuffer and scene color clear, see
    ///   [`set_clear_color`](Self::set_clear_color).
    ///
    /// # Errors
    ///
    /// The first [`TargetError`] from sizing the targets, typically a
    /// backbuffer too small for the smallest bloom level. Targets allocated
    /// before the failure are released again.
    ///
    /// # Examples
    ///
    /// ```
    /// use lumen_render::{Extent, FrameOrchestrator, PixelFormat, SoftwareBackend, TargetId};
    ///
    /// let mut backend = SoftwareBackend::new(Extent::new(640, 360));
    /// let frame = FrameOrchestrator::init(&mut backend, PixelFormat::Rgba8Unorm, [0.0, 0.0, 0.0, 1.0])?;
    /// assert!(frame.pool().get(TargetId::SceneColor).is_some());
    ///
    /// let mut tiny = SoftwareBackend::new(Extent::new(8, 8));
    /// assert!(FrameOrchestrator::init(&mut tiny, PixelFormat::Rgba8Unorm, [0.0; 4]).is_err());
    /// assert_eq!(tiny.live_surface_count(), 0);
    /// # Ok::<(), lumen_render::TargetError>(())
    /// ```
    pub fn init<B: FrameBackend + ?Sized>(
        backend: &mut B,
        format: PixelFormat,
        clear_color: [f32; 4],
    ) -> Result<Self, TargetError> {
        let mut pool = TargetPool::new();
        let bloom = BloomPipeline::new(format);
        if let Err(e) = bloom.configure_targets(&mut pool, backend) {
            pool.release_all(backend);
            return Err(e);
        }
        let size = backend.backbuffer_extent();
        log::info!(
            "Post-process targets ready at {}x{} ({format:?})",
            size.width,
            size.height
        );
        Ok(Self {
            pool,
            bloom,
            clear_color,
        })
    }

    /// Recreate every target after the backbuffer changed size.
    ///
    /// A failure leaves some targets empty; frames keep rendering with the
    /// dependent passes skipped until a later resize succeeds.
    pub fn resize<B: FrameBackend + ?Sized>(&mut self, backend: &mut B) -> Result<(), TargetError> {
        let size = backend.backbuffer_extent();
        let result = self.pool.resize_all(backend);
        match &result {
            Ok(()) => log::info!("Post-process targets resized to {}x{}", size.width, size.height),
            Err(e) => log::warn!(
                "Post-process degraded at {}x{}: {e}",
                size.width,
                size.height
            ),
        }
        result
    }

    pub fn pool(&self) -> &TargetPool {
        &self.pool
    }

    pub fn bloom(&self) -> &BloomPipeline {
        &self.bloom
    }

    /// Color used from the next frame on for the backbuffer and scene color clears.
    pub fn set_clear_color(&mut self, color: [f32; 4]) {
        self.clear_color = color;
    }

    /// Render and present one frame.
    ///
    /// Order: clear backbuffer and depth, clear intermediate targets, scene
    /// into the scene color target (entities, then sky), bloom/blur, rebind
    /// the backbuffer, present.
    pub fn render_frame<B: FrameBackend + ?Sized>(
        &self,
        backend: &mut B,
        scene: &Scene,
        params: &PostProcessParameters,
        total_time: f32,
    ) {
        backend.clear_target(PassTarget::Backbuffer, self.clear_color);
        backend.clear_depth();

        for (id, target) in self.pool.iter() {
            let color = if id == TargetId::SceneColor {
                self.clear_color
            } else {
                [0.0, 0.0, 0.0, 1.0]
            };
            backend.clear_target(PassTarget::Surface(target.surface), color);
        }

        match self.pool.surface(TargetId::SceneColor) {
            Some(scene_target) => {
                let view = SceneView {
                    view: scene.camera.view_matrix(),
                    projection: scene.camera.projection_matrix(),
                    camera_position: scene.camera.position(),
                    ambient: scene.ambient,
                    lights: &scene.lights,
                    total_time,
                };
                backend.bind_scene_target(scene_target, &view);

                scene.for_each_entity(|entity, material| {
                    backend.draw_entity(&EntityDraw {
                        mesh: entity.mesh,
                        material,
                        world: entity.transform.world_matrix(),
                        world_inverse_transpose: entity.transform.world_inverse_transpose(),
                    });
                });
                if let Some(sky) = &scene.sky {
                    backend.draw_sky(sky);
                }
            }
            None => log::trace!("Scene pass skipped: no scene color target"),
        }

        self.bloom.run(backend, &self.pool, params);

        backend.bind_backbuffer();
        backend.present();
    }
}
