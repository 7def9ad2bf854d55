//! Bloom and blur post-processing.
//!
//! A fixed pass graph over pool targets:
//!
//! 1. extract: scene color above the threshold into a half-resolution target
//! 2. per level `i`: horizontal then vertical 9-tap Gaussian at scale `0.5^(i+1)`,
//!    level 0 reading the extract and level `i` reading level `i-1`
//! 3. combine: scene plus every level's vertical output, weighted
//! 4. final blur of radius `blur_amount` onto the backbuffer
//!
//! Levels that do not run are cleared to black, so the combine can always read
//! all of them. The pipeline never clamps parameters; the controller does.

use crate::backend::{PassBackend, PassTarget, PixelFormat, SurfaceHandle};
use crate::fullscreen::{run_pass, PassParams, ShaderStage};
use crate::params::PostProcessParameters;
use crate::target::{TargetError, TargetId, TargetPool, MAX_BLOOM_LEVELS};

/// Resolution of the bright-pass target relative to the backbuffer.
pub const EXTRACT_SCALE: f32 = 0.5;

/// Most full-screen draws one frame can issue.
pub const MAX_PASSES_PER_FRAME: usize = 3 + 2 * MAX_BLOOM_LEVELS;

const BLACK: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// Resolution of bloom level `index` relative to the backbuffer.
pub fn level_scale(index: usize) -> f32 {
    0.5_f32.powi(index as i32 + 1)
}

/// One rung of the blur cascade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BloomLevel {
    pub index: usize,
    pub scale: f32,
}

impl BloomLevel {
    pub fn horizontal(&self) -> TargetId {
        TargetId::BlurHorizontal(self.index)
    }

    pub fn vertical(&self) -> TargetId {
        TargetId::BlurVertical(self.index)
    }
}

/// The bloom/blur pass graph.
#[derive(Debug, Clone)]
pub struct BloomPipeline {
    levels: [BloomLevel; MAX_BLOOM_LEVELS],
    format: PixelFormat,
}

impl BloomPipeline {
    /// `format` is used for every intermediate target.
    pub fn new(format: PixelFormat) -> Self {
        Self {
            levels: std::array::from_fn(|index| BloomLevel {
                index,
                scale: level_scale(index),
            }),
            format,
        }
    }

    pub fn levels(&self) -> &[BloomLevel; MAX_BLOOM_LEVELS] {
        &self.levels
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Size every target the pipeline uses, scene color included.
    ///
    /// All targets are attempted; the first failure is returned.
    pub fn configure_targets<B: PassBackend + ?Sized>(
        &self,
        pool: &mut TargetPool,
        backend: &mut B,
    ) -> Result<(), TargetError> {
        let mut wanted = vec![
            (TargetId::SceneColor, 1.0),
            (TargetId::BloomExtract, EXTRACT_SCALE),
            (TargetId::BloomCombine, 1.0),
        ];
        for level in &self.levels {
            wanted.push((level.horizontal(), level.scale));
            wanted.push((level.vertical(), level.scale));
        }

        let mut first_error = None;
        for (id, scale) in wanted {
            if let Err(e) = pool.resize(backend, id, scale, self.format) {
                log::warn!("Could not create {id:?}: {e}");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Run the pass graph for one frame. The backbuffer receives the final image.
    ///
    /// Extract, combine and the final blur run every frame, so turning bloom
    /// off or dropping to zero levels only removes the blur cascade. The
    /// combine always binds scene color plus all five level slots.
    ///
    /// # Arguments
    ///
    /// * `backend` - Receives the clears and full-screen draws, in issue order.
    /// * `pool` - Targets sized by [`configure_targets`](Self::configure_targets).
    /// * `params` - This frame's parameters, already clamped by the controller.
    ///
    /// Missing targets degrade the result instead of failing:
    /// - without scene color nothing runs;
    /// - without the extract or a level the cascade stops early, and the
    ///   combine reads missing level slots with zero weight;
    /// - without the combine target the final blur reads scene color directly.
    ///
    /// # Examples
    ///
    /// ```
    /// use lumen_render::{
    ///     BloomPipeline, Command, Extent, PassTarget, PixelFormat, PostProcessParameters,
    ///     SoftwareBackend, TargetPool,
    /// };
    ///
    /// let mut backend = SoftwareBackend::new(Extent::new(256, 256));
    /// let mut pool = TargetPool::new();
    /// let bloom = BloomPipeline::new(PixelFormat::Rgba16Float);
    /// bloom.configure_targets(&mut pool, &mut backend)?;
    ///
    /// backend.clear_commands();
    /// bloom.run(&mut backend, &pool, &PostProcessParameters::default());
    /// let last = backend.commands().last();
    /// assert!(matches!(
    ///     last,
    ///     Some(Command::Fullscreen { destination: PassTarget::Backbuffer, .. })
    /// ));
    /// # Ok::<(), lumen_render::TargetError>(())
    /// ```
    pub fn run<B: PassBackend + ?Sized>(
        &self,
        backend: &mut B,
        pool: &TargetPool,
        params: &PostProcessParameters,
    ) {
        let Some(scene) = pool.get(TargetId::SceneColor).copied() else {
            log::trace!("Post-process skipped: no scene color target");
            return;
        };

        let ran = match pool.surface(TargetId::BloomExtract) {
            Some(extract) => {
                run_pass(
                    backend,
                    ShaderStage::BloomExtract,
                    &[scene.surface],
                    &PassParams::extract(params.bloom_threshold),
                    PassTarget::Surface(extract),
                    EXTRACT_SCALE,
                );
                self.run_cascade(backend, pool, params, extract)
            }
            None => {
                log::trace!("Bloom skipped: no extract target");
                0
            }
        };
        for level in &self.levels[ran..] {
            for id in [level.horizontal(), level.vertical()] {
                if let Some(surface) = pool.surface(id) {
                    backend.clear_target(PassTarget::Surface(surface), BLACK);
                }
            }
        }

        let final_source = match pool.get(TargetId::BloomCombine) {
            Some(combine) => {
                let (sources, intensities) = self.combine_inputs(pool, params, scene.surface);
                run_pass(
                    backend,
                    ShaderStage::BloomCombine,
                    &sources,
                    &PassParams::combine(&intensities),
                    PassTarget::Surface(combine.surface),
                    1.0,
                );
                *combine
            }
            None => {
                log::trace!("Bloom combine target missing, blurring scene color");
                scene
            }
        };

        run_pass(
            backend,
            ShaderStage::FullscreenBlur,
            &[final_source.surface],
            &PassParams::fullscreen_blur(params.blur_amount, final_source.extent),
            PassTarget::Backbuffer,
            1.0,
        );
    }

    /// Scene color followed by one source per level. A level whose target is
    /// gone is bound to scene color with weight 0.
    fn combine_inputs(
        &self,
        pool: &TargetPool,
        params: &PostProcessParameters,
        scene: SurfaceHandle,
    ) -> ([SurfaceHandle; 1 + MAX_BLOOM_LEVELS], [f32; MAX_BLOOM_LEVELS]) {
        let mut sources = [scene; 1 + MAX_BLOOM_LEVELS];
        let mut intensities = params.level_intensities;
        for (level, (slot, weight)) in self
            .levels
            .iter()
            .zip(sources[1..].iter_mut().zip(intensities.iter_mut()))
        {
            match pool.surface(level.vertical()) {
                Some(surface) => *slot = surface,
                None => *weight = 0.0,
            }
        }
        (sources, intensities)
    }

    /// Blur the active levels, level 0 reading `extract`. Returns how many ran.
    fn run_cascade<B: PassBackend + ?Sized>(
        &self,
        backend: &mut B,
        pool: &TargetPool,
        params: &PostProcessParameters,
        extract: SurfaceHandle,
    ) -> usize {
        let wanted = params.effective_bloom_levels();
        let mut source = extract;
        for (ran, level) in self.levels[..wanted].iter().enumerate() {
            let (Some(h), Some(v)) = (pool.get(level.horizontal()), pool.get(level.vertical()))
            else {
                log::trace!("Bloom cascade stopped at level {}: target missing", level.index);
                return ran;
            };

            run_pass(
                backend,
                ShaderStage::GaussianBlur,
                &[source],
                &PassParams::gaussian([1.0, 0.0], h.extent),
                PassTarget::Surface(h.surface),
                level.scale,
            );
            run_pass(
                backend,
                ShaderStage::GaussianBlur,
                &[h.surface],
                &PassParams::gaussian([0.0, 1.0], v.extent),
                PassTarget::Surface(v.surface),
                level.scale,
            );
            source = v.surface;
        }
        wanted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Extent, PassBackend};
    use crate::software::{Command, SoftwareBackend};

    fn setup(size: Extent) -> (SoftwareBackend, TargetPool, BloomPipeline) {
        let mut backend = SoftwareBackend::new(size);
        let mut pool = TargetPool::new();
        let bloom = BloomPipeline::new(PixelFormat::Rgba16Float);
        bloom.configure_targets(&mut pool, &mut backend).unwrap();
        (backend, pool, bloom)
    }

    /// A dark scene with one bright 4x4 block in the middle.
    fn paint_scene(backend: &mut SoftwareBackend, pool: &TargetPool) {
        let scene = pool.surface(TargetId::SceneColor).unwrap();
        let extent = backend.surface_extent(scene).unwrap();
        backend.fill_surface(scene, |x, y| {
            let cx = extent.width / 2;
            let cy = extent.height / 2;
            if x.abs_diff(cx) < 2 && y.abs_diff(cy) < 2 {
                [4.0, 3.0, 2.0, 1.0]
            } else {
                [0.1, 0.2, 0.3, 1.0]
            }
        });
    }

    fn stages(backend: &SoftwareBackend) -> Vec<ShaderStage> {
        backend
            .commands()
            .iter()
            .filter_map(|c| match c {
                Command::Fullscreen { stage, .. } => Some(*stage),
                _ => None,
            })
            .collect()
    }

    fn combine_sources(backend: &SoftwareBackend) -> Vec<SurfaceHandle> {
        backend
            .commands()
            .iter()
            .find_map(|c| match c {
                Command::Fullscreen {
                    stage: ShaderStage::BloomCombine,
                    sources,
                    ..
                } => Some(sources.clone()),
                _ => None,
            })
            .unwrap()
    }

    fn run(
        backend: &mut SoftwareBackend,
        pool: &TargetPool,
        bloom: &BloomPipeline,
        params: &PostProcessParameters,
    ) -> Vec<[f32; 4]> {
        backend.clear_commands();
        bloom.run(backend, pool, params);
        backend.backbuffer_pixels().to_vec()
    }

    #[test]
    fn test_each_level_is_half_the_previous() {
        let bloom = BloomPipeline::new(PixelFormat::Rgba8Unorm);
        assert_eq!(bloom.levels()[0].scale, 0.5);
        for pair in bloom.levels().windows(2) {
            assert_eq!(pair[1].scale, pair[0].scale / 2.0);
        }
    }

    #[test]
    fn test_configured_target_sizes() {
        let (_, pool, _) = setup(Extent::new(640, 480));
        assert_eq!(pool.get(TargetId::SceneColor).unwrap().extent, Extent::new(640, 480));
        assert_eq!(pool.get(TargetId::BloomExtract).unwrap().extent, Extent::new(320, 240));
        assert_eq!(pool.get(TargetId::BlurVertical(4)).unwrap().extent, Extent::new(20, 15));
    }

    #[test]
    fn test_full_pass_sequence() {
        let (mut backend, pool, bloom) = setup(Extent::new(128, 64));
        run(&mut backend, &pool, &bloom, &PostProcessParameters::default());

        let stages = stages(&backend);
        let mut expected = vec![ShaderStage::BloomExtract];
        expected.extend([ShaderStage::GaussianBlur; 2 * MAX_BLOOM_LEVELS]);
        expected.extend([ShaderStage::BloomCombine, ShaderStage::FullscreenBlur]);
        assert_eq!(stages, expected);
        assert!(stages.len() <= MAX_PASSES_PER_FRAME);
    }

    #[test]
    fn test_level_viewports_follow_scale() {
        let (mut backend, pool, bloom) = setup(Extent::new(256, 128));
        run(&mut backend, &pool, &bloom, &PostProcessParameters::default());

        let blur_viewports: Vec<_> = backend
            .commands()
            .iter()
            .filter_map(|c| match c {
                Command::Fullscreen {
                    stage: ShaderStage::GaussianBlur,
                    viewport,
                    ..
                } => Some(*viewport),
                _ => None,
            })
            .collect();
        for (i, pair) in blur_viewports.chunks(2).enumerate() {
            let expected = Extent::new(256, 128).scaled(level_scale(i));
            assert_eq!(pair, [expected, expected]);
        }
    }

    #[test]
    fn test_unused_levels_are_cleared() {
        let (mut backend, pool, bloom) = setup(Extent::new(128, 64));
        let params = PostProcessParameters {
            active_bloom_levels: 2,
            ..Default::default()
        };
        run(&mut backend, &pool, &bloom, &params);

        let blurs = backend
            .commands()
            .iter()
            .filter(|c| matches!(c, Command::Fullscreen { stage: ShaderStage::GaussianBlur, .. }))
            .count();
        assert_eq!(blurs, 4);
        for i in 2..MAX_BLOOM_LEVELS {
            let v = pool.surface(TargetId::BlurVertical(i)).unwrap();
            assert!(backend.commands().contains(&Command::Clear {
                target: PassTarget::Surface(v),
                color: BLACK,
            }));
        }
    }

    #[test]
    fn test_no_levels_equals_scene_through_final_blur() {
        let (mut backend, pool, bloom) = setup(Extent::new(64, 32));
        paint_scene(&mut backend, &pool);
        let params = PostProcessParameters {
            active_bloom_levels: 0,
            blur_amount: 2,
            ..Default::default()
        };
        let with_pipeline = run(&mut backend, &pool, &bloom, &params);

        let scene = pool.surface(TargetId::SceneColor).unwrap();
        backend.clear_commands();
        run_pass(
            &mut backend,
            ShaderStage::FullscreenBlur,
            &[scene],
            &PassParams::fullscreen_blur(2, Extent::new(64, 32)),
            PassTarget::Backbuffer,
            1.0,
        );
        assert_eq!(with_pipeline, backend.backbuffer_pixels());
    }

    #[test]
    fn test_disabled_bloom_matches_zero_levels() {
        let (mut backend, pool, bloom) = setup(Extent::new(64, 32));
        paint_scene(&mut backend, &pool);

        let zero_levels = PostProcessParameters {
            active_bloom_levels: 0,
            ..Default::default()
        };
        let disabled = PostProcessParameters {
            bloom_enabled: false,
            ..Default::default()
        };
        let a = run(&mut backend, &pool, &bloom, &zero_levels);
        let b = run(&mut backend, &pool, &bloom, &disabled);
        assert_eq!(a, b);
    }

    #[test]
    fn test_bloom_brightens_around_hot_spot() {
        let (mut backend, pool, bloom) = setup(Extent::new(64, 32));
        paint_scene(&mut backend, &pool);
        let off = run(
            &mut backend,
            &pool,
            &bloom,
            &PostProcessParameters {
                bloom_enabled: false,
                ..Default::default()
            },
        );
        let on = run(&mut backend, &pool, &bloom, &PostProcessParameters::default());

        // A pixel a few texels away from the block picks up glow.
        let idx = 16 * 64 + 38;
        assert!(on[idx][0] > off[idx][0], "{:?} vs {:?}", on[idx], off[idx]);
    }

    #[test]
    fn test_identical_inputs_identical_output() {
        let (mut backend, pool, bloom) = setup(Extent::new(48, 40));
        paint_scene(&mut backend, &pool);
        let params = PostProcessParameters {
            blur_amount: 3,
            bloom_threshold: 0.5,
            ..Default::default()
        };
        let first = run(&mut backend, &pool, &bloom, &params);
        let second = run(&mut backend, &pool, &bloom, &params);
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_level_target_stops_cascade() {
        let (mut backend, mut pool, bloom) = setup(Extent::new(64, 64));
        // At 8x8 the two smallest levels round down to zero pixels.
        backend.set_backbuffer_extent(Extent::new(8, 8));
        assert!(pool.resize_all(&mut backend).is_err());
        assert!(pool.get(TargetId::BlurVertical(3)).is_none());

        run(&mut backend, &pool, &bloom, &PostProcessParameters::default());
        let blurs = backend
            .commands()
            .iter()
            .filter(|c| matches!(c, Command::Fullscreen { stage: ShaderStage::GaussianBlur, .. }))
            .count();
        assert_eq!(blurs, 2 * 3);
        assert!(backend.commands().iter().any(|c| matches!(
            c,
            Command::Fullscreen {
                stage: ShaderStage::FullscreenBlur,
                destination: PassTarget::Backbuffer,
                ..
            }
        )));
    }

    #[test]
    fn test_extract_and_combine_run_without_cascade() {
        let (mut backend, pool, bloom) = setup(Extent::new(64, 32));
        let zero_levels = PostProcessParameters {
            active_bloom_levels: 0,
            ..Default::default()
        };
        let disabled = PostProcessParameters {
            bloom_enabled: false,
            ..Default::default()
        };
        for params in [zero_levels, disabled] {
            run(&mut backend, &pool, &bloom, &params);
            assert_eq!(
                stages(&backend),
                [
                    ShaderStage::BloomExtract,
                    ShaderStage::BloomCombine,
                    ShaderStage::FullscreenBlur
                ]
            );
            for i in 0..MAX_BLOOM_LEVELS {
                let v = pool.surface(TargetId::BlurVertical(i)).unwrap();
                assert!(backend.commands().contains(&Command::Clear {
                    target: PassTarget::Surface(v),
                    color: BLACK,
                }));
            }
        }
    }

    #[test]
    fn test_combine_reads_every_level_slot() {
        let (mut backend, pool, bloom) = setup(Extent::new(64, 32));
        let params = PostProcessParameters {
            active_bloom_levels: 0,
            ..Default::default()
        };
        run(&mut backend, &pool, &bloom, &params);

        let sources = combine_sources(&backend);
        assert_eq!(sources.len(), 1 + MAX_BLOOM_LEVELS);
        assert_eq!(sources[0], pool.surface(TargetId::SceneColor).unwrap());
        for i in 0..MAX_BLOOM_LEVELS {
            assert_eq!(sources[i + 1], pool.surface(TargetId::BlurVertical(i)).unwrap());
        }
    }

    #[test]
    fn test_combine_keeps_five_slots_when_levels_are_missing() {
        let (mut backend, mut pool, bloom) = setup(Extent::new(64, 64));
        backend.set_backbuffer_extent(Extent::new(8, 8));
        assert!(pool.resize_all(&mut backend).is_err());

        run(&mut backend, &pool, &bloom, &PostProcessParameters::default());
        let sources = combine_sources(&backend);
        assert_eq!(sources.len(), 1 + MAX_BLOOM_LEVELS);

        let params = backend
            .commands()
            .iter()
            .find_map(|c| match c {
                Command::Fullscreen {
                    stage: ShaderStage::BloomCombine,
                    params,
                    ..
                } => Some(*params),
                _ => None,
            })
            .unwrap();
        assert_eq!(params.intensity(2), 1.0);
        assert_eq!(params.intensity(3), 0.0);
        assert_eq!(params.intensity(4), 0.0);
    }

    #[test]
    fn test_missing_scene_target_skips_everything() {
        let mut backend = SoftwareBackend::new(Extent::new(32, 32));
        let pool = TargetPool::new();
        let bloom = BloomPipeline::new(PixelFormat::Rgba8Unorm);
        bloom.run(&mut backend, &pool, &PostProcessParameters::default());
        assert!(backend.commands().is_empty());
    }
}
