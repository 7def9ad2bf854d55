//! Full-screen pass executor.
//!
//! Every post-process step is one 3-vertex draw with no vertex or index
//! buffers: the vertex stage derives a screen-covering triangle from the
//! vertex index. A pass reads up to [`MAX_PASS_SOURCES`] surfaces and fully
//! overwrites its destination.

use bytemuck::{Pod, Zeroable};
use static_assertions::assert_eq_size;

use crate::backend::{Extent, FullscreenDraw, PassBackend, PassTarget, SurfaceHandle};

/// Texture slots available to a full-screen stage.
pub const MAX_PASS_SOURCES: usize = 6;

/// 9-tap Gaussian weights, centre tap first.
pub const GAUSSIAN_WEIGHTS: [f32; 5] = [
    0.227_027_03,
    0.194_594_6,
    0.121_621_62,
    0.054_054_055,
    0.016_216_216,
];

/// Rec. 709 luma coefficients used by the bright-pass.
pub const LUMINANCE: [f32; 3] = [0.2126, 0.7152, 0.0722];

/// The full-screen fragment programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Keep pixels brighter than the threshold, black out the rest.
    BloomExtract,
    /// One direction of a separable 9-tap Gaussian.
    GaussianBlur,
    /// Scene plus intensity-weighted bloom levels.
    BloomCombine,
    /// Box blur of radius `blur_amount`; radius 0 copies.
    FullscreenBlur,
}

impl ShaderStage {
    pub const ALL: [ShaderStage; 4] = [
        Self::BloomExtract,
        Self::GaussianBlur,
        Self::BloomCombine,
        Self::FullscreenBlur,
    ];

    /// WGSL fragment entry point.
    pub fn entry_point(self) -> &'static str {
        match self {
            Self::BloomExtract => "fs_bloom_extract",
            Self::GaussianBlur => "fs_gaussian_blur",
            Self::BloomCombine => "fs_bloom_combine",
            Self::FullscreenBlur => "fs_fullscreen_blur",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::BloomExtract => "bloom-extract",
            Self::GaussianBlur => "gaussian-blur",
            Self::BloomCombine => "bloom-combine",
            Self::FullscreenBlur => "fullscreen-blur",
        }
    }
}

/// Uniform block shared by every full-screen stage. Stages read the fields they need.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PassParams {
    /// Blur axis, `(1, 0)` or `(0, 1)`.
    pub direction: [f32; 2],
    /// One texel in UV units.
    pub pixel_size: [f32; 2],
    pub threshold: f32,
    /// Box blur radius in texels. Always a whole number.
    pub blur_amount: f32,
    pub _pad: [f32; 2],
    /// Bloom level weights, packed four per vector.
    pub intensities: [[f32; 4]; 2],
}

assert_eq_size!(PassParams, [u8; 64]);

impl PassParams {
    pub fn extract(threshold: f32) -> Self {
        Self {
            threshold,
            ..Self::default()
        }
    }

    pub fn gaussian(direction: [f32; 2], target: Extent) -> Self {
        Self {
            direction,
            pixel_size: texel_size(target),
            ..Self::default()
        }
    }

    pub fn combine(intensities: &[f32; crate::MAX_BLOOM_LEVELS]) -> Self {
        let mut packed = [[0.0; 4]; 2];
        for (i, w) in intensities.iter().enumerate() {
            packed[i / 4][i % 4] = *w;
        }
        Self {
            intensities: packed,
            ..Self::default()
        }
    }

    pub fn fullscreen_blur(blur_amount: u32, source: Extent) -> Self {
        Self {
            blur_amount: blur_amount as f32,
            pixel_size: texel_size(source),
            ..Self::default()
        }
    }

    /// Weight of bloom level `i`.
    pub fn intensity(&self, i: usize) -> f32 {
        self.intensities[i / 4][i % 4]
    }
}

fn texel_size(extent: Extent) -> [f32; 2] {
    [
        1.0 / extent.width.max(1) as f32,
        1.0 / extent.height.max(1) as f32,
    ]
}

/// Draw `stage` over `destination`, reading `sources`.
///
/// The viewport is `floor(backbuffer * viewport_scale)`, clamped to the
/// destination's own size.
///
/// # Panics
///
/// If `destination` is one of `sources`, or more than [`MAX_PASS_SOURCES`]
/// sources are given.
pub fn run_pass<B: PassBackend + ?Sized>(
    backend: &mut B,
    stage: ShaderStage,
    sources: &[SurfaceHandle],
    params: &PassParams,
    destination: PassTarget,
    viewport_scale: f32,
) {
    if let PassTarget::Surface(dest) = destination {
        assert!(
            !sources.contains(&dest),
            "{} pass reads from its own destination {dest:?}",
            stage.label()
        );
    }
    assert!(
        sources.len() <= MAX_PASS_SOURCES,
        "{} pass given {} sources",
        stage.label(),
        sources.len()
    );

    let dest_extent = match destination {
        PassTarget::Backbuffer => backend.backbuffer_extent(),
        PassTarget::Surface(handle) => match backend.surface_extent(handle) {
            Some(extent) => extent,
            None => {
                log::error!("{} pass skipped: destination {handle:?} is gone", stage.label());
                return;
            }
        },
    };
    let viewport = backend
        .backbuffer_extent()
        .scaled(viewport_scale)
        .min(dest_extent);

    backend.draw_fullscreen(&FullscreenDraw {
        stage,
        sources,
        params,
        destination,
        viewport,
    });
}
