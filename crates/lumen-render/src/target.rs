//! Render-target pool: every intermediate color buffer of the frame, sized
//! relative to the backbuffer.
//!
//! Each [`TargetId`] owns one slot remembering its scale and format, so a
//! backbuffer resize can recreate everything with [`TargetPool::resize_all`].
//! An empty slot means the last allocation failed; callers skip whatever
//! depends on it.

use thiserror::Error;

use crate::backend::{Extent, PassBackend, PixelFormat, SurfaceHandle};

/// Upper bound on bloom blur levels.
pub const MAX_BLOOM_LEVELS: usize = 5;

/// Identifies one intermediate target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetId {
    /// Scene render output, full resolution.
    SceneColor,
    BloomExtract,
    BloomCombine,
    /// Horizontal blur output of bloom level `i`.
    BlurHorizontal(usize),
    /// Vertical blur output of bloom level `i`.
    BlurVertical(usize),
}

impl TargetId {
    /// Number of distinct targets.
    pub const COUNT: usize = 3 + 2 * MAX_BLOOM_LEVELS;

    fn slot(self) -> usize {
        match self {
            Self::SceneColor => 0,
            Self::BloomExtract => 1,
            Self::BloomCombine => 2,
            Self::BlurHorizontal(i) => {
                assert!(i < MAX_BLOOM_LEVELS, "bloom level {i} out of range");
                3 + i
            }
            Self::BlurVertical(i) => {
                assert!(i < MAX_BLOOM_LEVELS, "bloom level {i} out of range");
                3 + MAX_BLOOM_LEVELS + i
            }
        }
    }

    fn from_slot(slot: usize) -> Self {
        match slot {
            0 => Self::SceneColor,
            1 => Self::BloomExtract,
            2 => Self::BloomCombine,
            s if s < 3 + MAX_BLOOM_LEVELS => Self::BlurHorizontal(s - 3),
            s => Self::BlurVertical(s - 3 - MAX_BLOOM_LEVELS),
        }
    }

    /// Every target, in slot order.
    pub fn all() -> impl Iterator<Item = TargetId> {
        (0..Self::COUNT).map(Self::from_slot)
    }
}

/// Allocation failures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TargetError {
    /// The scaled backbuffer size has a zero dimension.
    #[error("target {id:?} at scale {scale} of the backbuffer is {width}x{height}")]
    ZeroSize {
        id: TargetId,
        scale: f32,
        width: u32,
        height: u32,
    },

    /// The backend refused the allocation.
    #[error("could not allocate a {width}x{height} {format:?} surface: {reason}")]
    AllocationFailed {
        width: u32,
        height: u32,
        format: PixelFormat,
        reason: String,
    },

    /// A target was requested before it was ever configured.
    #[error("target {0:?} was never configured")]
    Unconfigured(TargetId),
}

/// A live intermediate color buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderTarget {
    pub surface: SurfaceHandle,
    pub extent: Extent,
    pub format: PixelFormat,
}

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    /// `Some((scale, format))` once configured.
    config: Option<(f32, PixelFormat)>,
    target: Option<RenderTarget>,
}

/// Owns every [`RenderTarget`]. The backend owns the surfaces behind them.
#[derive(Debug, Default)]
pub struct TargetPool {
    slots: [Slot; TargetId::COUNT],
}

impl TargetPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Release the current surface for `id` and allocate a new one of
    /// `floor(backbuffer * scale)` in `format`.
    ///
    /// The scale and format are remembered even on failure, so
    /// [`resize_all`](Self::resize_all) retries the slot after the next
    /// backbuffer change.
    ///
    /// # Arguments
    ///
    /// * `backend` - Owns the surfaces; the old one is released first.
    /// * `id` - Slot to (re)allocate.
    /// * `scale` - Fraction of the backbuffer size in each dimension.
    /// * `format` - Pixel format of the new surface.
    ///
    /// # Errors
    ///
    /// [`TargetError::ZeroSize`] when the scaled size rounds down to zero in
    /// either dimension, or the backend's allocation error. The slot stays
    /// empty until the next successful resize.
    ///
    /// # Examples
    ///
    /// ```
    /// use lumen_render::{Extent, PixelFormat, SoftwareBackend, TargetId, TargetPool};
    ///
    /// let mut backend = SoftwareBackend::new(Extent::new(256, 128));
    /// let mut pool = TargetPool::new();
    /// let extract = pool.resize(&mut backend, TargetId::BloomExtract, 0.5, PixelFormat::Rgba16Float)?;
    /// assert_eq!(extract.extent, Extent::new(128, 64));
    ///
    /// // Too small: the slot is left empty.
    /// assert!(pool.resize(&mut backend, TargetId::BlurVertical(4), 1.0 / 512.0, PixelFormat::Rgba16Float).is_err());
    /// assert!(pool.get(TargetId::BlurVertical(4)).is_none());
    /// # Ok::<(), lumen_render::TargetError>(())
    /// ```
    pub fn resize<B: PassBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        id: TargetId,
        scale: f32,
        format: PixelFormat,
    ) -> Result<RenderTarget, TargetError> {
        let slot = &mut self.slots[id.slot()];
        slot.config = Some((scale, format));
        if let Some(old) = slot.target.take() {
            backend.release_surface(old.surface);
        }

        let extent = backend.backbuffer_extent().scaled(scale);
        if extent.is_empty() {
            return Err(TargetError::ZeroSize {
                id,
                scale,
                width: extent.width,
                height: extent.height,
            });
        }

        let surface = backend.allocate_surface(extent, format)?;
        let target = RenderTarget {
            surface,
            extent,
            format,
        };
        slot.target = Some(target);
        log::debug!(
            "Target {id:?}: {}x{} {format:?}",
            extent.width,
            extent.height
        );
        Ok(target)
    }

    /// Re-run [`resize`](Self::resize) for every configured target with its
    /// remembered scale and format.
    ///
    /// Every target is attempted; the first failure is returned.
    pub fn resize_all<B: PassBackend + ?Sized>(
        &mut self,
        backend: &mut B,
    ) -> Result<(), TargetError> {
        let mut first_error = None;
        for id in TargetId::all() {
            let Some((scale, format)) = self.slots[id.slot()].config else {
                continue;
            };
            if let Err(e) = self.resize(backend, id, scale, format) {
                log::warn!("Resize of {id:?} failed: {e}");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// The live target for `id`, if its last allocation succeeded.
    pub fn get(&self, id: TargetId) -> Option<&RenderTarget> {
        self.slots[id.slot()].target.as_ref()
    }

    pub fn surface(&self, id: TargetId) -> Option<SurfaceHandle> {
        self.get(id).map(|t| t.surface)
    }

    /// Scale recorded for `id`.
    pub fn scale(&self, id: TargetId) -> Result<f32, TargetError> {
        self.slots[id.slot()]
            .config
            .map(|(scale, _)| scale)
            .ok_or(TargetError::Unconfigured(id))
    }

    /// All live targets.
    pub fn iter(&self) -> impl Iterator<Item = (TargetId, &RenderTarget)> {
        TargetId::all().filter_map(|id| self.get(id).map(|t| (id, t)))
    }

    /// Release every surface. Configuration is kept.
    pub fn release_all<B: PassBackend + ?Sized>(&mut self, backend: &mut B) {
        for slot in &mut self.slots {
            if let Some(target) = slot.target.take() {
                backend.release_surface(target.surface);
            }
        }
    }
}
