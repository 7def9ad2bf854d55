//! Device bring-up and the window surface.

use std::sync::Arc;
use winit::window::Window;

use crate::backend::Extent;

/// Frames the presentation engine may queue ahead of the CPU.
const FRAME_LATENCY: u32 = 2;

#[derive(Debug, thiserror::Error)]
pub enum RenderContextError {
    #[error("no GPU adapter can present to this window")]
    NoAdapter,

    #[error("device request rejected: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    #[error("window surface could not be created: {0}")]
    SurfaceCreation(#[from] wgpu::CreateSurfaceError),

    #[error("surface advertises no texture formats")]
    NoSurfaceFormat,
}

/// Why no backbuffer was handed out this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SurfaceError {
    /// Still unusable after one reconfigure.
    #[error("surface lost")]
    Lost,

    #[error("surface out of memory")]
    OutOfMemory,

    /// Skip the frame and try again.
    #[error("surface acquire timed out")]
    Timeout,
}

/// The device, queue and configured surface for one window.
pub struct RenderContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub surface_format: wgpu::TextureFormat,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    // The adapter backs the device for its whole lifetime.
    _adapter: wgpu::Adapter,
}

impl RenderContext {
    pub async fn new(window: Arc<Window>, vsync: bool) -> Result<Self, RenderContextError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let initial = window.inner_size();
        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| RenderContextError::NoAdapter)?;
        let info = adapter.get_info();
        log::info!("Rendering on {} via {:?}", info.name, info.backend);

        // Render targets follow the window, so allow the largest 2D size the
        // adapter offers instead of the portable default.
        let limits = wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits());
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("lumen-device"),
                required_limits: limits,
                ..Default::default()
            })
            .await?;

        let caps = surface.get_capabilities(&adapter);
        let surface_format =
            pick_surface_format(&caps.formats).ok_or(RenderContextError::NoSurfaceFormat)?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: initial.width.max(1),
            height: initial.height.max(1),
            present_mode: present_mode(vsync),
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: Vec::new(),
            desired_maximum_frame_latency: FRAME_LATENCY,
        };
        surface.configure(&device, &config);
        log::info!(
            "Surface {}x{} {surface_format:?}, {:?}",
            config.width,
            config.height,
            config.present_mode
        );

        Ok(Self {
            device,
            queue,
            surface_format,
            surface,
            config,
            _adapter: adapter,
        })
    }

    /// Reconfigure for a new window size. A minimized window keeps a 1x1 surface.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.config.width = width.max(1);
        self.config.height = height.max(1);
        self.surface.configure(&self.device, &self.config);
    }

    pub fn extent(&self) -> Extent {
        Extent::new(self.config.width, self.config.height)
    }

    /// The next backbuffer. A lost or outdated surface is reconfigured and
    /// retried once before giving up on the frame.
    pub fn get_current_texture(&self) -> Result<wgpu::SurfaceTexture, SurfaceError> {
        match self.surface.get_current_texture() {
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("Surface stale, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                self.surface.get_current_texture().map_err(classify)
            }
            other => other.map_err(classify),
        }
    }
}

fn classify(error: wgpu::SurfaceError) -> SurfaceError {
    match error {
        wgpu::SurfaceError::Timeout => SurfaceError::Timeout,
        wgpu::SurfaceError::OutOfMemory => SurfaceError::OutOfMemory,
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Other => {
            SurfaceError::Lost
        }
    }
}

/// Blocks on [`RenderContext::new`] with `pollster`.
pub fn init_render_context_blocking(
    window: Arc<Window>,
    vsync: bool,
) -> Result<RenderContext, RenderContextError> {
    pollster::block_on(RenderContext::new(window, vsync))
}

/// The final blur writes linear color, so an sRGB backbuffer does the encode.
fn pick_surface_format(formats: &[wgpu::TextureFormat]) -> Option<wgpu::TextureFormat> {
    formats
        .iter()
        .copied()
        .find(wgpu::TextureFormat::is_srgb)
        .or_else(|| formats.first().copied())
}

fn present_mode(vsync: bool) -> wgpu::PresentMode {
    if vsync {
        wgpu::PresentMode::AutoVsync
    } else {
        wgpu::PresentMode::AutoNoVsync
    }
}

/// A headless device for tests. `None` when the machine has no adapter.
#[cfg(test)]
pub(crate) fn create_test_device_queue() -> Option<(wgpu::Device, wgpu::Queue)> {
    pollster::block_on(async {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions::default())
            .await
            .ok()?;
        adapter
            .request_device(&wgpu::DeviceDescriptor::default())
            .await
            .ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::TextureFormat;

    #[test]
    fn test_srgb_format_wins_over_earlier_linear() {
        let formats = [
            TextureFormat::Bgra8Unorm,
            TextureFormat::Rgba8UnormSrgb,
            TextureFormat::Bgra8UnormSrgb,
        ];
        assert_eq!(pick_surface_format(&formats), Some(TextureFormat::Rgba8UnormSrgb));
    }

    #[test]
    fn test_linear_only_surface_uses_first_format() {
        let formats = [TextureFormat::Rgba16Float, TextureFormat::Bgra8Unorm];
        assert_eq!(pick_surface_format(&formats), Some(TextureFormat::Rgba16Float));
        assert_eq!(pick_surface_format(&[]), None);
    }

    #[test]
    fn test_present_mode_follows_vsync() {
        assert_eq!(present_mode(true), wgpu::PresentMode::AutoVsync);
        assert_eq!(present_mode(false), wgpu::PresentMode::AutoNoVsync);
    }

    #[test]
    fn test_stale_surface_errors_count_as_lost() {
        assert_eq!(classify(wgpu::SurfaceError::Outdated), SurfaceError::Lost);
        assert_eq!(classify(wgpu::SurfaceError::Other), SurfaceError::Lost);
        assert_eq!(classify(wgpu::SurfaceError::Timeout), SurfaceError::Timeout);
        assert_eq!(
            classify(wgpu::SurfaceError::OutOfMemory),
            SurfaceError::OutOfMemory
        );
    }
}
