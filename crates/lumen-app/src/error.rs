use lumen_render::{RenderContextError, SurfaceError, TargetError, TextureError};
use thiserror::Error;

/// Failures that end the application.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("window creation failed: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("GPU initialization failed: {0}")]
    RenderContext(#[from] RenderContextError),

    #[error("post-process targets could not be created: {0}")]
    Targets(#[from] TargetError),

    #[error("scene texture upload failed: {0}")]
    Texture(#[from] TextureError),

    #[error("surface failure: {0}")]
    Surface(#[from] SurfaceError),
}
