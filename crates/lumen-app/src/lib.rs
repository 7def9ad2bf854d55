//! Lumen application framework.
//!
//! Provides window creation, event handling, and the per-frame loop that feeds
//! input into the post-process controller and drives the renderer.

pub mod bridge;
pub mod clock;
pub mod error;
pub mod reload;
pub mod window;

pub use error::AppError;
pub use reload::ConfigWatcher;
pub use window::{AppState, Renderer, SceneBuilder, run_with_config, window_attributes_from_config};
