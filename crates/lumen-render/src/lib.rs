//! Frame rendering for the Lumen demo: the scene pass, the bloom cascade, and
//! the final blur to the backbuffer, running on wgpu or on a CPU reference backend.

pub mod backend;
pub mod bloom;
pub mod depth;
pub mod frame;
pub mod fullscreen;
pub mod gpu;
pub mod gpu_backend;
pub mod mesh_store;
pub mod params;
pub mod shader;
pub mod software;
pub mod target;
pub mod texture;
pub mod uniforms;

pub use backend::{
    EntityDraw, Extent, FrameBackend, FullscreenDraw, PassBackend, PassTarget, PixelFormat,
    SceneView, SurfaceHandle,
};
pub use bloom::{BloomLevel, BloomPipeline, EXTRACT_SCALE, MAX_PASSES_PER_FRAME, level_scale};
pub use depth::DepthBuffer;
pub use frame::FrameOrchestrator;
pub use fullscreen::{MAX_PASS_SOURCES, PassParams, ShaderStage, run_pass};
pub use gpu::{RenderContext, RenderContextError, SurfaceError, init_render_context_blocking};
pub use gpu_backend::GpuBackend;
pub use mesh_store::{GpuMesh, MeshStore};
pub use params::{
    MAX_BLUR_AMOUNT, ParameterController, PostProcessInput, PostProcessParameters,
};
pub use shader::{ShaderError, ShaderLibrary};
pub use software::{Command, SoftwareBackend};
pub use target::{MAX_BLOOM_LEVELS, RenderTarget, TargetError, TargetId, TargetPool};
pub use texture::{TextureError, TextureStore, gradient_cubemap};
