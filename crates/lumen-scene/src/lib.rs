//! Scene containers for the Lumen demo.
//!
//! Everything here is plain CPU data. GPU resources are referenced through
//! copyable index handles ([`MeshHandle`], [`MaterialHandle`], [`TextureHandle`])
//! that the render backend resolves against its own arenas.

pub mod camera;
pub mod handle;
pub mod light;
pub mod material;
pub mod mesh;
pub mod scene;
pub mod transform;

pub use camera::{Camera, CameraInput};
pub use handle::{MaterialHandle, MeshHandle, TextureHandle};
pub use light::{Light, LightKind, MAX_LIGHTS};
pub use material::{Material, SamplerKind};
pub use mesh::{MeshData, Vertex};
pub use scene::{Entity, Scene, Sky};
pub use transform::Transform;
