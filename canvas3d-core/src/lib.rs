/// Canvas3D Core Library - Scene object model and per-frame transform pipeline
///
/// This library holds everything an editor host needs apart from the window
/// system: scene objects and their registry, the transform pipeline, the
/// render loop and its backend trait, lighting, mesh/texture loading and
/// configuration.

pub mod config;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod lighting;
pub mod loader;
pub mod obj;
pub mod object;
pub mod primitives;
pub mod projection;
pub mod registry;
pub mod render;
pub mod resource;
pub mod stl;
pub mod transform;

// Re-export commonly used types
pub use config::{ConfigError, EditorConfig};
pub use editor::{SceneEditor, TextureSource};
pub use error::{LoadError, MeshError, SceneError};
pub use geometry::{Mesh, Position, Rgb, Triangle};
pub use lighting::{DirectionalLight, Lighting};
pub use object::{ModelData, Nudge, SceneObject, Shape, TransformInput};
pub use primitives::PrimitiveKind;
pub use projection::Camera;
pub use registry::SceneRegistry;
pub use render::{DrawCall, FrameStats, RenderBackend, RenderLoop, RenderState, Surface, TextureBinding};
pub use resource::{LoadTicket, ResourceState, TextureHandle, TextureImage};
pub use transform::{ObjectTransform, RotationState, Transform};
