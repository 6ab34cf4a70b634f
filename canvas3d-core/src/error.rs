/// Error types shared across the scene editor
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the scene model, the editor entry points and the render loop
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("object index {index} is out of range (scene has {len} objects)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("scale must be a positive finite number, got {0}")]
    InvalidScale(f32),

    #[error("{field} must be a finite number, got {value}")]
    NonFinite { field: &'static str, value: f32 },

    #[error("unsupported shape '{0}'")]
    UnsupportedShape(String),

    #[error("expected {expected} face colors, got {got}")]
    FaceCount { expected: usize, got: usize },

    #[error("no object is selected")]
    NoSelection,

    #[error(transparent)]
    ResourceLoad(#[from] LoadError),

    #[error("malformed draw call: {0}")]
    MalformedDrawCall(String),

    #[error("render backend failure: {0}")]
    Backend(String),
}

/// Errors raised while loading meshes and textures
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse mesh {path}: {source}")]
    Mesh {
        path: PathBuf,
        #[source]
        source: MeshError,
    },

    #[error("unsupported mesh format '{0}'")]
    UnsupportedFormat(String),

    #[error("failed to decode texture: {0}")]
    Image(#[from] image::ImageError),

    #[error("mesh contains no triangles")]
    EmptyMesh,

    #[error("texture upload failed: {0}")]
    Upload(String),
}

/// Errors raised by the OBJ and STL parsers
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MeshError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("line {line}: vertex reference {index} does not exist")]
    BadIndex { line: usize, index: i64 },

    #[error("line {line}: face has fewer than three vertices")]
    DegenerateFace { line: usize },

    #[error("file too small to be a valid STL")]
    TooSmall,

    #[error("unexpected end of STL data: expected {expected} bytes, found {actual}")]
    Truncated { expected: usize, actual: usize },
}
