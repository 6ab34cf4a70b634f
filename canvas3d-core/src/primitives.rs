/// Built-in primitive shapes: shared vertex tables and face colors
use std::fmt;
use std::str::FromStr;

use crate::error::SceneError;
use crate::geometry::{Position, Rgb};

pub const YELLOW: Rgb = [1.0, 1.0, 0.0];
pub const GREEN: Rgb = [0.0, 1.0, 0.0];
pub const BLUE: Rgb = [0.0, 0.0, 1.0];
pub const MAGENTA: Rgb = [1.0, 0.0, 1.0];
pub const CYAN: Rgb = [0.0, 1.0, 1.0];
pub const RED: Rgb = [1.0, 0.0, 0.0];

/// Cube with unit edge, centered on the origin. Two triangles per face.
pub static CUBE_POSITIONS: [Position; 36] = [
    // Front
    [0.5, 0.5, 0.5], [0.5, -0.5, 0.5], [-0.5, 0.5, 0.5],
    [-0.5, 0.5, 0.5], [0.5, -0.5, 0.5], [-0.5, -0.5, 0.5],
    // Left
    [-0.5, 0.5, 0.5], [-0.5, -0.5, 0.5], [-0.5, 0.5, -0.5],
    [-0.5, 0.5, -0.5], [-0.5, -0.5, 0.5], [-0.5, -0.5, -0.5],
    // Back
    [-0.5, 0.5, -0.5], [-0.5, -0.5, -0.5], [0.5, 0.5, -0.5],
    [0.5, 0.5, -0.5], [-0.5, -0.5, -0.5], [0.5, -0.5, -0.5],
    // Right
    [0.5, 0.5, -0.5], [0.5, -0.5, -0.5], [0.5, 0.5, 0.5],
    [0.5, 0.5, 0.5], [0.5, -0.5, 0.5], [0.5, -0.5, -0.5],
    // Top
    [0.5, 0.5, 0.5], [0.5, 0.5, -0.5], [-0.5, 0.5, 0.5],
    [-0.5, 0.5, 0.5], [0.5, 0.5, -0.5], [-0.5, 0.5, -0.5],
    // Bottom
    [0.5, -0.5, 0.5], [0.5, -0.5, -0.5], [-0.5, -0.5, 0.5],
    [-0.5, -0.5, 0.5], [0.5, -0.5, -0.5], [-0.5, -0.5, -0.5],
];

/// Square-based pyramid with its apex on +Y. The base is left open.
pub static PYRAMID_POSITIONS: [Position; 12] = [
    // Front face
    [0.0, 1.0, 0.0], [-1.0, -1.0, 1.0], [1.0, -1.0, 1.0],
    // Right face
    [0.0, 1.0, 0.0], [1.0, -1.0, 1.0], [1.0, -1.0, -1.0],
    // Back face
    [0.0, 1.0, 0.0], [1.0, -1.0, -1.0], [-1.0, -1.0, -1.0],
    // Left face
    [0.0, 1.0, 0.0], [-1.0, -1.0, -1.0], [-1.0, -1.0, 1.0],
];

/// The closed set of built-in shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Cube,
    Pyramid,
}

impl PrimitiveKind {
    pub fn positions(self) -> &'static [Position] {
        match self {
            PrimitiveKind::Cube => &CUBE_POSITIONS,
            PrimitiveKind::Pyramid => &PYRAMID_POSITIONS,
        }
    }

    pub fn face_count(self) -> usize {
        match self {
            PrimitiveKind::Cube => 6,
            PrimitiveKind::Pyramid => 4,
        }
    }

    pub fn vertices_per_face(self) -> usize {
        self.positions().len() / self.face_count()
    }

    pub fn default_face_colors(self) -> Vec<Rgb> {
        match self {
            PrimitiveKind::Cube => vec![YELLOW, GREEN, BLUE, MAGENTA, CYAN, RED],
            PrimitiveKind::Pyramid => vec![YELLOW, GREEN, BLUE, MAGENTA],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Cube => "cube",
            PrimitiveKind::Pyramid => "pyramid",
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PrimitiveKind {
    type Err = SceneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cube" => Ok(PrimitiveKind::Cube),
            "pyramid" => Ok(PrimitiveKind::Pyramid),
            _ => Err(SceneError::UnsupportedShape(s.to_string())),
        }
    }
}

/// Expand one color per face into one color per vertex of that face
pub fn expand_face_colors(face_colors: &[Rgb], vertices_per_face: usize) -> Vec<Rgb> {
    face_colors
        .iter()
        .flat_map(|color| std::iter::repeat(*color).take(vertices_per_face))
        .collect()
}
