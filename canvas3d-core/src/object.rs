/// Scene objects: shape variants, surfaces and user-facing transform input
use nalgebra::Vector3;

use crate::error::SceneError;
use crate::geometry::{Mesh, Position, Rgb};
use crate::primitives::{expand_face_colors, PrimitiveKind};
use crate::resource::{LoadTicket, ResourceState, TextureHandle};
use crate::transform::{validate_scale, ObjectTransform, RotationState};

/// Face colors of a primitive and their per-vertex expansion
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveSurface {
    face_colors: Vec<Rgb>,
    vertex_colors: Vec<Rgb>,
}

impl PrimitiveSurface {
    pub fn new(kind: PrimitiveKind, face_colors: Vec<Rgb>) -> Result<Self, SceneError> {
        if face_colors.len() != kind.face_count() {
            return Err(SceneError::FaceCount {
                expected: kind.face_count(),
                got: face_colors.len(),
            });
        }
        let vertex_colors = expand_face_colors(&face_colors, kind.vertices_per_face());
        Ok(Self {
            face_colors,
            vertex_colors,
        })
    }

    pub fn face_colors(&self) -> &[Rgb] {
        &self.face_colors
    }

    pub fn vertex_colors(&self) -> &[Rgb] {
        &self.vertex_colors
    }
}

/// An externally loaded mesh and its texture
#[derive(Debug, Clone)]
pub struct ModelData {
    pub name: String,
    pub mesh: Mesh,
    pub texture: ResourceState<TextureHandle>,
    ticket: Option<LoadTicket>,
    /// Used instead of a texture when the mesh has no texture coordinates
    fallback_colors: Vec<Rgb>,
}

impl ModelData {
    pub fn new(name: impl Into<String>, mesh: Mesh, model_color: Rgb) -> Self {
        let fallback_colors = if mesh.has_texcoords() {
            Vec::new()
        } else {
            vec![model_color; mesh.vertex_count()]
        };
        Self {
            name: name.into(),
            mesh,
            texture: ResourceState::Failed("no texture requested".to_string()),
            ticket: None,
            fallback_colors,
        }
    }

    /// Mark the texture as loading under `ticket`
    pub fn await_texture(&mut self, ticket: LoadTicket) {
        self.texture = ResourceState::Loading;
        self.ticket = Some(ticket);
    }

    pub fn ticket(&self) -> Option<LoadTicket> {
        self.ticket
    }

    pub fn fallback_colors(&self) -> &[Rgb] {
        &self.fallback_colors
    }

    /// True when the model could not get all of its resources
    pub fn is_incomplete(&self) -> bool {
        self.mesh.has_texcoords() && self.texture.is_failed()
    }
}

/// Closed set of shapes an object can take
#[derive(Debug, Clone)]
pub enum Shape {
    Cube(PrimitiveSurface),
    Pyramid(PrimitiveSurface),
    Model(ModelData),
}

impl Shape {
    pub fn primitive(kind: PrimitiveKind, face_colors: Vec<Rgb>) -> Result<Self, SceneError> {
        let surface = PrimitiveSurface::new(kind, face_colors)?;
        Ok(match kind {
            PrimitiveKind::Cube => Shape::Cube(surface),
            PrimitiveKind::Pyramid => Shape::Pyramid(surface),
        })
    }

    pub fn name(&self) -> &str {
        match self {
            Shape::Cube(_) => PrimitiveKind::Cube.name(),
            Shape::Pyramid(_) => PrimitiveKind::Pyramid.name(),
            Shape::Model(model) => &model.name,
        }
    }

    pub fn positions(&self) -> &[Position] {
        match self {
            Shape::Cube(_) => PrimitiveKind::Cube.positions(),
            Shape::Pyramid(_) => PrimitiveKind::Pyramid.positions(),
            Shape::Model(model) => &model.mesh.positions,
        }
    }
}

/// One entry of the scene registry
#[derive(Debug, Clone)]
pub struct SceneObject {
    pub shape: Shape,
    pub transform: ObjectTransform,
}

impl SceneObject {
    pub fn new(shape: Shape, transform: ObjectTransform) -> Self {
        Self { shape, transform }
    }

    /// Label shown in object selectors, e.g. `cube #2`
    pub fn label(&self, index: usize) -> String {
        let mut label = format!("{} #{}", self.shape.name(), index);
        if self.is_incomplete() {
            label.push_str(" (incomplete)");
        }
        label
    }

    pub fn is_incomplete(&self) -> bool {
        match &self.shape {
            Shape::Model(model) => model.is_incomplete(),
            Shape::Cube(_) | Shape::Pyramid(_) => false,
        }
    }

    pub fn texture_ticket(&self) -> Option<LoadTicket> {
        match &self.shape {
            Shape::Model(model) => model.ticket(),
            Shape::Cube(_) | Shape::Pyramid(_) => None,
        }
    }

    /// Apply user input atomically: nothing changes if any field is invalid
    pub fn apply(&mut self, input: &TransformInput) -> Result<(), SceneError> {
        let scale = input.scale.map(validate_scale).transpose()?;
        for value in input.rotation_velocity.iter().flatten() {
            finite("rotation velocity", *value)?;
        }
        for value in input.translation.iter().flatten() {
            finite("translation", *value)?;
        }

        if let Some(scale) = scale {
            self.transform.set_scale(scale)?;
        }
        let velocity = &mut self.transform.rotation_velocity;
        for (axis, value) in [&mut velocity.x, &mut velocity.y, &mut velocity.z]
            .into_iter()
            .zip(input.rotation_velocity)
        {
            if let Some(value) = value {
                *axis = value;
            }
        }
        for (axis, value) in self.transform.translation.iter_mut().zip(input.translation) {
            if let Some(value) = value {
                *axis = value;
            }
        }
        Ok(())
    }

    /// Add keyboard / mouse-wheel deltas, rejecting a non-positive result scale
    /// or any non-finite component
    pub fn nudge(&mut self, nudge: &Nudge) -> Result<(), SceneError> {
        let scale = validate_scale(self.transform.scale() + nudge.scale)?;
        let translation = self.transform.translation + nudge.translation;
        let mut velocity = self.transform.rotation_velocity;
        velocity.advance(&nudge.rotation_velocity);
        for value in translation.iter() {
            finite("translation", *value)?;
        }
        for value in velocity.as_array() {
            finite("rotation velocity", value)?;
        }

        self.transform.set_scale(scale)?;
        self.transform.translation = translation;
        self.transform.rotation_velocity = velocity;
        Ok(())
    }
}

fn finite(field: &'static str, value: f32) -> Result<f32, SceneError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SceneError::NonFinite { field, value })
    }
}

/// Values from the "apply transformation" form, in scene units.
///
/// `None` leaves the corresponding component unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransformInput {
    pub scale: Option<f32>,
    /// Radians per frame
    pub rotation_velocity: [Option<f32>; 3],
    pub translation: [Option<f32>; 3],
}

impl TransformInput {
    pub const SCALE_PERCENT: f32 = 100.0;
    pub const TRANSLATION_DIVISOR: f32 = 100.0;

    /// Convert form units: scale in percent, rotation in degrees per frame and
    /// translation in hundredths of a scene unit.
    pub fn from_form(
        scale_percent: Option<f32>,
        rotation_degrees: [Option<f32>; 3],
        translation_hundredths: [Option<f32>; 3],
    ) -> Self {
        Self {
            scale: scale_percent.map(|s| s / Self::SCALE_PERCENT),
            rotation_velocity: rotation_degrees.map(|r| r.map(f32::to_radians)),
            translation: translation_hundredths.map(|t| t.map(|t| t / Self::TRANSLATION_DIVISOR)),
        }
    }
}

/// Incremental change applied to the selected object
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nudge {
    pub translation: Vector3<f32>,
    pub scale: f32,
    pub rotation_velocity: RotationState,
}

impl Nudge {
    pub fn translate(x: f32, y: f32, z: f32) -> Self {
        Self {
            translation: Vector3::new(x, y, z),
            ..Self::default()
        }
    }

    pub fn scale(delta: f32) -> Self {
        Self {
            scale: delta,
            ..Self::default()
        }
    }

    pub fn spin(x: f32, y: f32, z: f32) -> Self {
        Self {
            rotation_velocity: RotationState::new(x, y, z),
            ..Self::default()
        }
    }
}

impl Default for Nudge {
    fn default() -> Self {
        Self {
            translation: Vector3::zeros(),
            scale: 0.0,
            rotation_velocity: RotationState::zero(),
        }
    }
}
