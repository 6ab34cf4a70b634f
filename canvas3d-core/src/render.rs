/// Per-frame render loop and the backend boundary it draws through
use std::fmt;

use log::{debug, warn};
use nalgebra::Matrix4;

use crate::error::SceneError;
use crate::geometry::{Position, Rgb};
use crate::lighting::Lighting;
use crate::object::{SceneObject, Shape};
use crate::registry::SceneRegistry;
use crate::resource::{ResourceState, TextureHandle, TextureImage};

/// Texture to bind for a textured draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureBinding {
    /// The backend's neutral placeholder, used while a texture is unavailable
    Placeholder,
    Bound(TextureHandle),
}

impl From<&ResourceState<TextureHandle>> for TextureBinding {
    fn from(state: &ResourceState<TextureHandle>) -> Self {
        match state {
            ResourceState::Ready(handle) => TextureBinding::Bound(*handle),
            ResourceState::Loading | ResourceState::Failed(_) => TextureBinding::Placeholder,
        }
    }
}

/// Per-vertex surface data of a draw call
#[derive(Debug, Clone, Copy)]
pub enum Surface<'a> {
    VertexColors(&'a [Rgb]),
    Textured {
        texcoords: &'a [[f32; 2]],
        texture: TextureBinding,
    },
}

/// Everything a backend needs to draw one object
#[derive(Debug, Clone, Copy)]
pub struct DrawCall<'a> {
    pub index: usize,
    pub model: Matrix4<f32>,
    pub positions: &'a [Position],
    pub surface: Surface<'a>,
    pub normals: Option<&'a [[f32; 3]]>,
}

impl<'a> DrawCall<'a> {
    /// Route an object to its geometry and surface source.
    ///
    /// `model` is computed by the caller so the rotation advance happens
    /// exactly once per frame.
    pub fn for_object(index: usize, object: &'a SceneObject, model: Matrix4<f32>) -> Self {
        let (positions, surface, normals) = match &object.shape {
            Shape::Cube(surface) | Shape::Pyramid(surface) => (
                object.shape.positions(),
                Surface::VertexColors(surface.vertex_colors()),
                None,
            ),
            Shape::Model(model_data) => {
                let mesh = &model_data.mesh;
                let surface = if mesh.has_texcoords() {
                    Surface::Textured {
                        texcoords: &mesh.texcoords,
                        texture: TextureBinding::from(&model_data.texture),
                    }
                } else {
                    Surface::VertexColors(model_data.fallback_colors())
                };
                let normals = mesh.has_normals().then_some(mesh.normals.as_slice());
                (mesh.positions.as_slice(), surface, normals)
            }
        };

        Self {
            index,
            model,
            positions,
            surface,
            normals,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Check that every per-vertex buffer matches the position count
    pub fn validate(&self) -> Result<(), SceneError> {
        let count = self.positions.len();
        if count % 3 != 0 {
            return Err(SceneError::MalformedDrawCall(format!(
                "object {} has {} vertices, not a multiple of 3",
                self.index, count
            )));
        }
        let surface_len = match self.surface {
            Surface::VertexColors(colors) => colors.len(),
            Surface::Textured { texcoords, .. } => texcoords.len(),
        };
        if surface_len != count {
            return Err(SceneError::MalformedDrawCall(format!(
                "object {} has {} surface entries for {} vertices",
                self.index, surface_len, count
            )));
        }
        if let Some(normals) = self.normals {
            if normals.len() != count {
                return Err(SceneError::MalformedDrawCall(format!(
                    "object {} has {} normals for {} vertices",
                    self.index,
                    normals.len(),
                    count
                )));
            }
        }
        Ok(())
    }
}

/// Host graphics layer the render loop draws through
pub trait RenderBackend {
    type Error: fmt::Display;

    fn clear(&mut self) -> Result<(), Self::Error>;

    fn set_lighting(&mut self, lighting: &Lighting) -> Result<(), Self::Error>;

    fn draw(&mut self, call: &DrawCall<'_>) -> Result<(), Self::Error>;

    fn upload_texture(&mut self, image: &TextureImage) -> Result<TextureHandle, Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderState {
    #[default]
    Idle,
    Rendering,
}

/// Outcome of one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    pub frame: u64,
    pub drawn: usize,
    pub failed: usize,
}

/// Drives one frame at a time; the host schedules the ticks
#[derive(Debug, Default)]
pub struct RenderLoop {
    state: RenderState,
    frames: u64,
}

impl RenderLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RenderState {
        self.state
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Render one frame: clear, push lighting, then draw every object.
    ///
    /// A failing draw is reported and skipped; the remaining objects are still
    /// drawn. Clear and lighting failures abort the frame.
    pub fn tick<B: RenderBackend>(
        &mut self,
        registry: &mut SceneRegistry,
        lighting: &Lighting,
        backend: &mut B,
    ) -> Result<FrameStats, SceneError> {
        if self.state == RenderState::Idle {
            debug!("render loop started");
            self.state = RenderState::Rendering;
        }
        self.frames += 1;

        backend
            .clear()
            .map_err(|e| SceneError::Backend(format!("clear failed: {e}")))?;
        backend
            .set_lighting(lighting)
            .map_err(|e| SceneError::Backend(format!("lighting upload failed: {e}")))?;

        let mut stats = FrameStats {
            frame: self.frames,
            ..FrameStats::default()
        };
        for (index, object) in registry.iter_mut().enumerate() {
            let model = object.transform.advance_and_model_matrix();
            let call = DrawCall::for_object(index, object, model);

            let result = call
                .validate()
                .and_then(|()| backend.draw(&call).map_err(|e| SceneError::Backend(e.to_string())));
            match result {
                Ok(()) => stats.drawn += 1,
                Err(e) => {
                    warn!("failed to draw {}: {}", object.label(index), e);
                    stats.failed += 1;
                }
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Mesh;
    use crate::object::ModelData;
    use crate::primitives::PrimitiveKind;
    use crate::resource::LoadTicket;
    use crate::transform::{ObjectTransform, RotationState};
    use nalgebra::Vector3;

    /// Records draw calls and fails on request
    #[derive(Default)]
    struct RecordingBackend {
        clears: usize,
        drawn: Vec<(usize, usize, Option<TextureBinding>)>,
        fail_on: Option<usize>,
        fail_clear: bool,
    }

    impl RenderBackend for RecordingBackend {
        type Error = String;

        fn clear(&mut self) -> Result<(), String> {
            if self.fail_clear {
                return Err("context lost".into());
            }
            self.clears += 1;
            Ok(())
        }

        fn set_lighting(&mut self, _lighting: &Lighting) -> Result<(), String> {
            Ok(())
        }

        fn draw(&mut self, call: &DrawCall<'_>) -> Result<(), String> {
            if self.fail_on == Some(call.index) {
                return Err("buffer rejected".into());
            }
            let texture = match call.surface {
                Surface::Textured { texture, .. } => Some(texture),
                Surface::VertexColors(_) => None,
            };
            self.drawn.push((call.index, call.vertex_count(), texture));
            Ok(())
        }

        fn upload_texture(&mut self, _image: &TextureImage) -> Result<TextureHandle, String> {
            Ok(TextureHandle(0))
        }
    }

    fn primitive(kind: PrimitiveKind) -> SceneObject {
        SceneObject::new(
            Shape::primitive(kind, kind.default_face_colors()).unwrap(),
            ObjectTransform::new(0.1, Vector3::zeros(), RotationState::new(0.0, 0.05, 0.0)).unwrap(),
        )
    }

    fn textured_model() -> SceneObject {
        let mesh = Mesh {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            texcoords: vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]],
            normals: Vec::new(),
        };
        let mut model = ModelData::new("tri", mesh, [0.5; 3]);
        model.await_texture(LoadTicket(7));
        SceneObject::new(
            Shape::Model(model),
            ObjectTransform::new(1.0, Vector3::zeros(), RotationState::zero()).unwrap(),
        )
    }

    #[test]
    fn test_dispatch_by_shape() {
        let mut registry = SceneRegistry::new();
        registry.add(primitive(PrimitiveKind::Cube));
        registry.add(primitive(PrimitiveKind::Pyramid));
        registry.add(textured_model());

        let mut render_loop = RenderLoop::new();
        assert_eq!(render_loop.state(), RenderState::Idle);

        let mut backend = RecordingBackend::default();
        let stats = render_loop
            .tick(&mut registry, &Lighting::default(), &mut backend)
            .unwrap();

        assert_eq!(render_loop.state(), RenderState::Rendering);
        assert_eq!(render_loop.frames(), 1);
        assert_eq!(backend.clears, 1);
        assert_eq!(stats, FrameStats { frame: 1, drawn: 3, failed: 0 });
        assert_eq!(
            backend.drawn,
            vec![
                (0, 36, None),
                (1, 12, None),
                (2, 3, Some(TextureBinding::Placeholder)),
            ]
        );
    }

    #[test]
    fn test_failed_draw_does_not_stop_the_frame() {
        let mut registry = SceneRegistry::new();
        for _ in 0..3 {
            registry.add(primitive(PrimitiveKind::Cube));
        }
        let mut backend = RecordingBackend {
            fail_on: Some(1),
            ..RecordingBackend::default()
        };

        let stats = RenderLoop::new()
            .tick(&mut registry, &Lighting::default(), &mut backend)
            .unwrap();
        assert_eq!(stats.drawn, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(backend.drawn.iter().map(|d| d.0).collect::<Vec<_>>(), vec![0, 2]);

        // The failed object still advanced exactly once
        let y = registry.get(1).unwrap().transform.accumulated_rotation.y;
        assert!((y - 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_clear_failure_aborts_frame() {
        let mut registry = SceneRegistry::new();
        registry.add(primitive(PrimitiveKind::Cube));
        let mut backend = RecordingBackend {
            fail_clear: true,
            ..RecordingBackend::default()
        };
        let result = RenderLoop::new().tick(&mut registry, &Lighting::default(), &mut backend);
        assert!(matches!(result, Err(SceneError::Backend(_))));
        assert!(backend.drawn.is_empty());
    }

    #[test]
    fn test_malformed_model_is_skipped() {
        let mut registry = SceneRegistry::new();
        let mesh = Mesh {
            positions: vec![[0.0; 3]; 4],
            ..Mesh::default()
        };
        registry.add(SceneObject::new(
            Shape::Model(ModelData::new("broken", mesh, [0.5; 3])),
            ObjectTransform::new(1.0, Vector3::zeros(), RotationState::zero()).unwrap(),
        ));
        registry.add(primitive(PrimitiveKind::Pyramid));

        let mut backend = RecordingBackend::default();
        let stats = RenderLoop::new()
            .tick(&mut registry, &Lighting::default(), &mut backend)
            .unwrap();
        assert_eq!(stats.failed, 1);
        assert_eq!(backend.drawn, vec![(1, 12, None)]);
    }

    #[test]
    fn test_binding_from_state() {
        assert_eq!(
            TextureBinding::from(&ResourceState::Ready(TextureHandle(4))),
            TextureBinding::Bound(TextureHandle(4))
        );
        assert_eq!(
            TextureBinding::from(&ResourceState::<TextureHandle>::Failed("gone".into())),
            TextureBinding::Placeholder
        );
    }
}
