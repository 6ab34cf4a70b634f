/// Application context owning the scene and driving frames.
///
/// Every mutating entry point takes `&mut self`, as does [`SceneEditor::frame`],
/// so user edits always land between frames and never inside the per-object
/// draw loop.
use std::path::PathBuf;

use log::{debug, info, warn};
use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{ConfigError, EditorConfig};
use crate::error::{LoadError, SceneError};
use crate::geometry::{Mesh, Rgb};
use crate::lighting::Lighting;
use crate::loader::{load_mesh, LoadQueue};
use crate::object::{ModelData, Nudge, SceneObject, Shape, TransformInput};
use crate::primitives::PrimitiveKind;
use crate::registry::SceneRegistry;
use crate::render::{FrameStats, RenderBackend, RenderLoop, RenderState};
use crate::resource::{LoadTicket, ResourceState, TextureHandle};
use crate::transform::{ObjectTransform, RotationState};

/// Where a model's texture comes from
#[derive(Debug, Clone, PartialEq)]
pub enum TextureSource {
    /// The model is drawn with the placeholder texture
    None,
    /// Decoded by the editor's load queue
    File(PathBuf),
    /// Loaded by the host, which calls [`SceneEditor::attach_texture`]
    External,
}

pub struct SceneEditor {
    config: EditorConfig,
    registry: SceneRegistry,
    lighting: Lighting,
    render_loop: RenderLoop,
    loads: LoadQueue,
    rng: StdRng,
}

impl SceneEditor {
    pub fn new(config: EditorConfig) -> Result<Self, ConfigError> {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Editor with reproducible spawn placement
    pub fn with_seed(config: EditorConfig, seed: u64) -> Result<Self, ConfigError> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: EditorConfig, rng: StdRng) -> Result<Self, ConfigError> {
        // Spawn ranges are sampled on every add and must not be empty
        config.validate()?;
        let lighting = config.lighting.to_lighting();
        Ok(Self {
            config,
            registry: SceneRegistry::new(),
            lighting,
            render_loop: RenderLoop::new(),
            loads: LoadQueue::new(),
            rng,
        })
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn registry(&self) -> &SceneRegistry {
        &self.registry
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn render_state(&self) -> RenderState {
        self.render_loop.state()
    }

    pub fn pending_loads(&self) -> usize {
        self.loads.in_flight()
    }

    fn spawn_transform(&mut self) -> Result<ObjectTransform, SceneError> {
        let spawn = &self.config.spawn;
        let range = spawn.translation_range;
        let translation = Vector3::new(
            self.rng.gen_range(-range..=range) as f32,
            self.rng.gen_range(-range..=range) as f32,
            self.rng.gen_range(-range..=range) as f32,
        );
        let speed = self
            .rng
            .gen_range(spawn.rotation_speed_min..spawn.rotation_speed_max);
        ObjectTransform::new(spawn.scale, translation, RotationState::new(0.0, speed, 0.0))
    }

    fn push(&mut self, shape: Shape) -> Result<usize, SceneError> {
        let transform = self.spawn_transform()?;
        let object = SceneObject::new(shape, transform);
        let index = self.registry.add(object);
        debug!("added {}", self.registry.get(index)?.label(index));
        Ok(index)
    }

    pub fn add_primitive(&mut self, kind: PrimitiveKind) -> Result<usize, SceneError> {
        self.add_primitive_with_colors(kind, kind.default_face_colors())
    }

    pub fn add_primitive_with_colors(
        &mut self,
        kind: PrimitiveKind,
        face_colors: Vec<Rgb>,
    ) -> Result<usize, SceneError> {
        let shape = Shape::primitive(kind, face_colors)?;
        self.push(shape)
    }

    /// Add an already parsed mesh. A texture file is queued and attached once
    /// decoded; until then the model draws with the placeholder texture.
    pub fn add_model(
        &mut self,
        name: &str,
        mut mesh: Mesh,
        texture: TextureSource,
    ) -> Result<usize, SceneError> {
        if mesh.is_empty() {
            return Err(LoadError::EmptyMesh.into());
        }
        if self.config.render.normalize_models {
            mesh.normalize(self.config.render.model_extent);
        }

        let mut model = ModelData::new(name, mesh, self.config.render.model_color);
        match texture {
            TextureSource::None => {}
            TextureSource::File(path) => {
                let ticket = self.loads.issue_ticket();
                model.await_texture(ticket);
                self.loads.spawn_texture_file(ticket, path);
            }
            TextureSource::External => {
                let ticket = self.loads.issue_ticket();
                model.await_texture(ticket);
            }
        }
        self.push(Shape::Model(model))
    }

    /// Load `<models_dir>/<name>.obj` and queue `<models_dir>/<name>.png`.
    ///
    /// A mesh failure inserts nothing; a missing texture only flags the model
    /// as incomplete once the load fails.
    pub fn load_model(&mut self, name: &str) -> Result<usize, SceneError> {
        let dir = &self.config.assets.models_dir;
        let mesh_path = dir.join(format!("{name}.obj"));
        let texture_path = dir.join(format!("{name}.png"));

        let mesh = load_mesh(&mesh_path)?;
        info!("adding model '{}' from {}", name, mesh_path.display());
        self.add_model(name, mesh, TextureSource::File(texture_path))
    }

    pub fn remove_at(&mut self, index: usize) -> Result<SceneObject, SceneError> {
        let removed = self.registry.remove_at(index)?;
        debug!("removed {}", removed.label(index));
        Ok(removed)
    }

    pub fn get(&self, index: usize) -> Result<&SceneObject, SceneError> {
        self.registry.get(index)
    }

    pub fn select(&mut self, index: usize) -> Result<(), SceneError> {
        self.registry.select(index)
    }

    pub fn select_next(&mut self) -> Option<usize> {
        self.registry.select_next()
    }

    pub fn selected(&self) -> Option<usize> {
        self.registry.selected()
    }

    pub fn apply_transformation(
        &mut self,
        index: usize,
        input: &TransformInput,
    ) -> Result<(), SceneError> {
        self.registry.get_mut(index)?.apply(input)
    }

    pub fn nudge_selected(&mut self, nudge: &Nudge) -> Result<(), SceneError> {
        let index = self.registry.selected().ok_or(SceneError::NoSelection)?;
        self.registry.get_mut(index)?.nudge(nudge)
    }

    pub fn stop_animation(&mut self, index: usize) -> Result<(), SceneError> {
        self.registry.get_mut(index)?.transform.stop();
        Ok(())
    }

    pub fn lighting(&self) -> &Lighting {
        &self.lighting
    }

    pub fn set_lighting(&mut self, lighting: Lighting) {
        self.lighting = lighting;
    }

    /// Resolve a texture load. Results for removed objects are dropped.
    pub fn attach_texture(&mut self, ticket: LoadTicket, result: Result<TextureHandle, LoadError>) {
        let Some(object) = self.registry.find_by_ticket_mut(ticket) else {
            debug!("dropping texture for {}: object no longer exists", ticket);
            return;
        };
        let Shape::Model(model) = &mut object.shape else {
            return;
        };
        model.texture = match result {
            Ok(handle) => {
                info!("texture ready for model '{}'", model.name);
                ResourceState::Ready(handle)
            }
            Err(e) => {
                warn!("texture for model '{}' failed: {}", model.name, e);
                ResourceState::Failed(e.to_string())
            }
        };
    }

    fn pump_loads<B: RenderBackend>(&mut self, backend: &mut B) {
        for completion in self.loads.poll_completed() {
            let result = completion.result.and_then(|image| {
                backend
                    .upload_texture(&image)
                    .map_err(|e| LoadError::Upload(e.to_string()))
            });
            self.attach_texture(completion.ticket, result);
        }
    }

    /// Render one frame, then attach any textures that finished loading.
    pub fn frame<B: RenderBackend>(&mut self, backend: &mut B) -> Result<FrameStats, SceneError> {
        let stats = self
            .render_loop
            .tick(&mut self.registry, &self.lighting, backend)?;
        self.pump_loads(backend);
        Ok(stats)
    }
}
