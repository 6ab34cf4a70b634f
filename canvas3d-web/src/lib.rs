/// Canvas3D Web - WebGL2 scene editor for browsers
///
/// Exposes the scene editor to JavaScript. The page builds the form and
/// object list; every edit goes through [`WebEditor`] and lands between two
/// animation frames.
use std::cell::{Cell, RefCell};
use std::fmt::Display;
use std::rc::Rc;

use log::{info, warn};
use nalgebra::Vector3;
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{HtmlCanvasElement, HtmlImageElement};

use canvas3d_core::{
    obj, DirectionalLight, EditorConfig, LoadError, LoadTicket, Nudge, PrimitiveKind,
    SceneEditor, SceneError, SceneObject, TextureSource, TransformInput,
};

pub mod webgl;

pub use webgl::{WebGlBackend, WebGlError};

/// Image load finished by the browser, waiting to be uploaded
enum ImageEvent {
    Loaded(LoadTicket, HtmlImageElement),
    Failed(LoadTicket, String),
}

struct EditorState {
    editor: SceneEditor,
    backend: WebGlBackend,
    images: Rc<RefCell<Vec<ImageEvent>>>,
}

impl EditorState {
    fn frame(&mut self) {
        if let Err(e) = self.editor.frame(&mut self.backend) {
            warn!("frame skipped: {}", e);
        }
        // Uploaded after drawing so new models show the placeholder first
        let events = std::mem::take(&mut *self.images.borrow_mut());
        for event in events {
            match event {
                ImageEvent::Loaded(ticket, image) => {
                    let result = self
                        .backend
                        .upload_image(&image)
                        .map_err(|e| LoadError::Upload(e.to_string()));
                    self.editor.attach_texture(ticket, result);
                }
                ImageEvent::Failed(ticket, url) => {
                    let error = LoadError::Upload(format!("could not load {url}"));
                    self.editor.attach_texture(ticket, Err(error));
                }
            }
        }
    }
}

/// One row of the object list shown by the page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectSummary {
    pub index: usize,
    pub label: String,
    pub shape: String,
    pub scale: f32,
    pub translation: [f32; 3],
    pub rotation_velocity: [f32; 3],
    pub incomplete: bool,
}

impl ObjectSummary {
    pub fn new(index: usize, object: &SceneObject) -> Self {
        let transform = &object.transform;
        Self {
            index,
            label: object.label(index),
            shape: object.shape.name().to_string(),
            scale: transform.scale(),
            translation: transform.translation.into(),
            rotation_velocity: transform.rotation_velocity.as_array(),
            incomplete: object.is_incomplete(),
        }
    }
}

pub fn summarize(editor: &SceneEditor) -> Vec<ObjectSummary> {
    editor
        .registry()
        .iter()
        .enumerate()
        .map(|(index, object)| ObjectSummary::new(index, object))
        .collect()
}

fn to_js(error: impl Display) -> JsValue {
    JsValue::from_str(&error.to_string())
}

#[wasm_bindgen]
pub struct WebEditor {
    state: Rc<RefCell<EditorState>>,
    running: Rc<Cell<bool>>,
    /// Bumped by every `start`; callbacks from an older loop stop rescheduling
    generation: Rc<Cell<u32>>,
}

#[wasm_bindgen]
impl WebEditor {
    #[wasm_bindgen(constructor)]
    pub fn new(canvas_id: &str) -> Result<WebEditor, JsValue> {
        Self::create(canvas_id, EditorConfig::default())
    }

    /// Create an editor from a TOML configuration string
    pub fn with_config(canvas_id: &str, config_toml: &str) -> Result<WebEditor, JsValue> {
        let config = EditorConfig::from_toml_str(config_toml).map_err(to_js)?;
        Self::create(canvas_id, config)
    }

    /// Start the requestAnimationFrame loop
    pub fn start(&self) -> Result<(), JsValue> {
        if self.running.replace(true) {
            return Ok(());
        }
        let generation = self.generation.get().wrapping_add(1);
        self.generation.set(generation);

        let callback: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
        let next = callback.clone();
        let state = self.state.clone();
        let running = self.running.clone();
        let current = self.generation.clone();

        *callback.borrow_mut() = Some(Closure::wrap(Box::new(move || {
            if !is_live(running.get(), current.get(), generation) {
                return;
            }
            state.borrow_mut().frame();
            if let Some(closure) = next.borrow().as_ref() {
                if let Err(e) = request_animation_frame(closure) {
                    warn!("animation loop stopped: {:?}", e);
                }
            }
        }) as Box<dyn FnMut()>));

        let result = match callback.borrow().as_ref() {
            Some(closure) => request_animation_frame(closure),
            None => Ok(()),
        };
        result
    }

    /// Stop the animation loop after the current frame
    pub fn stop(&self) {
        self.running.set(false);
    }

    pub fn len(&self) -> usize {
        self.state.borrow().editor.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().editor.is_empty()
    }

    /// Add a "cube" or "pyramid"; returns its index
    pub fn add_primitive(&self, shape: &str) -> Result<usize, JsValue> {
        let kind: PrimitiveKind = shape.parse().map_err(to_js)?;
        self.state.borrow_mut().editor.add_primitive(kind).map_err(to_js)
    }

    /// Add a model from OBJ source text. The texture is fetched by the
    /// browser; until it arrives the model draws with the placeholder.
    pub fn add_model(
        &self,
        name: &str,
        obj_source: &str,
        texture_url: Option<String>,
    ) -> Result<usize, JsValue> {
        let mesh = obj::parse_obj(obj_source)
            .map_err(|source| LoadError::Mesh {
                path: format!("{name}.obj").into(),
                source,
            })
            .map_err(|e| to_js(SceneError::from(e)))?;

        let mut state = self.state.borrow_mut();
        let source = match texture_url {
            Some(_) => TextureSource::External,
            None => TextureSource::None,
        };
        let index = state.editor.add_model(name, mesh, source).map_err(to_js)?;

        let ticket = state.editor.get(index).map_err(to_js)?.texture_ticket();
        if let (Some(url), Some(ticket)) = (texture_url, ticket) {
            load_image(&url, ticket, state.images.clone())?;
        }
        Ok(index)
    }

    pub fn remove_at(&self, index: usize) -> Result<(), JsValue> {
        self.state
            .borrow_mut()
            .editor
            .remove_at(index)
            .map(|_| ())
            .map_err(to_js)
    }

    pub fn select(&self, index: usize) -> Result<(), JsValue> {
        self.state.borrow_mut().editor.select(index).map_err(to_js)
    }

    pub fn selected(&self) -> Option<usize> {
        self.state.borrow().editor.selected()
    }

    pub fn label(&self, index: usize) -> Result<String, JsValue> {
        let state = self.state.borrow();
        let object = state.editor.get(index).map_err(to_js)?;
        Ok(object.label(index))
    }

    /// JSON array describing every object, in scene order
    pub fn describe(&self) -> Result<String, JsValue> {
        let state = self.state.borrow();
        serde_json::to_string(&summarize(&state.editor)).map_err(to_js)
    }

    /// Apply the transformation form in form units: scale in percent,
    /// rotation in degrees per frame, translation in hundredths. Empty fields
    /// are passed as `undefined` and leave the value unchanged.
    #[allow(clippy::too_many_arguments)]
    pub fn apply_transformation(
        &self,
        index: usize,
        scale_percent: Option<f32>,
        rotate_x: Option<f32>,
        rotate_y: Option<f32>,
        rotate_z: Option<f32>,
        translate_x: Option<f32>,
        translate_y: Option<f32>,
        translate_z: Option<f32>,
    ) -> Result<(), JsValue> {
        let input = TransformInput::from_form(
            scale_percent,
            [rotate_x, rotate_y, rotate_z],
            [translate_x, translate_y, translate_z],
        );
        self.state
            .borrow_mut()
            .editor
            .apply_transformation(index, &input)
            .map_err(to_js)
    }

    /// Move, scale and spin the selected object by the given deltas
    pub fn nudge(&self, dx: f32, dy: f32, dz: f32, scale: f32) -> Result<(), JsValue> {
        let nudge = Nudge {
            translation: Vector3::new(dx, dy, dz),
            scale,
            ..Nudge::default()
        };
        self.state
            .borrow_mut()
            .editor
            .nudge_selected(&nudge)
            .map_err(to_js)
    }

    pub fn stop_animation(&self, index: usize) -> Result<(), JsValue> {
        self.state
            .borrow_mut()
            .editor
            .stop_animation(index)
            .map_err(to_js)
    }

    pub fn set_ambient_light(&self, r: f32, g: f32, b: f32) {
        let mut state = self.state.borrow_mut();
        let mut lighting = *state.editor.lighting();
        lighting.ambient = [r, g, b];
        state.editor.set_lighting(lighting);
    }

    /// Set or disable the directional light; `direction` is the way it travels
    #[allow(clippy::too_many_arguments)]
    pub fn set_directional_light(
        &self,
        enabled: bool,
        r: f32,
        g: f32,
        b: f32,
        dx: f32,
        dy: f32,
        dz: f32,
    ) {
        let mut state = self.state.borrow_mut();
        let mut lighting = *state.editor.lighting();
        lighting.directional =
            enabled.then(|| DirectionalLight::new([r, g, b], Vector3::new(dx, dy, dz)));
        state.editor.set_lighting(lighting);
    }
}

impl WebEditor {
    fn create(canvas_id: &str, config: EditorConfig) -> Result<WebEditor, JsValue> {
        let document = web_sys::window()
            .and_then(|window| window.document())
            .ok_or_else(|| JsValue::from_str("no document available"))?;
        let canvas: HtmlCanvasElement = document
            .get_element_by_id(canvas_id)
            .ok_or_else(|| JsValue::from_str(&format!("no element with id '{canvas_id}'")))?
            .dyn_into()
            .map_err(|_| JsValue::from_str(&format!("'{canvas_id}' is not a canvas")))?;

        let clear_color = config.render.clear_color;
        let editor = SceneEditor::new(config).map_err(to_js)?;
        let backend = WebGlBackend::new(canvas, clear_color).map_err(to_js)?;
        info!("WebGL2 editor attached to #{}", canvas_id);

        Ok(WebEditor {
            state: Rc::new(RefCell::new(EditorState {
                editor,
                backend,
                images: Rc::new(RefCell::new(Vec::new())),
            })),
            running: Rc::new(Cell::new(false)),
            generation: Rc::new(Cell::new(0)),
        })
    }
}

/// A scheduled frame callback only runs while its own loop is the current one
fn is_live(running: bool, current: u32, generation: u32) -> bool {
    running && current == generation
}

fn request_animation_frame(closure: &Closure<dyn FnMut()>) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window available"))?;
    window.request_animation_frame(closure.as_ref().unchecked_ref())?;
    Ok(())
}

/// Let the browser fetch and decode an image, then queue it for upload
fn load_image(
    url: &str,
    ticket: LoadTicket,
    events: Rc<RefCell<Vec<ImageEvent>>>,
) -> Result<(), JsValue> {
    let image = HtmlImageElement::new()?;

    let loaded = {
        let events = events.clone();
        let image = image.clone();
        Closure::once_into_js(move || {
            events.borrow_mut().push(ImageEvent::Loaded(ticket, image));
        })
    };
    let failed = {
        let url = url.to_string();
        Closure::once_into_js(move || {
            events.borrow_mut().push(ImageEvent::Failed(ticket, url));
        })
    };

    image.set_onload(Some(loaded.unchecked_ref()));
    image.set_onerror(Some(failed.unchecked_ref()));
    image.set_cross_origin(Some("anonymous"));
    image.set_src(url);
    info!("fetching texture {} for {}", url, ticket);
    Ok(())
}

#[wasm_bindgen(start)]
pub fn main() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).map_err(to_js)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas3d_core::TransformInput;

    #[test]
    fn test_restarted_loop_retires_old_callbacks() {
        // start, stop, start: the first loop's pending callback must not run
        let (first, second) = (1, 2);
        assert!(is_live(true, first, first));
        assert!(!is_live(false, first, first));
        assert!(!is_live(true, second, first));
        assert!(is_live(true, second, second));
    }

    #[test]
    fn test_summaries() {
        let mut editor = SceneEditor::with_seed(EditorConfig::default(), 3).unwrap();
        editor.add_primitive(PrimitiveKind::Cube).unwrap();
        editor.add_primitive(PrimitiveKind::Pyramid).unwrap();
        editor
            .apply_transformation(
                1,
                &TransformInput::from_form(Some(50.0), [None; 3], [Some(100.0), None, None]),
            )
            .unwrap();

        let rows = summarize(&editor);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].label, "cube #0");
        assert_eq!(rows[1].shape, "pyramid");
        assert!((rows[1].scale - 0.5).abs() < 1e-6);
        assert!((rows[1].translation[0] - 1.0).abs() < 1e-6);
        assert!(!rows[1].incomplete);
    }

    #[test]
    fn test_summary_json() {
        let mut editor = SceneEditor::with_seed(EditorConfig::default(), 3).unwrap();
        let mesh = obj::parse_obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nf 1/1 2/1 3/1\n").unwrap();
        let index = editor
            .add_model("tri", mesh, TextureSource::External)
            .unwrap();
        let ticket = editor.get(index).unwrap().texture_ticket().unwrap();
        editor.attach_texture(ticket, Err(LoadError::Upload("404".to_string())));

        let json = serde_json::to_string(&summarize(&editor)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["label"], "tri #0 (incomplete)");
        assert_eq!(value[0]["shape"], "tri");
        assert_eq!(value[0]["incomplete"], true);
    }
}
