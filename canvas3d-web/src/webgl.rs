/// WebGL2 implementation of the editor's render backend
use nalgebra::Matrix4;
use thiserror::Error;
use wasm_bindgen::JsCast;
use web_sys::{
    HtmlCanvasElement, HtmlImageElement, WebGl2RenderingContext as Gl, WebGlBuffer, WebGlProgram,
    WebGlShader, WebGlTexture, WebGlUniformLocation,
};

use canvas3d_core::{
    Camera, DrawCall, Lighting, RenderBackend, Rgb, Surface, TextureBinding, TextureHandle,
    TextureImage,
};

const VERTEX_SHADER: &str = r#"#version 300 es
in vec3 a_position;
in vec3 a_color;
in vec2 a_texcoord;
in vec3 a_normal;

uniform mat4 u_modelView;
uniform mat4 u_projection;
uniform bool u_hasNormals;
uniform vec3 u_ambientLight;
uniform vec3 u_directionalLight;
uniform vec3 u_lightDirection;

out vec3 v_color;
out vec2 v_texcoord;
out vec3 v_lighting;

void main() {
    gl_Position = u_projection * u_modelView * vec4(a_position, 1.0);
    v_color = a_color;
    v_texcoord = a_texcoord;

    float facing = 0.0;
    if (u_hasNormals) {
        vec3 normal = normalize(mat3(u_modelView) * a_normal);
        facing = max(dot(normal, normalize(-u_lightDirection)), 0.0);
    }
    v_lighting = u_ambientLight + u_directionalLight * facing;
}
"#;

const FRAGMENT_SHADER: &str = r#"#version 300 es
precision mediump float;

in vec3 v_color;
in vec2 v_texcoord;
in vec3 v_lighting;

uniform sampler2D u_texture;
uniform bool u_useTexture;

out vec4 outColor;

void main() {
    vec4 base = u_useTexture ? texture(u_texture, v_texcoord) : vec4(v_color, 1.0);
    outColor = vec4(base.rgb * v_lighting, base.a);
}
"#;

const PLACEHOLDER_PIXEL: [u8; 4] = [204, 204, 204, 255];

#[derive(Debug, Error)]
pub enum WebGlError {
    #[error("WebGL2 is not available in this browser")]
    Unsupported,
    #[error("shader compilation failed: {0}")]
    Shader(String),
    #[error("program link failed: {0}")]
    Link(String),
    #[error("failed to create {0}")]
    Create(&'static str),
    #[error("texture handle {0:?} was never uploaded")]
    UnknownTexture(TextureHandle),
    #[error("WebGL call failed: {0}")]
    Call(String),
}

struct Attributes {
    position: u32,
    color: u32,
    texcoord: u32,
    normal: u32,
}

struct Uniforms {
    model_view: Option<WebGlUniformLocation>,
    projection: Option<WebGlUniformLocation>,
    has_normals: Option<WebGlUniformLocation>,
    ambient: Option<WebGlUniformLocation>,
    directional: Option<WebGlUniformLocation>,
    light_direction: Option<WebGlUniformLocation>,
    texture: Option<WebGlUniformLocation>,
    use_texture: Option<WebGlUniformLocation>,
}

pub struct WebGlBackend {
    gl: Gl,
    canvas: HtmlCanvasElement,
    program: WebGlProgram,
    attributes: Attributes,
    uniforms: Uniforms,
    buffers: [WebGlBuffer; 4],
    placeholder: WebGlTexture,
    textures: Vec<WebGlTexture>,
    clear_color: Rgb,
}

impl WebGlBackend {
    pub fn new(canvas: HtmlCanvasElement, clear_color: Rgb) -> Result<Self, WebGlError> {
        let gl: Gl = canvas
            .get_context("webgl2")
            .map_err(|_| WebGlError::Unsupported)?
            .ok_or(WebGlError::Unsupported)?
            .dyn_into()
            .map_err(|_| WebGlError::Unsupported)?;

        let vertex = compile_shader(&gl, Gl::VERTEX_SHADER, VERTEX_SHADER)?;
        let fragment = compile_shader(&gl, Gl::FRAGMENT_SHADER, FRAGMENT_SHADER)?;
        let program = link_program(&gl, &vertex, &fragment)?;

        let attribute = |name: &str| -> Result<u32, WebGlError> {
            u32::try_from(gl.get_attrib_location(&program, name))
                .map_err(|_| WebGlError::Link(format!("attribute {name} is missing")))
        };
        let attributes = Attributes {
            position: attribute("a_position")?,
            color: attribute("a_color")?,
            texcoord: attribute("a_texcoord")?,
            normal: attribute("a_normal")?,
        };
        let uniforms = Uniforms {
            model_view: gl.get_uniform_location(&program, "u_modelView"),
            projection: gl.get_uniform_location(&program, "u_projection"),
            has_normals: gl.get_uniform_location(&program, "u_hasNormals"),
            ambient: gl.get_uniform_location(&program, "u_ambientLight"),
            directional: gl.get_uniform_location(&program, "u_directionalLight"),
            light_direction: gl.get_uniform_location(&program, "u_lightDirection"),
            texture: gl.get_uniform_location(&program, "u_texture"),
            use_texture: gl.get_uniform_location(&program, "u_useTexture"),
        };

        let buffer = || gl.create_buffer().ok_or(WebGlError::Create("buffer"));
        let buffers = [buffer()?, buffer()?, buffer()?, buffer()?];

        gl.use_program(Some(&program));
        gl.enable(Gl::DEPTH_TEST);
        gl.depth_func(Gl::LEQUAL);
        gl.pixel_storei(Gl::UNPACK_FLIP_Y_WEBGL, 1);

        let placeholder = create_texture(&gl)?;
        gl.tex_image_2d_with_i32_and_i32_and_i32_and_format_and_type_and_opt_u8_array(
            Gl::TEXTURE_2D,
            0,
            Gl::RGBA as i32,
            1,
            1,
            0,
            Gl::RGBA,
            Gl::UNSIGNED_BYTE,
            Some(&PLACEHOLDER_PIXEL[..]),
        )
        .map_err(|e| WebGlError::Call(format!("{e:?}")))?;

        Ok(Self {
            gl,
            canvas,
            program,
            attributes,
            uniforms,
            buffers,
            placeholder,
            textures: Vec::new(),
            clear_color,
        })
    }

    /// Upload a browser-decoded image and return its handle
    pub fn upload_image(&mut self, image: &HtmlImageElement) -> Result<TextureHandle, WebGlError> {
        let texture = create_texture(&self.gl)?;
        self.gl
            .tex_image_2d_with_u32_and_u32_and_html_image_element(
                Gl::TEXTURE_2D,
                0,
                Gl::RGBA as i32,
                Gl::RGBA,
                Gl::UNSIGNED_BYTE,
                image,
            )
            .map_err(|e| WebGlError::Call(format!("{e:?}")))?;
        Ok(self.register(texture))
    }

    fn register(&mut self, texture: WebGlTexture) -> TextureHandle {
        self.textures.push(texture);
        TextureHandle(self.textures.len() as u32 - 1)
    }

    fn upload_attribute(&self, slot: usize, location: u32, size: i32, data: &[f32]) {
        self.gl
            .bind_buffer(Gl::ARRAY_BUFFER, Some(&self.buffers[slot]));
        self.gl.buffer_data_with_u8_array(
            Gl::ARRAY_BUFFER,
            bytemuck::cast_slice(data),
            Gl::DYNAMIC_DRAW,
        );
        self.gl.enable_vertex_attrib_array(location);
        self.gl
            .vertex_attrib_pointer_with_i32(location, size, Gl::FLOAT, false, 0, 0);
    }

    fn projection(&self) -> Matrix4<f32> {
        Camera::new(self.canvas.width(), self.canvas.height()).view_projection()
    }
}

impl RenderBackend for WebGlBackend {
    type Error = WebGlError;

    fn clear(&mut self) -> Result<(), WebGlError> {
        let (width, height) = (self.canvas.width() as i32, self.canvas.height() as i32);
        self.gl.viewport(0, 0, width, height);
        let [r, g, b] = self.clear_color;
        self.gl.clear_color(r, g, b, 1.0);
        self.gl.clear(Gl::COLOR_BUFFER_BIT | Gl::DEPTH_BUFFER_BIT);
        Ok(())
    }

    fn set_lighting(&mut self, lighting: &Lighting) -> Result<(), WebGlError> {
        self.gl.use_program(Some(&self.program));
        self.gl
            .uniform3fv_with_f32_array(self.uniforms.ambient.as_ref(), &lighting.ambient);
        let (color, direction): (Rgb, [f32; 3]) = match lighting.directional {
            Some(sun) => (sun.color, sun.direction.into()),
            None => ([0.0; 3], [0.0, 0.0, -1.0]),
        };
        self.gl
            .uniform3fv_with_f32_array(self.uniforms.directional.as_ref(), &color);
        self.gl
            .uniform3fv_with_f32_array(self.uniforms.light_direction.as_ref(), &direction);
        Ok(())
    }

    fn draw(&mut self, call: &DrawCall<'_>) -> Result<(), WebGlError> {
        let gl = &self.gl;
        gl.uniform_matrix4fv_with_f32_array(
            self.uniforms.model_view.as_ref(),
            false,
            call.model.as_slice(),
        );
        gl.uniform_matrix4fv_with_f32_array(
            self.uniforms.projection.as_ref(),
            false,
            self.projection().as_slice(),
        );

        let positions: &[f32] = bytemuck::cast_slice(call.positions);
        self.upload_attribute(0, self.attributes.position, 3, positions);

        match call.surface {
            Surface::VertexColors(colors) => {
                self.upload_attribute(1, self.attributes.color, 3, bytemuck::cast_slice(colors));
                gl.disable_vertex_attrib_array(self.attributes.texcoord);
                gl.vertex_attrib2f(self.attributes.texcoord, 0.0, 0.0);
                gl.uniform1i(self.uniforms.use_texture.as_ref(), 0);
            }
            Surface::Textured { texcoords, texture } => {
                let texture = match texture {
                    TextureBinding::Placeholder => &self.placeholder,
                    TextureBinding::Bound(handle) => self
                        .textures
                        .get(handle.0 as usize)
                        .ok_or(WebGlError::UnknownTexture(handle))?,
                };
                self.upload_attribute(
                    2,
                    self.attributes.texcoord,
                    2,
                    bytemuck::cast_slice(texcoords),
                );
                gl.disable_vertex_attrib_array(self.attributes.color);
                gl.vertex_attrib3f(self.attributes.color, 1.0, 1.0, 1.0);
                gl.active_texture(Gl::TEXTURE0);
                gl.bind_texture(Gl::TEXTURE_2D, Some(texture));
                gl.uniform1i(self.uniforms.texture.as_ref(), 0);
                gl.uniform1i(self.uniforms.use_texture.as_ref(), 1);
            }
        }

        match call.normals {
            Some(normals) => {
                self.upload_attribute(3, self.attributes.normal, 3, bytemuck::cast_slice(normals));
                gl.uniform1i(self.uniforms.has_normals.as_ref(), 1);
            }
            None => {
                gl.disable_vertex_attrib_array(self.attributes.normal);
                gl.vertex_attrib3f(self.attributes.normal, 0.0, 0.0, 1.0);
                gl.uniform1i(self.uniforms.has_normals.as_ref(), 0);
            }
        }

        gl.draw_arrays(Gl::TRIANGLES, 0, call.vertex_count() as i32);
        Ok(())
    }

    fn upload_texture(&mut self, image: &TextureImage) -> Result<TextureHandle, WebGlError> {
        let texture = create_texture(&self.gl)?;
        self.gl
            .tex_image_2d_with_i32_and_i32_and_i32_and_format_and_type_and_opt_u8_array(
                Gl::TEXTURE_2D,
                0,
                Gl::RGBA as i32,
                image.width as i32,
                image.height as i32,
                0,
                Gl::RGBA,
                Gl::UNSIGNED_BYTE,
                Some(image.rgba.as_slice()),
            )
            .map_err(|e| WebGlError::Call(format!("{e:?}")))?;
        Ok(self.register(texture))
    }
}

/// Create and bind a texture with repeat wrapping and linear filtering
fn create_texture(gl: &Gl) -> Result<WebGlTexture, WebGlError> {
    let texture = gl.create_texture().ok_or(WebGlError::Create("texture"))?;
    gl.bind_texture(Gl::TEXTURE_2D, Some(&texture));
    gl.tex_parameteri(Gl::TEXTURE_2D, Gl::TEXTURE_WRAP_S, Gl::REPEAT as i32);
    gl.tex_parameteri(Gl::TEXTURE_2D, Gl::TEXTURE_WRAP_T, Gl::REPEAT as i32);
    gl.tex_parameteri(Gl::TEXTURE_2D, Gl::TEXTURE_MIN_FILTER, Gl::LINEAR as i32);
    gl.tex_parameteri(Gl::TEXTURE_2D, Gl::TEXTURE_MAG_FILTER, Gl::LINEAR as i32);
    Ok(texture)
}

fn compile_shader(gl: &Gl, kind: u32, source: &str) -> Result<WebGlShader, WebGlError> {
    let shader = gl.create_shader(kind).ok_or(WebGlError::Create("shader"))?;
    gl.shader_source(&shader, source);
    gl.compile_shader(&shader);

    let compiled = gl
        .get_shader_parameter(&shader, Gl::COMPILE_STATUS)
        .as_bool()
        .unwrap_or(false);
    if compiled {
        Ok(shader)
    } else {
        let log = gl.get_shader_info_log(&shader).unwrap_or_default();
        gl.delete_shader(Some(&shader));
        Err(WebGlError::Shader(log))
    }
}

fn link_program(
    gl: &Gl,
    vertex: &WebGlShader,
    fragment: &WebGlShader,
) -> Result<WebGlProgram, WebGlError> {
    let program = gl.create_program().ok_or(WebGlError::Create("program"))?;
    gl.attach_shader(&program, vertex);
    gl.attach_shader(&program, fragment);
    gl.link_program(&program);

    let linked = gl
        .get_program_parameter(&program, Gl::LINK_STATUS)
        .as_bool()
        .unwrap_or(false);
    if linked {
        Ok(program)
    } else {
        let log = gl.get_program_info_log(&program).unwrap_or_default();
        gl.delete_program(Some(&program));
        Err(WebGlError::Link(log))
    }
}
