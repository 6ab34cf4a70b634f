/// ASCII rasterizer implementing the editor's render backend
use crossterm::{
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    QueueableCommand,
};
use nalgebra::{Matrix3, Matrix4, Point3, Vector3};
use std::io::Write;
use thiserror::Error;

use canvas3d_core::{
    Camera, DrawCall, Lighting, Position, RenderBackend, Rgb, Surface, TextureBinding,
    TextureHandle, TextureImage, Triangle,
};

/// Character luminosity ramp for depth/shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Terminal cells are roughly twice as tall as they are wide
const CELL_ASPECT: f32 = 0.5;

/// Color of textured surfaces whose texture is not available
const PLACEHOLDER_COLOR: Rgb = [0.8, 0.8, 0.8];

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("texture handle {0:?} was never uploaded")]
    UnknownTexture(TextureHandle),
    #[error("texture has no pixels")]
    EmptyTexture,
}

/// ASCII renderer that rasterizes draw calls into terminal characters
pub struct AsciiRenderer {
    width: usize,
    height: usize,
    depth_buffer: Vec<f32>,
    char_buffer: Vec<char>,
    color_buffer: Vec<Color>,
    camera: Camera,
    lighting: Lighting,
    textures: Vec<TextureImage>,
    clear_color: Color,
}

impl AsciiRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            depth_buffer: vec![f32::INFINITY; size],
            char_buffer: vec![' '; size],
            color_buffer: vec![Color::Reset; size],
            camera: Camera::new(width as u32, height as u32).with_pixel_aspect(CELL_ASPECT),
            lighting: Lighting::default(),
            textures: Vec::new(),
            clear_color: Color::Reset,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn set_clear_color(&mut self, color: Rgb) {
        self.clear_color = to_terminal_color(color);
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        let textures = std::mem::take(&mut self.textures);
        let clear_color = self.clear_color;
        *self = Self::new(width, height);
        self.textures = textures;
        self.clear_color = clear_color;
    }

    /// Character and color at a cell, for inspection
    pub fn cell(&self, x: usize, y: usize) -> Option<(char, Color)> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = y * self.width + x;
        Some((self.char_buffer[idx], self.color_buffer[idx]))
    }

    pub fn covered_cells(&self) -> usize {
        self.depth_buffer.iter().filter(|d| d.is_finite()).count()
    }

    fn surface_color(&self, call: &DrawCall<'_>, first: usize) -> Result<Rgb, RenderError> {
        match call.surface {
            Surface::VertexColors(colors) => Ok(colors[first]),
            Surface::Textured { texcoords, texture } => {
                let image = match texture {
                    TextureBinding::Placeholder => return Ok(PLACEHOLDER_COLOR),
                    TextureBinding::Bound(handle) => self
                        .textures
                        .get(handle.0 as usize)
                        .ok_or(RenderError::UnknownTexture(handle))?,
                };
                // Flat shading: sample at the triangle's texture-space centroid
                let uv = &texcoords[first..first + 3];
                let u = (uv[0][0] + uv[1][0] + uv[2][0]) / 3.0;
                let v = (uv[0][1] + uv[1][1] + uv[2][1]) / 3.0;
                let [r, g, b, _] = image.sample(u, v);
                Ok([r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0])
            }
        }
    }

    fn world_normal(
        call: &DrawCall<'_>,
        first: usize,
        world: &Triangle,
        normal_matrix: &Matrix3<f32>,
    ) -> Option<Vector3<f32>> {
        match call.normals {
            Some(normals) => {
                let sum = normals[first..first + 3]
                    .iter()
                    .fold(Vector3::zeros(), |acc, n| acc + Vector3::from(*n));
                (normal_matrix * sum).try_normalize(1e-12)
            }
            None => {
                // Winding of the built-in tables is not consistent, so light
                // computed face normals from whichever side faces the viewer.
                let normal = world.calculate_normal()?;
                Some(if normal.z < 0.0 { -normal } else { normal })
            }
        }
    }

    fn rasterize_triangle(&mut self, coords: &[(f32, f32, f32); 3], character: char, color: Color) {
        let (v0, v1, v2) = (coords[0], coords[1], coords[2]);

        // Bounding box
        let min_x = v0.0.min(v1.0).min(v2.0).floor() as i32;
        let max_x = v0.0.max(v1.0).max(v2.0).ceil() as i32;
        let min_y = v0.1.min(v1.1).min(v2.1).floor() as i32;
        let max_y = v0.1.max(v1.1).max(v2.1).ceil() as i32;

        // Clip to screen bounds
        let min_x = min_x.max(0);
        let max_x = max_x.min(self.width as i32 - 1);
        let min_y = min_y.max(0);
        let max_y = max_y.min(self.height as i32 - 1);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let px = x as f32 + 0.5;
                let py = y as f32 + 0.5;

                let Some((w0, w1, w2)) =
                    barycentric((v0.0, v0.1), (v1.0, v1.1), (v2.0, v2.1), (px, py))
                else {
                    continue;
                };
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }

                let depth = w0 * v0.2 + w1 * v1.2 + w2 * v2.2;
                let idx = y as usize * self.width + x as usize;
                if depth < self.depth_buffer[idx] {
                    self.depth_buffer[idx] = depth;
                    self.char_buffer[idx] = character;
                    self.color_buffer[idx] = color;
                }
            }
        }
    }

    /// Write the frame to the terminal, starting at the current cursor position
    pub fn present<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.queue(SetBackgroundColor(self.clear_color))?;
        for y in 0..self.height {
            let mut current = None;
            for x in 0..self.width {
                let idx = y * self.width + x;
                let color = self.color_buffer[idx];
                if current != Some(color) {
                    writer.queue(SetForegroundColor(color))?;
                    current = Some(color);
                }
                writer.queue(Print(self.char_buffer[idx]))?;
            }
            if y + 1 < self.height {
                writer.queue(Print("\r\n"))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

impl RenderBackend for AsciiRenderer {
    type Error = RenderError;

    fn clear(&mut self) -> Result<(), RenderError> {
        self.depth_buffer.fill(f32::INFINITY);
        self.char_buffer.fill(' ');
        self.color_buffer.fill(Color::Reset);
        Ok(())
    }

    fn set_lighting(&mut self, lighting: &Lighting) -> Result<(), RenderError> {
        self.lighting = *lighting;
        Ok(())
    }

    fn draw(&mut self, call: &DrawCall<'_>) -> Result<(), RenderError> {
        let mvp = self.camera.view_projection() * call.model;
        let normal_matrix: Matrix3<f32> = call.model.fixed_view::<3, 3>(0, 0).clone_owned();

        for (t, corners) in call.positions.chunks_exact(3).enumerate() {
            let first = t * 3;

            let world = Triangle::new(
                transform(&call.model, corners[0]),
                transform(&call.model, corners[1]),
                transform(&call.model, corners[2]),
            );
            let normal = Self::world_normal(call, first, &world, &normal_matrix);
            let light = self.lighting.intensity(normal.as_ref());
            let brightness = self.lighting.brightness(normal.as_ref());

            let base = self.surface_color(call, first)?;
            let shaded = [
                base[0] * light[0],
                base[1] * light[1],
                base[2] * light[2],
            ];

            // Map brightness to character
            let char_index = (brightness * (LUMINOSITY_RAMP.len() - 1) as f32) as usize;
            let character = LUMINOSITY_RAMP[char_index.clamp(1, LUMINOSITY_RAMP.len() - 1)];

            let mut screen = [(0.0, 0.0, 0.0); 3];
            let mut visible = true;
            for (slot, corner) in screen.iter_mut().zip(corners) {
                match Camera::project_to_screen(
                    &Point3::from(*corner),
                    &mvp,
                    self.width as u32,
                    self.height as u32,
                ) {
                    Some(projected) => *slot = projected,
                    None => {
                        visible = false;
                        break;
                    }
                }
            }
            if visible {
                self.rasterize_triangle(&screen, character, to_terminal_color(shaded));
            }
        }
        Ok(())
    }

    fn upload_texture(&mut self, image: &TextureImage) -> Result<TextureHandle, RenderError> {
        if image.width == 0 || image.height == 0 {
            return Err(RenderError::EmptyTexture);
        }
        self.textures.push(image.clone());
        Ok(TextureHandle(self.textures.len() as u32 - 1))
    }
}

fn transform(model: &Matrix4<f32>, position: Position) -> Position {
    model.transform_point(&Point3::from(position)).into()
}

fn to_terminal_color(color: Rgb) -> Color {
    let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    Color::Rgb {
        r: channel(color[0]),
        g: channel(color[1]),
        b: channel(color[2]),
    }
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: (f32, f32),
    v1: (f32, f32),
    v2: (f32, f32),
    p: (f32, f32),
) -> Option<(f32, f32, f32)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}
