/// Asynchronously attached resources and their handles
use std::fmt;

/// Loading state of a resource attached to a scene object
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceState<T> {
    Loading,
    Ready(T),
    Failed(String),
}

impl<T> ResourceState<T> {
    pub fn is_failed(&self) -> bool {
        matches!(self, ResourceState::Failed(_))
    }
}

/// Token routing an asynchronous load completion back to the object that
/// requested it. Independent of the object's registry position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadTicket(pub u64);

impl fmt::Display for LoadTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "load#{}", self.0)
    }
}

/// Opaque handle to a texture uploaded by a render backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

/// Decoded RGBA8 image ready for upload
#[derive(Debug, Clone, PartialEq)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl TextureImage {
    /// Solid single-color image, used for placeholder textures
    pub fn solid(width: u32, height: u32, color: [u8; 4]) -> Self {
        let rgba = color
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self { width, height, rgba }
    }

    /// Sample the texel at texture coordinate `(u, v)` with repeat wrapping.
    ///
    /// `v = 0` is the bottom row, matching OpenGL conventions.
    pub fn sample(&self, u: f32, v: f32) -> [u8; 4] {
        if self.width == 0 || self.height == 0 {
            return [0, 0, 0, 255];
        }
        let u = u - u.floor();
        let v = v - v.floor();
        let x = ((u * self.width as f32) as u32).min(self.width - 1);
        let y = (((1.0 - v) * self.height as f32) as u32).min(self.height - 1);
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        match self.rgba.get(offset..offset + 4) {
            Some(texel) => [texel[0], texel[1], texel[2], texel[3]],
            None => [0, 0, 0, 255],
        }
    }
}
