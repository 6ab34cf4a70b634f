/// Mesh and texture loading.
///
/// Meshes are loaded up front; textures are decoded by futures running on a
/// single-threaded cooperative pool and delivered as completions that the
/// editor attaches between frames.
use std::fs;
use std::path::{Path, PathBuf};

use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures::executor::LocalPool;
use futures::task::LocalSpawnExt;
use log::{debug, info, warn};

use crate::error::LoadError;
use crate::geometry::Mesh;
use crate::obj::parse_obj;
use crate::resource::{LoadTicket, TextureImage};
use crate::stl::parse_stl;

/// Mesh file formats understood by [`load_mesh`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshFormat {
    Obj,
    Stl,
}

impl MeshFormat {
    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "obj" => Ok(MeshFormat::Obj),
            "stl" => Ok(MeshFormat::Stl),
            _ => Err(LoadError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

fn read(path: &Path) -> Result<Vec<u8>, LoadError> {
    fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse in-memory mesh data of a known format
pub fn parse_mesh(data: &[u8], format: MeshFormat, path: &Path) -> Result<Mesh, LoadError> {
    let parsed = match format {
        MeshFormat::Obj => parse_obj(&String::from_utf8_lossy(data)),
        MeshFormat::Stl => parse_stl(data),
    };
    let mesh = parsed.map_err(|source| LoadError::Mesh {
        path: path.to_path_buf(),
        source,
    })?;
    if mesh.is_empty() {
        return Err(LoadError::EmptyMesh);
    }
    Ok(mesh)
}

/// Load a mesh file, picking the parser from its extension
pub fn load_mesh(path: &Path) -> Result<Mesh, LoadError> {
    let format = MeshFormat::from_path(path)?;
    let mesh = parse_mesh(&read(path)?, format, path)?;
    info!(
        "loaded {} ({} triangles)",
        path.display(),
        mesh.triangle_count()
    );
    Ok(mesh)
}

/// Decode an encoded image (PNG, JPEG) into RGBA8
pub fn decode_texture(data: &[u8]) -> Result<TextureImage, LoadError> {
    let image = image::load_from_memory(data)?.to_rgba8();
    Ok(TextureImage {
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
    })
}

/// Read and decode a texture file
pub async fn read_texture(path: PathBuf) -> Result<TextureImage, LoadError> {
    let data = read(&path)?;
    decode_texture(&data)
}

/// A finished texture load
#[derive(Debug)]
pub struct TextureCompletion {
    pub ticket: LoadTicket,
    pub result: Result<TextureImage, LoadError>,
}

/// Cooperative queue of in-flight texture loads.
///
/// Nothing runs until [`LoadQueue::poll_completed`] is called, so loads only
/// make progress between frames.
pub struct LoadQueue {
    pool: LocalPool,
    sender: UnboundedSender<TextureCompletion>,
    receiver: UnboundedReceiver<TextureCompletion>,
    next_ticket: u64,
    in_flight: usize,
}

impl LoadQueue {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded();
        Self {
            pool: LocalPool::new(),
            sender,
            receiver,
            next_ticket: 0,
            in_flight: 0,
        }
    }

    pub fn issue_ticket(&mut self) -> LoadTicket {
        self.next_ticket += 1;
        LoadTicket(self.next_ticket)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Queue a texture file load for `ticket`
    pub fn spawn_texture_file(&mut self, ticket: LoadTicket, path: PathBuf) {
        debug!("queued texture {} for {}", path.display(), ticket);
        let sender = self.sender.clone();
        let task = async move {
            let result = read_texture(path).await;
            // The receiver lives as long as the queue itself
            let _ = sender.unbounded_send(TextureCompletion { ticket, result });
        };

        match self.pool.spawner().spawn_local(task) {
            Ok(()) => self.in_flight += 1,
            Err(e) => warn!("could not schedule texture load {}: {}", ticket, e),
        }
    }

    /// Run queued loads until they stall and collect every finished one
    pub fn poll_completed(&mut self) -> Vec<TextureCompletion> {
        self.pool.run_until_stalled();

        let mut completed = Vec::new();
        while let Ok(Some(completion)) = self.receiver.try_next() {
            completed.push(completion);
        }
        self.in_flight = self.in_flight.saturating_sub(completed.len());
        completed
    }
}

impl Default for LoadQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(color: [u8; 4]) -> Vec<u8> {
        let image = RgbaImage::from_pixel(2, 2, Rgba(color));
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(MeshFormat::from_path(Path::new("a/b.OBJ")).unwrap(), MeshFormat::Obj);
        assert_eq!(MeshFormat::from_path(Path::new("part.stl")).unwrap(), MeshFormat::Stl);
        assert!(matches!(
            MeshFormat::from_path(Path::new("scene.fbx")),
            Err(LoadError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_load_mesh_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tri.obj");
        fs::write(&path, "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();

        let mesh = load_mesh(&path).unwrap();
        assert_eq!(mesh.triangle_count(), 1);

        let empty = dir.path().join("empty.obj");
        fs::write(&empty, "v 0 0 0\n").unwrap();
        assert!(matches!(load_mesh(&empty), Err(LoadError::EmptyMesh)));

        assert!(matches!(
            load_mesh(&dir.path().join("missing.obj")),
            Err(LoadError::Io { .. })
        ));
    }

    #[test]
    fn test_decode_texture() {
        let image = decode_texture(&png_bytes([10, 20, 30, 255])).unwrap();
        assert_eq!((image.width, image.height), (2, 2));
        assert_eq!(&image.rgba[0..4], &[10, 20, 30, 255]);
        assert!(decode_texture(b"not an image").is_err());
    }

    #[test]
    fn test_queue_delivers_completions() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.png");
        fs::write(&good, png_bytes([255, 0, 0, 255])).unwrap();

        let mut queue = LoadQueue::new();
        let first = queue.issue_ticket();
        let second = queue.issue_ticket();
        assert_ne!(first, second);

        queue.spawn_texture_file(first, good);
        queue.spawn_texture_file(second, dir.path().join("missing.png"));
        assert_eq!(queue.in_flight(), 2);

        let mut completed = queue.poll_completed();
        completed.sort_by_key(|c| c.ticket.0);
        assert_eq!(completed.len(), 2);
        assert!(completed[0].result.is_ok());
        assert!(matches!(completed[1].result, Err(LoadError::Io { .. })));
        assert_eq!(queue.in_flight(), 0);
        assert!(queue.poll_completed().is_empty());
    }
}
