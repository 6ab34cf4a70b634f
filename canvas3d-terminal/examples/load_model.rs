/// Example: Load an OBJ or STL file and edit it in the terminal
///
/// Usage: cargo run --example load_model -- path/to/model.stl [texture.png]
use std::env;
use std::path::{Path, PathBuf};

use canvas3d_core::{loader, EditorConfig, PrimitiveKind, SceneEditor, TextureSource};
use canvas3d_terminal::{AppError, TerminalApp};

fn main() -> Result<(), AppError> {
    let args: Vec<String> = env::args().collect();
    let mut editor = SceneEditor::new(EditorConfig::default())?;

    if args.len() < 2 {
        eprintln!("Usage: {} <model-file> [texture]", args[0]);
        eprintln!("\nNo model provided, starting with a cube...");
        editor.add_primitive(PrimitiveKind::Cube)?;
    } else {
        let path = Path::new(&args[1]);
        println!("Loading model: {}", path.display());

        let mesh = loader::load_mesh(path).map_err(canvas3d_core::SceneError::from)?;
        println!("Loaded {} triangles", mesh.triangle_count());

        let texture = match args.get(2) {
            Some(texture) => TextureSource::File(PathBuf::from(texture)),
            None => TextureSource::None,
        };
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".to_string());
        editor.add_model(&name, mesh, texture)?;
    }

    println!("Starting terminal editor (press Q to quit)...");
    std::thread::sleep(std::time::Duration::from_secs(1));

    let mut app = TerminalApp::new(editor, Vec::new())?;
    app.run()
}
