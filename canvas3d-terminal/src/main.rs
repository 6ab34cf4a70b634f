/// Canvas3D Terminal Editor
///
/// Edits a scene of cubes, pyramids and OBJ models rendered as ASCII art.
/// Controls:
///   - C/P: Add a cube / pyramid
///   - M: Add the next model given with --model
///   - Tab: Select the next object, X/Delete: remove it
///   - Arrows, PageUp/PageDown: Move the selected object
///   - I/K, J/L, U/O: Change rotation speed around X, Y, Z
///   - +/- or mouse wheel: Scale
///   - Space: Stop the animation, G: toggle the directional light
///   - Q/ESC: Quit
use std::fs::File;
use std::path::PathBuf;

use clap::Parser;
use env_logger::{Builder, Env, Target};

use canvas3d_core::{EditorConfig, SceneEditor};
use canvas3d_terminal::{AppError, TerminalApp};

#[derive(Parser, Debug, Clone)]
#[command(name = "canvas3d-terminal")]
#[command(about = "Terminal 3D scene editor", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding <name>.obj models and <name>.png textures
    #[arg(long)]
    models_dir: Option<PathBuf>,

    /// Model name to offer on the M key; may be repeated
    #[arg(long = "model")]
    models: Vec<String>,

    /// Write logs to this file; the terminal itself is used for drawing
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Seed for reproducible object placement
    #[arg(long)]
    seed: Option<u64>,
}

fn init_logging(log_file: Option<&PathBuf>) -> Result<(), AppError> {
    match log_file {
        Some(path) => {
            let file = File::create(path)?;
            Builder::from_env(Env::default().default_filter_or("info"))
                .target(Target::Pipe(Box::new(file)))
                .init();
        }
        // Log lines would corrupt the raw-mode screen
        None => Builder::from_env(Env::default().default_filter_or("off")).init(),
    }
    Ok(())
}

fn main() -> Result<(), AppError> {
    let args = Args::parse();
    init_logging(args.log_file.as_ref())?;

    let mut config = match &args.config {
        Some(path) => EditorConfig::load(path)?,
        None => EditorConfig::default(),
    };
    if let Some(dir) = args.models_dir {
        config.assets.models_dir = dir;
    }

    let editor = match args.seed {
        Some(seed) => SceneEditor::with_seed(config, seed)?,
        None => SceneEditor::new(config)?,
    };

    let mut app = TerminalApp::new(editor, args.models)?;
    app.run()?;

    println!("Thank you for using Canvas3D!");
    Ok(())
}
