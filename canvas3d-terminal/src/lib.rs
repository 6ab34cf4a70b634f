/// Terminal host for the scene editor
use crossterm::{
    cursor,
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        MouseEvent, MouseEventKind,
    },
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, ClearType},
};
use log::{info, warn};
use std::io::{self, stdout, Write};
use std::time::{Duration, Instant};
use thiserror::Error;

use canvas3d_core::{
    ConfigError, DirectionalLight, Lighting, Nudge, PrimitiveKind, SceneEditor, SceneError,
};

pub mod renderer;

pub use renderer::AsciiRenderer;

/// Rows reserved below the viewport for the status bar
const STATUS_ROWS: u16 = 1;

const HELP: &str =
    "c/p add  m model  Tab select  x remove  arrows/PgUp/PgDn move  ijkluo spin  +/- scale  space stop  g light  q quit";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("terminal error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Scene(#[from] SceneError),
}

/// Main application struct for the terminal editor
pub struct TerminalApp {
    editor: SceneEditor,
    renderer: AsciiRenderer,
    models: Vec<String>,
    next_model: usize,
    sun: DirectionalLight,
    running: bool,
    status: String,
    last_sample: Instant,
    frame_count: u32,
    fps: f32,
}

impl TerminalApp {
    /// Create an app sized to the current terminal
    pub fn new(editor: SceneEditor, models: Vec<String>) -> Result<Self, AppError> {
        let (width, height) = terminal::size()?;
        Ok(Self::with_size(editor, models, width, height))
    }

    pub fn with_size(editor: SceneEditor, models: Vec<String>, width: u16, height: u16) -> Self {
        let lighting_config = &editor.config().lighting;
        let sun = DirectionalLight::new(
            lighting_config.directional_color,
            lighting_config.directional_direction.into(),
        );
        let mut renderer = AsciiRenderer::new(
            width as usize,
            height.saturating_sub(STATUS_ROWS) as usize,
        );
        renderer.set_clear_color(editor.config().render.clear_color);

        Self {
            editor,
            renderer,
            models,
            next_model: 0,
            sun,
            running: true,
            status: String::new(),
            last_sample: Instant::now(),
            frame_count: 0,
            fps: 0.0,
        }
    }

    pub fn editor(&self) -> &SceneEditor {
        &self.editor
    }

    pub fn renderer(&self) -> &AsciiRenderer {
        &self.renderer
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn run(&mut self) -> Result<(), AppError> {
        terminal::enable_raw_mode()?;
        execute!(
            stdout(),
            terminal::EnterAlternateScreen,
            EnableMouseCapture,
            cursor::Hide
        )?;

        let result = self.main_loop();

        // Cleanup
        terminal::disable_raw_mode()?;
        execute!(
            stdout(),
            DisableMouseCapture,
            terminal::LeaveAlternateScreen,
            cursor::Show
        )?;

        result
    }

    fn main_loop(&mut self) -> Result<(), AppError> {
        let fps = self.editor.config().render.target_fps.max(1);
        let target_frame_time = Duration::from_secs(1) / fps;
        let mut stdout = stdout();

        while self.running {
            let frame_start = Instant::now();

            // Drain input so edits land between frames
            while event::poll(Duration::from_millis(0))? {
                self.handle_event(event::read()?);
            }
            if !self.running {
                break;
            }

            self.render(&mut stdout)?;

            // Frame timing
            self.frame_count += 1;
            let elapsed = frame_start.elapsed();
            if elapsed < target_frame_time {
                std::thread::sleep(target_frame_time - elapsed);
            }

            let now = Instant::now();
            if (now - self.last_sample).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_sample).as_secs_f32();
                self.frame_count = 0;
                self.last_sample = now;
            }
        }

        Ok(())
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) => self.handle_key(key),
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            Event::Resize(width, height) => {
                self.renderer
                    .resize(width as usize, height.saturating_sub(STATUS_ROWS) as usize);
            }
            _ => {}
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        let input = self.editor.config().input.clone();
        let (step, spin) = (input.translate_step, input.rotate_step);

        let result = match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.running = false;
                Ok(())
            }
            KeyCode::Char('c') => self.add_primitive(PrimitiveKind::Cube),
            KeyCode::Char('p') => self.add_primitive(PrimitiveKind::Pyramid),
            KeyCode::Char('m') => self.add_next_model(),
            KeyCode::Tab => {
                self.editor.select_next();
                Ok(())
            }
            KeyCode::Char('x') | KeyCode::Delete => self.remove_selected(),
            KeyCode::Left => self.editor.nudge_selected(&Nudge::translate(-step, 0.0, 0.0)),
            KeyCode::Right => self.editor.nudge_selected(&Nudge::translate(step, 0.0, 0.0)),
            KeyCode::Up => self.editor.nudge_selected(&Nudge::translate(0.0, step, 0.0)),
            KeyCode::Down => self.editor.nudge_selected(&Nudge::translate(0.0, -step, 0.0)),
            KeyCode::PageUp => self.editor.nudge_selected(&Nudge::translate(0.0, 0.0, step)),
            KeyCode::PageDown => self.editor.nudge_selected(&Nudge::translate(0.0, 0.0, -step)),
            KeyCode::Char('i') => self.editor.nudge_selected(&Nudge::spin(spin, 0.0, 0.0)),
            KeyCode::Char('k') => self.editor.nudge_selected(&Nudge::spin(-spin, 0.0, 0.0)),
            KeyCode::Char('l') => self.editor.nudge_selected(&Nudge::spin(0.0, spin, 0.0)),
            KeyCode::Char('j') => self.editor.nudge_selected(&Nudge::spin(0.0, -spin, 0.0)),
            KeyCode::Char('o') => self.editor.nudge_selected(&Nudge::spin(0.0, 0.0, spin)),
            KeyCode::Char('u') => self.editor.nudge_selected(&Nudge::spin(0.0, 0.0, -spin)),
            KeyCode::Char('+') | KeyCode::Char('=') => {
                self.editor.nudge_selected(&Nudge::scale(input.scale_step))
            }
            KeyCode::Char('-') => self.editor.nudge_selected(&Nudge::scale(-input.scale_step)),
            KeyCode::Char(' ') => self.stop_selected(),
            KeyCode::Char('g') => {
                self.toggle_directional_light();
                Ok(())
            }
            _ => Ok(()),
        };
        self.report(result);
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        let step = self.editor.config().input.scale_step;
        let result = match mouse.kind {
            MouseEventKind::ScrollUp => self.editor.nudge_selected(&Nudge::scale(step)),
            MouseEventKind::ScrollDown => self.editor.nudge_selected(&Nudge::scale(-step)),
            _ => Ok(()),
        };
        self.report(result);
    }

    fn report(&mut self, result: Result<(), SceneError>) {
        if let Err(e) = result {
            warn!("{}", e);
            self.status = e.to_string();
        }
    }

    fn add_primitive(&mut self, kind: PrimitiveKind) -> Result<(), SceneError> {
        let index = self.editor.add_primitive(kind)?;
        self.status = format!("added {}", self.editor.get(index)?.label(index));
        Ok(())
    }

    fn add_next_model(&mut self) -> Result<(), SceneError> {
        if self.models.is_empty() {
            self.status = "no models given on the command line".to_string();
            return Ok(());
        }
        let name = self.models[self.next_model % self.models.len()].clone();
        self.next_model += 1;
        let index = self.editor.load_model(&name)?;
        self.status = format!("added {}", self.editor.get(index)?.label(index));
        Ok(())
    }

    fn remove_selected(&mut self) -> Result<(), SceneError> {
        let index = self.editor.selected().ok_or(SceneError::NoSelection)?;
        let removed = self.editor.remove_at(index)?;
        self.status = format!("removed {}", removed.label(index));
        Ok(())
    }

    fn stop_selected(&mut self) -> Result<(), SceneError> {
        let index = self.editor.selected().ok_or(SceneError::NoSelection)?;
        self.editor.stop_animation(index)
    }

    fn toggle_directional_light(&mut self) {
        let lighting = *self.editor.lighting();
        let directional = match lighting.directional {
            Some(_) => None,
            None => Some(self.sun),
        };
        info!(
            "directional light {}",
            if directional.is_some() { "on" } else { "off" }
        );
        self.editor.set_lighting(Lighting {
            directional,
            ..lighting
        });
    }

    /// Advance one frame and write it, with the status bar, to `out`
    pub fn render<W: Write>(&mut self, out: &mut W) -> Result<(), AppError> {
        match self.editor.frame(&mut self.renderer) {
            Ok(stats) if stats.failed > 0 => {
                self.status = format!("{} object(s) failed to draw", stats.failed);
            }
            Ok(_) => {}
            Err(e) => {
                warn!("frame skipped: {}", e);
                self.status = e.to_string();
            }
        }

        queue!(out, cursor::MoveTo(0, 0))?;
        self.renderer.present(out)?;

        // Status bar
        let selected = self
            .editor
            .selected()
            .and_then(|index| self.editor.get(index).ok().map(|o| o.label(index)))
            .unwrap_or_else(|| "none".to_string());
        let line = format!(
            "Canvas3D | FPS {:.1} | {} objects | selected: {} | {} | {}",
            self.fps,
            self.editor.len(),
            selected,
            self.status,
            HELP
        );
        let width = self.renderer.width();
        let line: String = line.chars().take(width).collect();
        queue!(
            out,
            cursor::MoveTo(0, self.renderer.height() as u16),
            terminal::Clear(ClearType::CurrentLine),
            SetBackgroundColor(Color::Black),
            SetForegroundColor(Color::Yellow),
            Print(line),
            ResetColor
        )?;

        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use canvas3d_core::EditorConfig;
    use crossterm::event::{KeyModifiers, MouseEvent};

    fn app() -> TerminalApp {
        let editor = SceneEditor::with_seed(EditorConfig::default(), 7).unwrap();
        TerminalApp::with_size(editor, Vec::new(), 80, 25)
    }

    fn press(app: &mut TerminalApp, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    #[test]
    fn test_add_select_remove() {
        let mut app = app();
        press(&mut app, KeyCode::Char('c'));
        press(&mut app, KeyCode::Char('p'));
        assert_eq!(app.editor().len(), 2);
        assert_eq!(app.editor().selected(), Some(1));
        assert_eq!(app.status(), "added pyramid #1");

        press(&mut app, KeyCode::Tab);
        assert_eq!(app.editor().selected(), Some(0));

        press(&mut app, KeyCode::Char('x'));
        assert_eq!(app.editor().len(), 1);
        assert_eq!(app.editor().registry().labels(), vec!["pyramid #0".to_string()]);
        assert_eq!(app.status(), "removed cube #0");
    }

    #[test]
    fn test_nudges_selected_object() {
        let mut app = app();
        press(&mut app, KeyCode::Char('c'));
        let before = app.editor().get(0).unwrap().transform.clone();

        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::PageUp);
        press(&mut app, KeyCode::Char('i'));
        press(&mut app, KeyCode::Char('+'));

        let after = &app.editor().get(0).unwrap().transform;
        assert_relative_eq!(after.translation.x, before.translation.x + 0.5);
        assert_relative_eq!(after.translation.z, before.translation.z + 0.5);
        assert_relative_eq!(after.rotation_velocity.x, 0.01);
        assert_relative_eq!(after.scale(), before.scale() + 0.01, epsilon = 1e-6);

        app.handle_mouse(MouseEvent {
            kind: MouseEventKind::ScrollDown,
            column: 0,
            row: 0,
            modifiers: KeyModifiers::NONE,
        });
        let scrolled = &app.editor().get(0).unwrap().transform;
        assert_relative_eq!(scrolled.scale(), before.scale(), epsilon = 1e-6);

        press(&mut app, KeyCode::Char(' '));
        assert!(app.editor().get(0).unwrap().transform.rotation_velocity.is_zero());
    }

    #[test]
    fn test_errors_go_to_status() {
        let mut app = app();
        press(&mut app, KeyCode::Left);
        assert_eq!(app.status(), "no object is selected");

        press(&mut app, KeyCode::Char('m'));
        assert_eq!(app.status(), "no models given on the command line");

        // 0.1 - 0.01 * 10 reaches zero and is rejected
        press(&mut app, KeyCode::Char('c'));
        for _ in 0..12 {
            press(&mut app, KeyCode::Char('-'));
        }
        assert!(app.status().starts_with("scale must be a positive"));
        assert!(app.editor().get(0).unwrap().transform.scale() > 0.0);
    }

    #[test]
    fn test_toggle_light_and_quit() {
        let mut app = app();
        assert!(app.editor().lighting().directional.is_some());
        press(&mut app, KeyCode::Char('g'));
        assert!(app.editor().lighting().directional.is_none());
        press(&mut app, KeyCode::Char('g'));
        assert_eq!(*app.editor().lighting(), Lighting::default());

        app.handle_key(KeyEvent::new_with_kind(
            KeyCode::Char('q'),
            KeyModifiers::NONE,
            KeyEventKind::Release,
        ));
        assert!(app.is_running());
        press(&mut app, KeyCode::Esc);
        assert!(!app.is_running());
    }

    #[test]
    fn test_render_writes_frame() {
        let mut app = app();
        press(&mut app, KeyCode::Char('c'));
        let mut out = Vec::new();
        app.render(&mut out).unwrap();

        assert!(!out.is_empty());
        assert_eq!(app.renderer().height(), 24);
        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("Canvas3D"));
        assert!(text.contains("selected: cube #0"));
    }
}
