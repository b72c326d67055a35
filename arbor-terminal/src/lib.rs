/// Terminal shell for the wisdom tree
use crossterm::{
    cursor,
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        MouseEvent, MouseEventKind,
    },
    execute, queue, terminal,
};
use std::cell::RefCell;
use std::io::{self, stdout, Write};
use std::rc::Rc;
use std::time::{Duration, Instant};

use arbor_core::viewport::bind_scroll;
use arbor_core::{
    Camera, LevelSpec, SceneLoader, ScrollViewport, TreeScene, WheelEvent, WheelRouter,
    WheelSubscription,
};

pub mod error;
pub mod overlay;
pub mod renderer;

pub use error::{AppError, AppResult};
pub use renderer::{AsciiRenderer, CELL_ASPECT};

/// Lines scrolled per wheel notch
pub const WHEEL_LINES: f32 = 3.0;

/// The terminal state changes the app makes around its main loop
trait Console {
    fn enable_raw_mode(&mut self) -> io::Result<()>;
    fn disable_raw_mode(&mut self) -> io::Result<()>;
    fn enter_screen(&mut self) -> io::Result<()>;
    fn leave_screen(&mut self) -> io::Result<()>;
}

struct Crossterm;

impl Console for Crossterm {
    fn enable_raw_mode(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()
    }

    fn disable_raw_mode(&mut self) -> io::Result<()> {
        terminal::disable_raw_mode()
    }

    fn enter_screen(&mut self) -> io::Result<()> {
        execute!(
            stdout(),
            terminal::EnterAlternateScreen,
            cursor::Hide,
            EnableMouseCapture
        )
    }

    fn leave_screen(&mut self) -> io::Result<()> {
        execute!(
            stdout(),
            DisableMouseCapture,
            terminal::LeaveAlternateScreen,
            cursor::Show
        )
    }
}

/// Raw mode, alternate screen and mouse capture for as long as it lives.
///
/// Dropping it restores the terminal on every exit path, including a failed
/// `enter`; `close` does the same but reports the failure.
struct TerminalSession<C: Console> {
    console: C,
    active: bool,
}

impl<C: Console> TerminalSession<C> {
    fn enter(mut console: C) -> AppResult<Self> {
        console.enable_raw_mode()?;
        let mut session = Self {
            console,
            active: true,
        };
        session.console.enter_screen()?;
        Ok(session)
    }

    /// Restore the terminal. An error in `result` wins over a cleanup error.
    fn close(mut self, result: AppResult<()>) -> AppResult<()> {
        self.active = false;
        let cleanup = self.leave();
        result.and(cleanup)
    }

    fn leave(&mut self) -> AppResult<()> {
        let raw = self.console.disable_raw_mode();
        self.console.leave_screen()?;
        raw?;
        Ok(())
    }
}

impl<C: Console> Drop for TerminalSession<C> {
    fn drop(&mut self) {
        if self.active {
            if let Err(err) = self.leave() {
                log::error!("failed to restore terminal: {}", err);
            }
        }
    }
}

/// Main application struct for the terminal shell
pub struct TerminalApp {
    loader: Option<SceneLoader>,
    scene: Option<TreeScene>,
    camera: Camera,
    renderer: AsciiRenderer,
    viewport: Rc<RefCell<ScrollViewport>>,
    wheel: WheelRouter,
    _scroll: WheelSubscription,
    running: bool,
    started: Instant,
    last_frame: Instant,
    frame_count: u32,
    fps: f32,
}

impl TerminalApp {
    pub fn new(levels: &[LevelSpec]) -> AppResult<Self> {
        let (width, height) = terminal::size()?;
        Self::with_size(levels, width, height)
    }

    /// Build the app for a canvas of the given size without touching the terminal
    pub fn with_size(levels: &[LevelSpec], width: u16, height: u16) -> AppResult<Self> {
        let loader = SceneLoader::new(levels)?;

        let mut camera = Camera::new(width as u32, height as u32);
        camera.set_aspect(width as f32 * CELL_ASPECT, height as f32);

        let viewport = Rc::new(RefCell::new(ScrollViewport::new(height as f32)));
        let wheel = WheelRouter::new();
        let scroll = bind_scroll(&wheel, viewport.clone());

        let now = Instant::now();
        Ok(Self {
            loader: Some(loader),
            scene: None,
            camera,
            renderer: AsciiRenderer::new(width as usize, height as usize),
            viewport,
            wheel,
            _scroll: scroll,
            running: true,
            started: now,
            last_frame: now,
            frame_count: 0,
            fps: 0.0,
        })
    }

    pub fn scene(&self) -> Option<&TreeScene> {
        self.scene.as_ref()
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn scroll_offset(&self) -> f32 {
        self.viewport.borrow().offset()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn run(&mut self) -> AppResult<()> {
        let session = TerminalSession::enter(Crossterm)?;
        let result = self.main_loop();
        session.close(result)
    }

    fn main_loop(&mut self) -> AppResult<()> {
        let target_frame_time = Duration::from_millis(1000 / 30); // 30 FPS target

        while self.running {
            let frame_start = Instant::now();

            // Handle input
            while event::poll(Duration::from_millis(0))? {
                let event = event::read()?;
                self.handle_event(event);
            }

            // Update
            self.update()?;

            // Render
            self.render()?;

            // Frame timing
            self.frame_count += 1;
            let elapsed = frame_start.elapsed();
            if elapsed < target_frame_time {
                std::thread::sleep(target_frame_time - elapsed);
            }

            // Update FPS counter
            let now = Instant::now();
            if (now - self.last_frame).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_frame).as_secs_f32();
                self.frame_count = 0;
                self.last_frame = now;
            }
        }

        Ok(())
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(KeyEvent {
                code: KeyCode::Char('q') | KeyCode::Esc,
                kind: KeyEventKind::Press,
                ..
            }) => {
                self.running = false;
            }
            Event::Mouse(MouseEvent { kind, .. }) => {
                let delta_y = match kind {
                    MouseEventKind::ScrollDown => WHEEL_LINES,
                    MouseEventKind::ScrollUp => -WHEEL_LINES,
                    _ => return,
                };
                self.wheel.dispatch(WheelEvent { delta_y });
            }
            Event::Resize(width, height) => self.resize(width, height),
            _ => {}
        }
    }

    fn resize(&mut self, width: u16, height: u16) {
        log::debug!("terminal resized to {}x{}", width, height);
        self.renderer.resize(width as usize, height as usize);
        self.camera.set_aspect(width as f32 * CELL_ASPECT, height as f32);
        self.viewport.borrow_mut().resize(height as f32);
    }

    /// Advance loading by one segment, or animate the finished scene
    pub fn update(&mut self) -> AppResult<()> {
        if let Some(loader) = self.loader.as_mut() {
            let progress = loader.step()?;
            log::debug!("loading {}/{}", progress.loaded, progress.total);
            if progress.is_complete() {
                if let Some(loader) = self.loader.take() {
                    let scene = loader.finish()?;
                    scene.mount_camera(&mut self.camera);
                    self.scene = Some(scene);
                    self.started = Instant::now();
                }
            }
            return Ok(());
        }

        if let Some(scene) = self.scene.as_mut() {
            scene.update(self.started.elapsed().as_secs_f32())?;
        }
        Ok(())
    }

    fn render(&mut self) -> AppResult<()> {
        self.renderer.clear();
        if let Some(scene) = &self.scene {
            self.renderer.render_scene(scene, &self.camera);
        }

        // Output to terminal
        let mut stdout = stdout();
        queue!(stdout, cursor::MoveTo(0, 0))?;
        self.renderer.draw(&mut stdout)?;

        let (width, height) = (
            self.renderer.width() as u16,
            self.renderer.height() as u16,
        );
        if let Some(loader) = &self.loader {
            overlay::draw_loader(&mut stdout, loader.progress(), width, height)?;
        }
        overlay::draw_instructions(&mut stdout, height)?;
        overlay::draw_status(&mut stdout, self.fps, &self.viewport.borrow())?;

        stdout.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::config::{CAMERA_POSITION, TREE_LEVELS};
    use crossterm::event::{KeyModifiers, MouseButton};
    use nalgebra::Point3;

    fn wheel(kind: MouseEventKind) -> Event {
        Event::Mouse(MouseEvent {
            kind,
            column: 0,
            row: 0,
            modifiers: KeyModifiers::NONE,
        })
    }

    fn loaded_app() -> TerminalApp {
        let mut app = TerminalApp::with_size(&TREE_LEVELS, 80, 40).unwrap();
        while app.scene().is_none() {
            app.update().unwrap();
        }
        app
    }

    #[test]
    fn test_loads_one_segment_per_update() {
        let mut app = TerminalApp::with_size(&TREE_LEVELS, 80, 40).unwrap();
        let mut updates = 0;
        while app.scene().is_none() {
            app.update().unwrap();
            updates += 1;
        }
        assert_eq!(updates, TREE_LEVELS.len());
        assert_eq!(app.scene().unwrap().segments().len(), TREE_LEVELS.len());
    }

    #[test]
    fn test_camera_mounted_when_ready() {
        let app = loaded_app();
        assert_eq!(app.camera().position, Point3::from(CAMERA_POSITION));
        assert_eq!(app.camera().target, Point3::new(0.0, 1.0, 0.0));
        assert!((app.camera().aspect - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_wheel_scrolls_viewport_not_camera() {
        let mut app = loaded_app();
        let before = app.camera().position;

        app.handle_event(wheel(MouseEventKind::ScrollDown));
        app.handle_event(wheel(MouseEventKind::ScrollDown));
        assert_eq!(app.scroll_offset(), 2.0 * WHEEL_LINES);

        app.handle_event(wheel(MouseEventKind::ScrollUp));
        assert_eq!(app.scroll_offset(), WHEEL_LINES);

        app.handle_event(wheel(MouseEventKind::Down(MouseButton::Left)));
        assert_eq!(app.scroll_offset(), WHEEL_LINES);
        assert_eq!(app.camera().position, before);
    }

    #[test]
    fn test_resize_clamps_scroll() {
        let mut app = loaded_app();
        for _ in 0..20 {
            app.handle_event(wheel(MouseEventKind::ScrollDown));
        }
        assert_eq!(app.scroll_offset(), 40.0);

        app.handle_event(Event::Resize(60, 10));
        assert_eq!(app.scroll_offset(), 10.0);
        assert!((app.camera().aspect - 3.0).abs() < 1e-6);
    }

    /// Records console calls; fails the ones named in `failing`
    #[derive(Default)]
    struct FakeConsole {
        calls: Rc<RefCell<Vec<&'static str>>>,
        failing: Vec<&'static str>,
    }

    impl FakeConsole {
        fn call(&mut self, name: &'static str) -> io::Result<()> {
            self.calls.borrow_mut().push(name);
            if self.failing.contains(&name) {
                return Err(io::Error::new(io::ErrorKind::Other, name));
            }
            Ok(())
        }
    }

    impl Console for FakeConsole {
        fn enable_raw_mode(&mut self) -> io::Result<()> {
            self.call("raw on")
        }

        fn disable_raw_mode(&mut self) -> io::Result<()> {
            self.call("raw off")
        }

        fn enter_screen(&mut self) -> io::Result<()> {
            self.call("enter")
        }

        fn leave_screen(&mut self) -> io::Result<()> {
            self.call("leave")
        }
    }

    fn io_message(err: AppError) -> String {
        match err {
            AppError::Io(err) => err.to_string(),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_failed_screen_entry_restores_raw_mode() {
        let console = FakeConsole {
            failing: vec!["enter"],
            ..Default::default()
        };
        let calls = console.calls.clone();
        assert!(TerminalSession::enter(console).is_err());
        assert_eq!(*calls.borrow(), ["raw on", "enter", "raw off", "leave"]);
    }

    #[test]
    fn test_loop_error_wins_over_cleanup_error() {
        let console = FakeConsole {
            failing: vec!["raw off"],
            ..Default::default()
        };
        let calls = console.calls.clone();
        let session = TerminalSession::enter(console).unwrap();
        let loop_error = Err(io::Error::new(io::ErrorKind::Other, "loop").into());
        assert_eq!(io_message(session.close(loop_error).unwrap_err()), "loop");
        // Restored exactly once, screen left even though raw mode failed.
        assert_eq!(*calls.borrow(), ["raw on", "enter", "raw off", "leave"]);
    }

    #[test]
    fn test_cleanup_error_reported_after_clean_loop() {
        let console = FakeConsole {
            failing: vec!["leave"],
            ..Default::default()
        };
        let session = TerminalSession::enter(console).unwrap();
        assert_eq!(io_message(session.close(Ok(())).unwrap_err()), "leave");
    }

    #[test]
    fn test_quit_keys() {
        let mut app = loaded_app();
        app.handle_event(Event::Key(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE)));
        assert!(app.is_running());
        app.handle_event(Event::Key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)));
        assert!(!app.is_running());
    }

    #[test]
    fn test_update_animates_leaves() {
        let mut app = loaded_app();
        let scene = app.scene().unwrap();
        let leaf_group = scene.segments()[0].nodes().leaf_group;
        let before = scene.graph().node(leaf_group).unwrap().transform.rotation;

        std::thread::sleep(Duration::from_millis(20));
        app.update().unwrap();
        let after = app
            .scene()
            .unwrap()
            .graph()
            .node(leaf_group)
            .unwrap()
            .transform
            .rotation;
        assert_ne!(before.z, after.z);
    }
}
