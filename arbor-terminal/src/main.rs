/// Arbor Terminal - the wisdom tree in ASCII
///
/// Renders the seven-level tree into the terminal with the same scene the
/// web shell uses.
/// Controls:
///   - Mouse wheel: Scroll the content
///   - Q/ESC: Quit
use env_logger::Env;

use arbor_core::config::TREE_LEVELS;
use arbor_terminal::{AppError, TerminalApp};

fn main() -> Result<(), AppError> {
    // The canvas owns the terminal while running; keep the log quiet by default.
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    println!("Arbor Terminal - Loading...");
    log::info!("starting with {} levels", TREE_LEVELS.len());

    let mut app = TerminalApp::new(&TREE_LEVELS)?;
    app.run()?;

    println!("Thank you for visiting the wisdom tree!");
    Ok(())
}
