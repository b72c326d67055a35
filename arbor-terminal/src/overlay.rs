//! Text drawn over the canvas: loader, instructions and status line
use crossterm::{
    cursor, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
};
use std::io::Write;

use arbor_core::config::INSTRUCTIONS;
use arbor_core::{LoadProgress, ScrollViewport};

const BAR_WIDTH: usize = 30;

/// `[#########---------]  50%`
pub fn loading_bar(progress: LoadProgress, width: usize) -> String {
    let filled = width * progress.percent() as usize / 100;
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        "-".repeat(width - filled),
        progress.percent()
    )
}

/// Centered progress bar shown until the scene is ready
pub fn draw_loader<W: Write>(
    writer: &mut W,
    progress: LoadProgress,
    width: u16,
    height: u16,
) -> std::io::Result<()> {
    let bar = loading_bar(progress, BAR_WIDTH);
    let x = (width as usize).saturating_sub(bar.len()) / 2;
    queue!(
        writer,
        cursor::MoveTo(x as u16, height / 2),
        SetForegroundColor(Color::White),
        SetBackgroundColor(Color::Black),
        Print(bar),
        ResetColor
    )
}

/// Instruction text pinned to the bottom-left corner
pub fn draw_instructions<W: Write>(writer: &mut W, height: u16) -> std::io::Result<()> {
    queue!(
        writer,
        cursor::MoveTo(1, height.saturating_sub(1)),
        SetForegroundColor(Color::White),
        SetBackgroundColor(Color::Black),
        Print(INSTRUCTIONS),
        ResetColor
    )
}

pub fn status_line(fps: f32, viewport: &ScrollViewport) -> String {
    format!(
        "Arbor | FPS: {:.1} | Scroll: {:.0}/{:.0} | Wheel=Scroll Q=Quit",
        fps,
        viewport.offset(),
        viewport.max_offset()
    )
}

pub fn draw_status<W: Write>(
    writer: &mut W,
    fps: f32,
    viewport: &ScrollViewport,
) -> std::io::Result<()> {
    queue!(
        writer,
        cursor::MoveTo(0, 0),
        SetForegroundColor(Color::Yellow),
        SetBackgroundColor(Color::Black),
        Print(status_line(fps, viewport)),
        ResetColor
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loading_bar_fill() {
        let half = LoadProgress { loaded: 1, total: 2 };
        assert_eq!(loading_bar(half, 10), "[#####-----]  50%");

        let done = LoadProgress { loaded: 7, total: 7 };
        assert_eq!(loading_bar(done, 4), "[####] 100%");

        let none = LoadProgress { loaded: 0, total: 7 };
        assert_eq!(loading_bar(none, 4), "[----]   0%");
    }

    #[test]
    fn test_status_line_reports_scroll() {
        let mut viewport = ScrollViewport::new(40.0);
        viewport.scroll_by(12.0);
        let line = status_line(29.96, &viewport);
        assert!(line.contains("FPS: 30.0"));
        assert!(line.contains("Scroll: 12/40"));
    }

    #[test]
    fn test_instructions_land_bottom_left() {
        let mut out = Vec::new();
        draw_instructions(&mut out, 24).unwrap();
        let text = String::from_utf8_lossy(&out);
        // CSI row;col H, 1-based
        assert!(text.contains("\x1b[24;2H"));
        assert!(text.contains(INSTRUCTIONS));
    }
}
