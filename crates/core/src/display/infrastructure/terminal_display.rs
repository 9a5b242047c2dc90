use std::collections::BTreeMap;
use std::io::{self, BufWriter, Stdout, Write};
use std::time::{Duration, Instant};

use crossterm::{
    cursor,
    event::{self, Event, KeyEventKind},
    queue,
    style::{self, Color},
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};

use crate::display::domain::display_backend::{DisplayBackend, WindowHandle};
use crate::shared::frame::Frame;

/// Upper half block: foreground paints the top pixel, background the bottom.
const HALF_BLOCK: char = '\u{2580}';

/// Previews frames in the terminal using 24-bit colored half blocks.
///
/// Windows are laid out side by side in the alternate screen, each under a
/// one-line title. The terminal is in raw mode while any window exists, so
/// every key press (Ctrl-C included) reaches `wait_for_cancel`.
pub struct TerminalDisplay {
    out: BufWriter<Stdout>,
    windows: BTreeMap<u32, String>,
    next_id: u32,
    active: bool,
}

impl TerminalDisplay {
    pub fn new() -> Self {
        Self {
            out: BufWriter::with_capacity(1 << 20, io::stdout()),
            windows: BTreeMap::new(),
            next_id: 0,
            active: false,
        }
    }

    fn enter(&mut self) -> io::Result<()> {
        if self.active {
            return Ok(());
        }
        terminal::enable_raw_mode()?;
        self.out.execute(EnterAlternateScreen)?;
        self.out.execute(cursor::Hide)?;
        self.active = true;
        Ok(())
    }

    fn leave(&mut self) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        self.out.execute(cursor::Show)?;
        self.out.execute(LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    fn slot_of(&self, id: u32) -> Option<usize> {
        self.windows.keys().position(|k| *k == id)
    }

    /// Draws an RGB frame into the window's slot.
    fn draw(&mut self, slot: usize, title: &str, rgb: &Frame) -> io::Result<()> {
        let (cols, rows) = terminal::size()?;
        let slots = self.windows.len().max(1) as u16;
        let slot_width = cols / slots;
        let origin_x = slot_width * slot as u16;
        let layout = fit(rgb.width(), rgb.height(), slot_width, rows.saturating_sub(1));

        queue!(
            self.out,
            style::ResetColor,
            cursor::MoveTo(origin_x, 0),
            style::Print(truncate(title, slot_width as usize))
        )?;

        let Some((cells_w, cells_h)) = layout else {
            return self.out.flush();
        };

        let pixels = rgb.as_ndarray();
        let pixel = |x: u16, y: u16| -> Color {
            let px = (x as u64 * rgb.width() as u64 / cells_w as u64) as usize;
            let py = (y as u64 * rgb.height() as u64 / (cells_h as u64 * 2)) as usize;
            Color::Rgb {
                r: pixels[[py, px, 0]],
                g: pixels[[py, px, 1]],
                b: pixels[[py, px, 2]],
            }
        };

        for row in 0..cells_h {
            queue!(self.out, cursor::MoveTo(origin_x, row + 1))?;
            for col in 0..cells_w {
                queue!(
                    self.out,
                    style::SetForegroundColor(pixel(col, row * 2)),
                    style::SetBackgroundColor(pixel(col, row * 2 + 1)),
                    style::Print(HALF_BLOCK)
                )?;
            }
        }
        queue!(self.out, style::ResetColor)?;
        self.out.flush()
    }
}

impl Default for TerminalDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TerminalDisplay {
    fn drop(&mut self) {
        let _ = self.leave();
    }
}

impl DisplayBackend for TerminalDisplay {
    fn create_window(&mut self, name: &str) -> Result<WindowHandle, Box<dyn std::error::Error>> {
        self.enter()?;
        let id = self.next_id;
        self.next_id += 1;
        self.windows.insert(id, name.to_string());
        self.out.execute(terminal::Clear(terminal::ClearType::All))?;
        Ok(WindowHandle::new(id, name))
    }

    fn show(
        &mut self,
        window: &WindowHandle,
        frame: &Frame,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if frame.is_empty() {
            return Ok(());
        }
        let rgb = frame.to_rgb()?;
        let slot = self
            .slot_of(window.id())
            .ok_or_else(|| format!("window '{}' does not exist", window.name()))?;
        self.draw(slot, window.name(), &rgb)?;
        Ok(())
    }

    fn destroy_window(&mut self, window: WindowHandle) {
        if self.windows.remove(&window.id()).is_none() {
            return;
        }
        let result = if self.windows.is_empty() {
            self.leave()
        } else {
            self.out
                .execute(terminal::Clear(terminal::ClearType::All))
                .map(|_| ())
        };
        if let Err(e) = result {
            log::warn!("Failed to update terminal after closing '{}': {e}", window.name());
        }
    }

    fn wait_for_cancel(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match event::poll(remaining) {
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => return true,
                    Ok(_) => {}
                    Err(e) => {
                        log::warn!("Failed to read terminal event: {e}");
                        return false;
                    }
                },
                Ok(false) => return false,
                Err(e) => {
                    log::warn!("Failed to poll terminal events: {e}");
                    std::thread::sleep(remaining);
                    return false;
                }
            }
            if Instant::now() >= deadline {
                return false;
            }
        }
    }
}

/// Largest cell grid that fits `max_cols` x `max_rows` while keeping the
/// frame's aspect ratio. One cell covers one pixel column and two rows.
fn fit(width: u32, height: u32, max_cols: u16, max_rows: u16) -> Option<(u16, u16)> {
    if width == 0 || height == 0 || max_cols == 0 || max_rows == 0 {
        return None;
    }
    let scale = f64::min(
        max_cols as f64 / width as f64,
        (max_rows as f64 * 2.0) / height as f64,
    );
    let cols = ((width as f64 * scale).floor() as u16).clamp(1, max_cols);
    let rows = ((height as f64 * scale / 2.0).floor() as u16).clamp(1, max_rows);
    Some((cols, rows))
}

fn truncate(title: &str, width: usize) -> String {
    title.chars().take(width).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::wide_frame(640, 480, 80, 24, Some((64, 24)))]
    #[case::tall_slot(100, 100, 40, 100, Some((40, 20)))]
    #[case::tiny_frame(2, 2, 80, 24, Some((48, 24)))]
    #[case::empty_frame(0, 480, 80, 24, None)]
    #[case::no_space(640, 480, 80, 0, None)]
    fn test_fit_keeps_aspect_within_bounds(
        #[case] w: u32,
        #[case] h: u32,
        #[case] cols: u16,
        #[case] rows: u16,
        #[case] expected: Option<(u16, u16)>,
    ) {
        assert_eq!(fit(w, h, cols, rows), expected);
    }

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate("Input Video", 5), "Input");
        assert_eq!(truncate("Ünï", 2), "Ün");
        assert_eq!(truncate("ok", 10), "ok");
    }

    #[test]
    fn test_unknown_window_is_rejected_before_touching_terminal() {
        let mut display = TerminalDisplay::new();
        let stray = WindowHandle::new(7, "stray");
        assert!(display
            .show(&stray, &Frame::filled(2, 2, [0, 0, 0], 0))
            .is_err());
        display.destroy_window(stray);
    }

    #[test]
    fn test_unsupported_frame_is_rejected_before_drawing() {
        let mut display = TerminalDisplay::new();
        let window = WindowHandle::new(0, "Output");
        let rgba = Frame::new(vec![0; 2 * 2 * 4], 2, 2, 4, 0);
        let err = display.show(&window, &rgba).unwrap_err();
        assert!(err.to_string().contains("channel count 4"));
    }
}
