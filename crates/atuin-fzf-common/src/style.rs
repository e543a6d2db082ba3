//! ANSI styling for the selector list and the preview pane.
//!
//! Colors use the 256-color palette (`ESC[38;5;Nm`) so that fzf's `--ansi`
//! mode renders them the same way regardless of the terminal theme.

const RESET: &str = "\x1b[0m";

/// Palette index used for dim annotations such as `(current dir)`.
const DIM_GRAY: u8 = 242;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Red = 1,
    Green = 2,
    Gray = 8,
}

impl Color {
    /// Wrap `text` in this color as a foreground.
    pub fn fg(self, text: &str) -> String {
        paint(self as u8, text)
    }
}

fn paint(index: u8, text: &str) -> String {
    format!("\x1b[38;5;{index}m{text}{RESET}")
}

pub fn bold(text: &str) -> String {
    format!("\x1b[1m{text}{RESET}")
}

/// Dim gray, lighter than [`Color::Gray`] on most themes.
pub fn dim(text: &str) -> String {
    paint(DIM_GRAY, text)
}
