//! A collection of functions that produce ANSI control sequences used in the
//! rendering of highlighted text.

use crate::color::Color;

pub fn set_color(color: Color) -> String {
    format!("\x1b[38;5;{}m\x1b[48;5;{}m", color.fg, color.bg)
}

pub fn reset_color() -> &'static str {
    "\x1b[0m"
}

/// Clears from the cursor to the end of the line using the current background.
pub fn clear_line() -> &'static str {
    "\x1b[K"
}
