//! Rendering of highlighted text for output.

use crate::ansi;
use crate::config::Theme;
use crate::token::Style;

/// Renders `spans` as text, colored according to `theme` if `color` is `true`.
pub fn render(spans: &[(Option<Style>, String)], theme: &Theme, color: bool) -> String {
    let mut out = String::new();
    for (style, text) in spans {
        if text == "\n" {
            if color {
                out.push_str(ansi::clear_line());
                out.push_str(ansi::reset_color());
            }
            out.push('\n');
        } else if color {
            out.push_str(&ansi::set_color(theme.color_of(*style)));
            out.push_str(text);
        } else {
            out.push_str(text);
        }
    }
    if color {
        out.push_str(ansi::clear_line());
        out.push_str(ansi::reset_color());
    }
    out.push('\n');
    out
}

/// Renders `spans` one per line, each as its style name and escaped text separated
/// by a tab.
pub fn dump(spans: &[(Option<Style>, String)]) -> String {
    spans
        .iter()
        .map(|(style, text)| {
            let style = style.map(|style| style.as_str()).unwrap_or("-");
            format!("{style}\t{text:?}\n")
        })
        .collect()
}
