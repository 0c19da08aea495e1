//! Colors used to render token styles.
//!
//! Colors follow the ANSI 8-bit standard, so a color is simply a number in the
//! range `0..=255`. Colors can also be referred to by name, where names are drawn
//! from a small set of predefined colors and from the `[colors]` table of a
//! configuration file.

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Color {
    pub fg: u8,
    pub bg: u8,
}

impl Color {
    pub fn new(fg: u8, bg: u8) -> Color {
        Color { fg, bg }
    }
}

/// A color as written in a configuration file, either a name or a number.
#[derive(Clone, Eq, PartialEq, Debug, Deserialize)]
#[serde(untagged)]
pub enum ColorValue {
    Number(u8),
    Name(String),
}

impl Display for ColorValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ColorValue::Number(n) => write!(f, "{n}"),
            ColorValue::Name(name) => write!(f, "{name}"),
        }
    }
}

/// A map of color names to color numbers.
pub struct Colors {
    colors: HashMap<String, u8>,
}

impl Colors {
    const PREDEFINED: [(&'static str, u8); 16] = [
        ("black", 0),
        ("red", 1),
        ("green", 2),
        ("yellow", 3),
        ("blue", 4),
        ("magenta", 5),
        ("cyan", 6),
        ("white", 7),
        ("gray", 8),
        ("bright-red", 9),
        ("bright-green", 10),
        ("bright-yellow", 11),
        ("bright-blue", 12),
        ("bright-magenta", 13),
        ("bright-cyan", 14),
        ("bright-white", 15),
    ];

    pub fn new() -> Colors {
        let colors = Self::PREDEFINED
            .iter()
            .map(|(name, color)| (name.to_string(), *color))
            .collect();
        Colors { colors }
    }

    /// Adds `colors` to the map, replacing existing colors of the same name.
    pub fn apply(&mut self, colors: &HashMap<String, u8>) {
        for (name, color) in colors {
            self.colors.insert(name.to_string(), *color);
        }
    }

    pub fn lookup(&self, name: &str) -> Option<u8> {
        self.colors.get(name).copied()
    }

    /// Resolves `value` to a color number, or `None` if it names an unknown color.
    pub fn lookup_value(&self, value: &ColorValue) -> Option<u8> {
        match value {
            ColorValue::Number(n) => Some(*n),
            ColorValue::Name(name) => self.lookup(name),
        }
    }
}

impl Default for Colors {
    fn default() -> Colors {
        Colors::new()
    }
}
