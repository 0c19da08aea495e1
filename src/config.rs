//! Contains everything related to configuration.
//!
//! All default values for configurable aspects of highlighting and editing are
//! defined in this module, which are *settings*, *colors*, and the *theme* that
//! maps token styles to colors.
//!
//! At a minimum, [`Configuration::default()`] is sufficient for initializing an
//! editor. However, the normal process is to apply multiple tiers of configuration,
//! all optional, resulting in a final blended configuration.
//!
//! External configuration files are expected to be formatted according to the
//! [TOML specification](https://toml.io).
//!
//! The default method of loading an external configuration file via
//! [`Configuration::load()`] will try to locate files in the following locations in
//! order of precedence:
//!
//! * `$HOME/.orchardrc`
//! * `$HOME/.orchard/orchardrc`
//! * `$HOME/.config/orchard/orchardrc`

use crate::color::{Color, ColorValue, Colors};
use crate::error::{Error, Result};
use crate::opt::Options;
use crate::sys::{self, AsString};
use crate::token::Style;
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// A configuration representing all aspects of highlighting.
pub struct Configuration {
    /// A collection of settings that control the pacing of highlighting and the
    /// depth of the edit history.
    pub settings: Settings,

    /// A map of color names to color values.
    pub colors: Colors,

    /// A map of token styles to colors.
    pub theme: Theme,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    /// Number of lines highlighted in a single pass.
    pub lines_per_pass: usize,

    /// Delay between highlighting passes, in milliseconds.
    pub pass_delay: u64,

    /// Maximum number of undo levels.
    pub undo_depth: usize,

    /// Delay before touched lines are committed to the edit history, in
    /// milliseconds.
    pub commit_delay: u64,

    /// Delay between steps of the continuous scan, in milliseconds, where `0`
    /// disables scanning.
    pub continuous_scan: u64,
}

pub struct Theme {
    /// Color of text without a style.
    pub text_color: Color,

    /// Foreground colors of styled text, which share the background of
    /// [`text_color`](Self::text_color).
    styles: IndexMap<Style, u8>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ExternalConfiguration {
    settings: Option<ExternalSettings>,
    colors: Option<HashMap<String, u8>>,
    theme: Option<HashMap<String, ColorValue>>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ExternalSettings {
    #[serde(rename = "lines-per-pass")]
    lines_per_pass: Option<usize>,

    #[serde(rename = "pass-delay")]
    pass_delay: Option<u64>,

    #[serde(rename = "undo-depth")]
    undo_depth: Option<usize>,

    #[serde(rename = "commit-delay")]
    commit_delay: Option<u64>,

    #[serde(rename = "continuous-scan")]
    continuous_scan: Option<u64>,
}

impl Settings {
    /// Applies the external settings `ext` on top of `self`.
    fn apply(&mut self, ext: Option<ExternalSettings>) -> Result<()> {
        if let Some(ext) = ext {
            self.lines_per_pass = ext.lines_per_pass.unwrap_or(self.lines_per_pass);
            self.pass_delay = ext.pass_delay.unwrap_or(self.pass_delay);
            self.undo_depth = ext.undo_depth.unwrap_or(self.undo_depth);
            self.commit_delay = ext.commit_delay.unwrap_or(self.commit_delay);
            self.continuous_scan = ext.continuous_scan.unwrap_or(self.continuous_scan);
        }
        self.validate()
    }

    /// Applies the relevant settings from `opts` on top of `self`.
    pub fn apply_opts(&mut self, opts: &Options) -> Result<()> {
        self.lines_per_pass = opts.lines_per_pass.unwrap_or(self.lines_per_pass);
        self.pass_delay = opts.pass_delay.unwrap_or(self.pass_delay);
        self.undo_depth = opts.undo_depth.unwrap_or(self.undo_depth);
        self.commit_delay = opts.commit_delay.unwrap_or(self.commit_delay);
        self.validate()
    }

    pub fn pass_delay(&self) -> Duration {
        Duration::from_millis(self.pass_delay)
    }

    pub fn commit_delay(&self) -> Duration {
        Duration::from_millis(self.commit_delay)
    }

    /// Returns the delay between scan steps, or `None` if scanning is disabled.
    pub fn scan_delay(&self) -> Option<Duration> {
        (self.continuous_scan > 0).then(|| Duration::from_millis(self.continuous_scan))
    }

    fn validate(&self) -> Result<()> {
        if self.lines_per_pass == 0 {
            Err(Error::invalid_setting("lines-per-pass", 0))
        } else {
            Ok(())
        }
    }
}

impl Default for Settings {
    fn default() -> Settings {
        Settings {
            lines_per_pass: 15,
            pass_delay: 200,
            undo_depth: 20,
            commit_delay: 800,
            continuous_scan: 0,
        }
    }
}

impl Theme {
    const TEXT_FG: u8 = 252;
    const TEXT_BG: u8 = 233;

    const STYLE_FG: [(Style, u8); 8] = [
        (Style::Operator, 248),
        (Style::Combinator, 141),
        (Style::Keyword, 208),
        (Style::Literal, 114),
        (Style::Variable, 252),
        (Style::Site, 75),
        (Style::Comment, 243),
        (Style::Whitespace, 252),
    ];

    /// Returns the color for text rendered in `style`.
    pub fn color_of(&self, style: Option<Style>) -> Color {
        style
            .and_then(|style| self.styles.get(&style))
            .map(|fg| Color::new(*fg, self.text_color.bg))
            .unwrap_or(self.text_color)
    }

    /// Applies the external theme `ext` on top of `self`.
    fn apply(&mut self, ext: Option<HashMap<String, ColorValue>>, colors: &Colors) -> Result<()> {
        if let Some(ext) = ext {
            for (name, value) in ext {
                let color = colors
                    .lookup_value(&value)
                    .ok_or_else(|| Error::invalid_color(&value.to_string()))?;
                match name.as_str() {
                    "text-fg" => self.text_color.fg = color,
                    "text-bg" => self.text_color.bg = color,
                    _ => {
                        let style =
                            Style::from_name(&name).ok_or_else(|| Error::invalid_style(&name))?;
                        self.styles.insert(style, color);
                    }
                }
            }
        }
        Ok(())
    }
}

impl Default for Theme {
    fn default() -> Theme {
        Theme {
            text_color: Color::new(Self::TEXT_FG, Self::TEXT_BG),
            styles: IndexMap::from(Self::STYLE_FG),
        }
    }
}

impl Configuration {
    /// A collection of resource files to try loading in order of precedence.
    const TRY_FILES: [&str; 3] = [".orchardrc", ".orchard/orchardrc", ".config/orchard/orchardrc"];

    /// Returns a configuration that is formed by attempting to load a resource file
    /// from well-known locations.
    pub fn load() -> Result<Configuration> {
        let mut config = Configuration::default();
        let root_path = sys::home_dir();
        for try_path in Self::TRY_FILES {
            let path = root_path.join(try_path);
            if path.exists() {
                let ext = Self::read_file(&path)?;
                config.apply(ext)?;
                break;
            }
        }
        Ok(config)
    }

    /// Returns a configuration loaded from the resource file at `path`.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Configuration> {
        let mut config = Configuration::default();
        let ext = Self::read_file(path.as_ref())?;
        config.apply(ext)?;
        Ok(config)
    }

    /// Applies the relevant settings from `opts` on top of `self`.
    pub fn apply_opts(&mut self, opts: &Options) -> Result<()> {
        self.settings.apply_opts(opts)
    }

    /// Applies the external configuration `ext` on top of `self`.
    fn apply(&mut self, ext: ExternalConfiguration) -> Result<()> {
        self.settings.apply(ext.settings)?;
        if let Some(colors) = ext.colors {
            self.colors.apply(&colors);
        }
        self.theme.apply(ext.theme, &self.colors)
    }

    fn read_file(path: &Path) -> Result<ExternalConfiguration> {
        let content = fs::read_to_string(path).map_err(|e| Error::io(&path.as_string(), e))?;
        Self::parse(&path.as_string(), &content)
    }

    fn parse(path: &str, content: &str) -> Result<ExternalConfiguration> {
        toml::from_str::<ExternalConfiguration>(content).map_err(|e| Error::configuration(path, &e))
    }
}

impl Default for Configuration {
    fn default() -> Configuration {
        Configuration {
            settings: Settings::default(),
            colors: Colors::default(),
            theme: Theme::default(),
        }
    }
}
