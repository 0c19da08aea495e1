//! A complete collection of errors.
//!
//! Only recoverable conditions are represented here. Broken invariants between
//! the rendered spans and the tokenizer are bugs and panic instead.

use std::error;
use std::fmt::{self, Display, Formatter};
use std::io;
use toml::de;

/// A convenient `Result` type whose error type is [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// The set of possible errors.
#[derive(Debug)]
pub enum Error {
    /// An I/O error reported by the operating system.
    Os { cause: io::Error },

    /// An I/O error resulting from an operation on a file referenced by `path`.
    Io { path: String, cause: io::Error },

    /// An unexpected command-line argument `arg`.
    UnexpectedArg { arg: String },

    /// A value is expected for a command-line argument `arg`.
    ExpectedValue { arg: String },

    /// A `value` given for a command-line argument `arg` is not valid.
    InvalidValue { arg: String, value: String },

    /// An error occurred while parsing a configuration file referenced by `path`.
    Configuration { path: String, cause: String },

    /// The color `name` is not valid.
    InvalidColor { name: String },

    /// The style `name` used as a theme key is not a known token style.
    InvalidStyle { name: String },

    /// A numeric setting `name` has a value outside of its permitted range.
    InvalidSetting { name: String, value: u64 },
}

impl error::Error for Error {}

impl Error {
    pub fn io(path: &str, cause: io::Error) -> Error {
        Error::Io {
            path: path.to_string(),
            cause,
        }
    }

    pub fn unexpected_arg(arg: &str) -> Error {
        Error::UnexpectedArg {
            arg: arg.to_string(),
        }
    }

    pub fn expected_value(arg: &str) -> Error {
        Error::ExpectedValue {
            arg: arg.to_string(),
        }
    }

    pub fn invalid_value(arg: &str, value: &str) -> Error {
        Error::InvalidValue {
            arg: arg.to_string(),
            value: value.to_string(),
        }
    }

    pub fn configuration(path: &str, e: &de::Error) -> Error {
        Error::Configuration {
            path: path.to_string(),
            cause: format!("{e}"),
        }
    }

    pub fn invalid_color(name: &str) -> Error {
        Error::InvalidColor {
            name: name.to_string(),
        }
    }

    pub fn invalid_style(name: &str) -> Error {
        Error::InvalidStyle {
            name: name.to_string(),
        }
    }

    pub fn invalid_setting(name: &str, value: u64) -> Error {
        Error::InvalidSetting {
            name: name.to_string(),
            value,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Error::Os { cause } => write!(f, "I/O error: {cause}"),
            Error::Io { path, cause } => write!(f, "{path}: {cause}"),
            Error::UnexpectedArg { arg } => write!(f, "{arg}: unexpected argument"),
            Error::ExpectedValue { arg } => write!(f, "{arg}: expecting value to follow"),
            Error::InvalidValue { arg, value } => {
                write!(f, "{value}: invalid value following {arg}")
            }
            Error::Configuration { path, cause } => {
                write!(f, "{path}: configuration error: {cause}")
            }
            Error::InvalidColor { name } => write!(f, "{name}: invalid color"),
            Error::InvalidStyle { name } => write!(f, "{name}: unknown token style"),
            Error::InvalidSetting { name, value } => {
                write!(f, "{value}: invalid value for setting {name}")
            }
        }
    }
}

impl From<io::Error> for Error {
    fn from(cause: io::Error) -> Error {
        Error::Os { cause }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            Error::unexpected_arg("--bogus").to_string(),
            "--bogus: unexpected argument"
        );
        assert_eq!(
            Error::invalid_value("--undo-depth", "x").to_string(),
            "x: invalid value following --undo-depth"
        );
        assert_eq!(
            Error::invalid_style("banana").to_string(),
            "banana: unknown token style"
        );
        assert_eq!(
            Error::invalid_setting("lines-per-pass", 0).to_string(),
            "0: invalid value for setting lines-per-pass"
        );
    }

    #[test]
    fn from_io_error() {
        let e: Error = io::Error::new(io::ErrorKind::Other, "boom").into();
        assert!(matches!(e, Error::Os { .. }));
        assert_eq!(e.to_string(), "I/O error: boom");
    }
}
