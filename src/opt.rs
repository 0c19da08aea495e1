//! Options parser.

use std::str::FromStr;

use crate::error::{Error, Result};

#[derive(Debug, Default)]
pub struct Options {
    pub help: bool,
    pub version: bool,
    pub config_path: Option<String>,
    pub lines_per_pass: Option<usize>,
    pub pass_delay: Option<u64>,
    pub undo_depth: Option<usize>,
    pub commit_delay: Option<u64>,

    /// Forces colored output on or off, otherwise it depends on whether standard
    /// output is a terminal.
    pub color: Option<bool>,

    /// Print one line per span instead of colored text.
    pub dump: bool,

    pub files: Vec<String>,
}

impl Options {
    pub fn parse<T>(args: T) -> Result<Options>
    where
        T: IntoIterator<Item = String>,
    {
        let mut opts = Options::default();
        let mut it = args.into_iter();
        while let Some(arg) = it.next() {
            match arg.as_str() {
                "--help" => opts.help = true,
                "--version" => opts.version = true,
                "--config" => opts.config_path = Some(expect_value(&arg, it.next())?),
                "--lines-per-pass" => opts.lines_per_pass = Some(parse_arg(&arg, it.next())?),
                "--pass-delay" => opts.pass_delay = Some(parse_arg(&arg, it.next())?),
                "--undo-depth" => opts.undo_depth = Some(parse_arg(&arg, it.next())?),
                "--commit-delay" => opts.commit_delay = Some(parse_arg(&arg, it.next())?),
                "--color" => opts.color = Some(true),
                "--no-color" => opts.color = Some(false),
                "--dump" => opts.dump = true,
                arg if arg.starts_with("--") => return Err(Error::unexpected_arg(arg)),
                _ => opts.files.push(arg),
            }
        }
        Ok(opts)
    }
}

fn parse_arg<T>(arg: &str, next_arg: Option<String>) -> Result<T>
where
    T: FromStr,
{
    if let Some(value) = next_arg {
        value
            .parse::<T>()
            .or_else(|_| Err(Error::invalid_value(arg, &value)))
    } else {
        Err(Error::expected_value(arg))
    }
}

fn expect_value(arg: &str, next_arg: Option<String>) -> Result<String> {
    next_arg.ok_or_else(|| Error::expected_value(arg))
}
