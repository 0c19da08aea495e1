//! A command-line highlighter for Orc source files.
//!
//! Copyright 2024 David Edwards
//!
//! Licensed under the Apache License, Version 2.0 (the "License");
//! you may not use this file except in compliance with the License.
//! You may obtain a copy of the License at
//!
//! <https://www.apache.org/licenses/LICENSE-2.0>
//!
//! Unless required by applicable law or agreed to in writing, software
//! distributed under the License is distributed on an "AS IS" BASIS,
//! WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//! See the License for the specific language governing permissions and
//! limitations under the License.
use orchard::config::Configuration;
use orchard::editor::Editor;
use orchard::error::Result;
use orchard::opt::Options;
use orchard::{render, sys};
use std::io::{self, Read};
use std::process::ExitCode;

/// Usage documentation for display to terminal.
const USAGE: &str = "\
usage: orchard [options] [FILE...]

Highlights Orc source files, or standard input if no files are given.

options:
  --help                 print this help
  --version              print version information
  --config PATH          read configuration from PATH instead of $HOME
  --lines-per-pass N     lines highlighted in a single pass
  --pass-delay MS        delay between highlighting passes
  --undo-depth N         maximum number of undo levels
  --commit-delay MS      delay before edits are committed to the history
  --color                always emit colors
  --no-color             never emit colors
  --dump                 print one line per span with its style";

// Version and build information.
const PACKAGE_NAME: &str = env!("CARGO_PKG_NAME");
const PACKAGE_VERSION: &str = env!("CARGO_PKG_VERSION");
const BUILD_HASH: &str = env!("BUILD_HASH");
const BUILD_DATE: &str = env!("BUILD_DATE");

fn main() -> ExitCode {
    match run() {
        Err(e) => {
            eprintln!("{e}");
            ExitCode::from(1)
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn run() -> Result<()> {
    let opts = Options::parse(std::env::args().skip(1))?;
    if opts.help {
        println!("{USAGE}");
        Ok(())
    } else if opts.version {
        println!("{PACKAGE_NAME} {PACKAGE_VERSION} ({BUILD_HASH} {BUILD_DATE})");
        Ok(())
    } else {
        orchard::init_tracing();
        run_opts(&opts)
    }
}

fn run_opts(opts: &Options) -> Result<()> {
    // Command line options are applied last since these override all other settings.
    let mut config = if let Some(ref config_path) = opts.config_path {
        Configuration::load_file(config_path)?
    } else {
        Configuration::load()?
    };
    config.apply_opts(opts)?;
    let color = opts.color.unwrap_or_else(sys::stdout_is_tty);

    if opts.files.len() > 0 {
        for path in &opts.files {
            let text = sys::read_file(path)?;
            print!("{}", highlight(&config, opts, &text, color));
        }
    } else {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        print!("{}", highlight(&config, opts, &text, color));
    }
    Ok(())
}

fn highlight(config: &Configuration, opts: &Options, text: &str, color: bool) -> String {
    let mut editor = Editor::new(config.settings.clone());
    editor.import(text);
    editor.settle();
    let spans = editor.spans();
    if opts.dump {
        render::dump(&spans)
    } else {
        render::render(&spans, &config.theme, color)
    }
}
