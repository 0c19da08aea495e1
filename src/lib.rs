//! Incremental syntax highlighting and edit history for editing Orc source text.
//!
//! A [`Document`] holds text as styled spans separated by line breaks. The
//! [`Highlighter`] restyles it in bounded passes, restarting the [`Parser`] from
//! checkpoints cached on clean line breaks so that only the neighborhood of an
//! edit is tokenized again. The [`History`] commits changed lines as undo levels.
//! An [`Editor`] ties these together and paces the work with debounced timers.

pub mod ansi;
pub mod arena;
pub mod color;
pub mod config;
pub mod document;
pub mod editor;
pub mod error;
pub mod etc;
pub mod highlight;
pub mod history;
pub mod lexer;
pub mod opt;
pub mod parser;
pub mod render;
pub mod search;
pub mod stream;
pub mod sys;
pub mod timer;
pub mod token;

pub use crate::config::{Configuration, Settings};
pub use crate::document::{Document, LinePos, NodeId};
pub use crate::editor::Editor;
pub use crate::error::{Error, Result};
pub use crate::highlight::Highlighter;
pub use crate::history::History;
pub use crate::parser::Parser;
pub use crate::search::SearchCursor;
pub use crate::token::{Style, Token};

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Installs a subscriber that writes to standard error, filtered by `RUST_LOG`.
///
/// Nothing is installed unless `RUST_LOG` is set. Calling this more than once has
/// no further effect.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        if std::env::var_os("RUST_LOG").is_some() {
            let _ = tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr))
                .with(EnvFilter::from_default_env())
                .try_init();
        }
    });
}
