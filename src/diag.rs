//! Diagnostic channel: warnings go to stderr, never to the configured
//! output stream.

use std::io::Write;

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Stderr warning writer with optional color.
pub struct Diag {
    stream: StandardStream,
}

impl Diag {
    pub fn stderr(use_color: bool) -> Self {
        let choice = if use_color {
            ColorChoice::Auto
        } else {
            ColorChoice::Never
        };
        Diag {
            stream: StandardStream::stderr(choice),
        }
    }

    /// Print a warning. Failures to write diagnostics are ignored; they
    /// must never abort a traversal that is otherwise succeeding.
    pub fn warn(&mut self, msg: &str) {
        let _ = self
            .stream
            .set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true));
        let _ = write!(self.stream, "walkfmt: warning:");
        let _ = self.stream.reset();
        let _ = writeln!(self.stream, " {msg}");
    }
}

impl std::fmt::Debug for Diag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Diag").finish_non_exhaustive()
    }
}
