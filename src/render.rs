//! Terminal notice rendering for the `enwis` binary.
//!
//! All output goes to stderr so command results on stdout stay scriptable.

use crossterm::style::{Color, Stylize};

const LABEL_ERROR: &str = "error:";
const LABEL_WARNING: &str = "warning:";
const INDENT: &str = "  ";

#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    pub fn error(&self, msg: &str) {
        if self.color {
            eprintln!("{} {msg}", LABEL_ERROR.with(Color::Red).bold());
        } else {
            eprintln!("{LABEL_ERROR} {msg}");
        }
    }

    pub fn warn(&self, msg: &str) {
        if self.color {
            eprintln!("{} {msg}", LABEL_WARNING.with(Color::Yellow).bold());
        } else {
            eprintln!("{LABEL_WARNING} {msg}");
        }
    }

    pub fn success(&self, msg: &str) {
        if self.color {
            eprintln!("{}", msg.with(Color::Green).bold());
        } else {
            eprintln!("{msg}");
        }
    }

    pub fn notice(&self, msg: &str) {
        if self.color {
            eprintln!("{}", msg.with(Color::Cyan));
        } else {
            eprintln!("{msg}");
        }
    }

    /// Titled section header.
    pub fn section(&self, title: &str) {
        if self.color {
            eprintln!("{} {}", "•".with(Color::DarkGrey), title.bold());
        } else {
            eprintln!("{title}:");
        }
    }

    /// One key/value row under a section.
    pub fn field(&self, key: &str, value: &str) {
        if self.color {
            eprintln!(
                "{INDENT}{} {}",
                format!("{key}:").with(Color::DarkGrey),
                value.with(Color::White)
            );
        } else {
            eprintln!("{INDENT}{key}: {value}");
        }
    }
}
