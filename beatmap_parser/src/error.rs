use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// A `key: value` line whose value could not be read.
    Scalar,
    /// A comma-separated row that was dropped.
    Row,
    /// A difficulty value outside what the engine can use.
    Difficulty,
}

impl WarningKind {
    pub(crate) fn from_code(code: &'static str) -> Self {
        match code {
            "W1001" => Self::Scalar,
            "W1002" | "W1003" => Self::Row,
            "W1004" => Self::Difficulty,
            _ => Self::Row,
        }
    }
}

/// A recoverable problem found on a single line. The line is skipped (or the
/// field left at its default) and parsing carries on.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{code}: {message} (line {line})")]
pub struct ParseWarning {
    pub code: &'static str,
    pub kind: WarningKind,
    pub message: String,
    pub line: usize,

    pub section: Option<String>,
    pub context: Option<String>,
}

impl ParseWarning {
    pub(crate) fn new(code: &'static str, message: impl Into<String>, line: usize) -> Self {
        Self {
            code,
            kind: WarningKind::from_code(code),
            message: message.into(),
            line,

            section: None,
            context: None,
        }
    }

    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// The beatmap source could not be read at all.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read beatmap: {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
