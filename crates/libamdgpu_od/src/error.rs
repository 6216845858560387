use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OdError {
    #[error("missing file: {}", path.display())]
    MissingFile { path: PathBuf },

    #[error("unreadable value in {}: {reason}", path.display())]
    UnreadableValue { path: PathBuf, reason: String },

    #[error("malformed clock table at line {line_no}: {line:?} ({reason})")]
    MalformedClockTable { line_no: usize, line: String, reason: String },

    #[error("unsupported section: {section}")]
    UnsupportedFormat { section: String },

    #[error("no usable clock data, could not read: {}", display_paths(files))]
    NoClockData { files: Vec<PathBuf> },
}

pub type Result<T> = std::result::Result<T, OdError>;

impl OdError {
    pub fn from_io<P: AsRef<Path>>(path: P, err: io::Error) -> Self {
        let path = path.as_ref().to_path_buf();

        match err.kind() {
            io::ErrorKind::NotFound => Self::MissingFile { path },
            _ => Self::UnreadableValue { path, reason: err.to_string() },
        }
    }

    pub(crate) fn malformed<S: Into<String>>(line_no: usize, line: &str, reason: S) -> Self {
        Self::MalformedClockTable {
            line_no,
            line: line.to_string(),
            reason: reason.into(),
        }
    }

    /// Errors a monitoring loop absorbs into an absent value.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::MissingFile { .. } | Self::UnreadableValue { .. })
    }
}

fn display_paths(files: &[PathBuf]) -> String {
    files
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<String>>()
        .join(", ")
}
