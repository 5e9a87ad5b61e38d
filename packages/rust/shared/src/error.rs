//! Error types for SWAN Gallery.
//!
//! Library crates use [`GalleryError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

use crate::types::OutputKind;

/// Top-level error type for all SWAN Gallery operations.
#[derive(Debug, thiserror::Error)]
pub enum GalleryError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Notebook document could not be parsed.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// A file the build depends on is absent from the source tree.
    #[error("missing {kind} at {path:?}")]
    MissingSource { kind: OutputKind, path: PathBuf },

    /// The rendering engine failed on an otherwise valid notebook.
    #[error("render error: {0}")]
    Render(String),

    /// Zip bundle could not be written.
    #[error("archive error: {0}")]
    Archive(String),

    /// Data validation error (malformed reference, unsupported format, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, GalleryError>;

impl GalleryError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Report a source file or folder that must exist but does not.
    pub fn missing(kind: OutputKind, path: impl Into<PathBuf>) -> Self {
        Self::MissingSource {
            kind,
            path: path.into(),
        }
    }
}
