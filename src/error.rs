//! Error types for the watermark removal library

use std::path::PathBuf;
use thiserror::Error;

use crate::pdf::ResourceKind;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the watermark removal library
#[derive(Error, Debug)]
pub enum Error {
    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Invalid PDF (no pages)
    #[error("PDF has no pages: {}", .0.display())]
    EmptyPdf(PathBuf),

    /// A named resource could not be resolved to a typed value
    #[error("Cannot resolve {kind} resource /{name}: {reason}")]
    Resolution {
        kind: ResourceKind,
        name: String,
        reason: String,
    },

    /// Writing the rewritten content stream back to the page failed
    #[error("Cannot commit page content: {reason}")]
    Commit { reason: String },

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Build a resolution error for the resource `name` of the given kind
    pub(crate) fn resolution(kind: ResourceKind, name: &[u8], reason: impl Into<String>) -> Self {
        Error::Resolution {
            kind,
            name: String::from_utf8_lossy(name).into_owned(),
            reason: reason.into(),
        }
    }
}
