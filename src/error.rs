//! Error types for pdfstruct.

use std::io;
use std::time::Duration;
use thiserror::Error;

use crate::model::SourceMethod;

/// Result type alias for pdfstruct operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during conversion.
///
/// Only [`Error::DocumentUnreadable`] (for the document as a whole),
/// [`Error::ConversionTimeout`] and [`Error::Cancelled`] escape a conversion.
/// Page- and tier-level failures are recovered and reported as
/// [`SkipRecord`](crate::model::SkipRecord)s instead.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The document, or one of its pages, cannot be opened or decoded.
    #[error("Document unreadable{}: {reason}", page_suffix(.page))]
    DocumentUnreadable {
        /// Zero-based page index, `None` for the whole document.
        page: Option<usize>,
        /// What went wrong.
        reason: String,
    },

    /// A table-extraction backend is missing its runtime dependency.
    #[error("Table extraction tier '{method}' unavailable: {reason}")]
    TableExtractionUnavailable {
        /// The tier that cannot run.
        method: SourceMethod,
        /// Why it cannot run.
        reason: String,
    },

    /// The per-document time budget was exceeded.
    #[error("Conversion exceeded its time budget of {limit:?}")]
    ConversionTimeout {
        /// The configured budget.
        limit: Duration,
    },

    /// An extractor returned a grid that could not be made rectangular.
    #[error("Malformed table from '{method}': {reason}")]
    MalformedTable {
        /// The tier that produced the grid.
        method: SourceMethod,
        /// Why normalization failed.
        reason: String,
    },

    /// The conversion was cancelled by the caller.
    #[error("Conversion cancelled")]
    Cancelled,

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Error while rendering the result (JSON).
    #[error("Rendering error: {0}")]
    Render(String),
}

impl Error {
    /// Shorthand for a document-level unreadable error.
    pub fn unreadable(reason: impl Into<String>) -> Self {
        Error::DocumentUnreadable {
            page: None,
            reason: reason.into(),
        }
    }

    /// Shorthand for a page-level unreadable error.
    pub fn unreadable_page(page: usize, reason: impl Into<String>) -> Self {
        Error::DocumentUnreadable {
            page: Some(page),
            reason: reason.into(),
        }
    }

    /// Whether this error must abort the whole conversion.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::ConversionTimeout { .. } | Error::Cancelled)
    }
}

fn page_suffix(page: &Option<usize>) -> String {
    match page {
        Some(p) => format!(" (page {})", p),
        None => String::new(),
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::unreadable("document is encrypted"),
            _ => Error::unreadable(err.to_string()),
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::TableExtractionUnavailable {
            method: SourceMethod::Lattice,
            reason: format!("rasterized page could not be decoded: {}", err),
        }
    }
}
