//! Error types for the exam-shuffle library.
//!
//! Every pipeline stage surfaces failures to its immediate caller as a
//! [`ShuffleError`]; nothing is retried or swallowed inside a stage. The
//! five variants that name a stage contract (`SourceUnreadable`,
//! `MarginExceedsImage`, `EmptyInputSet`, `MergeFailed`,
//! `ArchiveWriteFailed`) are the ones callers usually match on; the rest
//! describe lower-level I/O and configuration problems.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the exam-shuffle library.
#[derive(Debug, Error)]
pub enum ShuffleError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The source document is missing, unreadable, not a PDF, or has no pages.
    #[error("Cannot read PDF '{path}': {reason}")]
    SourceUnreadable { path: PathBuf, reason: String },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    // ── Image errors ──────────────────────────────────────────────────────
    /// The page is too short for the configured top/bottom margin.
    ///
    /// The image on disk is left untouched when this is returned.
    #[error(
        "Margin of {margin}px top and bottom exceeds image '{path}' ({height}px tall)\n\
         The page must be taller than twice the margin."
    )]
    MarginExceedsImage {
        path: PathBuf,
        height: u32,
        margin: u32,
    },

    /// A raster image could not be decoded.
    #[error("Failed to read image '{path}': {detail}")]
    ImageReadFailed { path: PathBuf, detail: String },

    /// Neither the primary nor the fallback raster format could be written.
    #[error("Failed to write image '{path}': {detail}")]
    ImageWriteFailed { path: PathBuf, detail: String },

    /// A composite canvas would exceed the maximum image dimensions.
    #[error("Composite image too large: {width}x{height} px")]
    ImageTooLarge { width: u64, height: u64 },

    // ── Combining / merging errors ────────────────────────────────────────
    /// Zero images, pages, or files were supplied to a combining operation.
    #[error("Nothing to {operation}: the input set is empty")]
    EmptyInputSet { operation: &'static str },

    /// A page source could not be appended to the merged PDF.
    #[error("Failed to merge '{path}' into the output PDF: {detail}")]
    MergeFailed { path: PathBuf, detail: String },

    /// The page order supplied by the caller does not fit the document.
    #[error("Invalid page order: {0}")]
    InvalidOrder(String),

    // ── Output errors ─────────────────────────────────────────────────────
    /// I/O failure while writing the zip archive.
    #[error("Failed to write archive '{path}': {detail}")]
    ArchiveWriteFailed { path: PathBuf, detail: String },

    /// The scratch directory could not be created.
    #[error("Failed to prepare scratch directory '{path}': {source}")]
    ScratchDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Rasterisation needs the PDFium shared library. You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium.\n\
  • Place libpdfium next to the working directory.\n\
  • Install it system-wide so the dynamic loader can find it.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ShuffleError {
    /// Shorthand for [`ShuffleError::SourceUnreadable`].
    pub(crate) fn unreadable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        ShuffleError::SourceUnreadable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Shorthand for [`ShuffleError::MergeFailed`].
    pub(crate) fn merge(path: impl Into<PathBuf>, detail: impl ToString) -> Self {
        ShuffleError::MergeFailed {
            path: path.into(),
            detail: detail.to_string(),
        }
    }

    /// Shorthand for [`ShuffleError::ArchiveWriteFailed`].
    pub(crate) fn archive(path: impl Into<PathBuf>, detail: impl ToString) -> Self {
        ShuffleError::ArchiveWriteFailed {
            path: path.into(),
            detail: detail.to_string(),
        }
    }
}
