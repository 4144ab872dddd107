//! Input validation: check a user-supplied path before pdfium sees it.
//!
//! pdfium's own errors for a missing or non-PDF file are opaque, so the
//! path is checked up front and the PDF magic bytes (`%PDF`) verified.

use crate::error::ShuffleError;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

/// PDF files start with these bytes.
pub const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Validate that `path` names a readable PDF and return it.
pub fn resolve_input(path: &Path) -> Result<PathBuf, ShuffleError> {
    if !path.exists() {
        return Err(ShuffleError::unreadable(path, "file not found"));
    }
    if path.is_dir() {
        return Err(ShuffleError::unreadable(path, "path is a directory"));
    }

    let mut f = File::open(path).map_err(|e| {
        if e.kind() == ErrorKind::PermissionDenied {
            ShuffleError::unreadable(path, "permission denied")
        } else {
            ShuffleError::unreadable(path, e)
        }
    })?;

    let mut magic = [0u8; 4];
    f.read_exact(&mut magic)
        .map_err(|_| ShuffleError::unreadable(path, "file is too short to be a PDF"))?;
    if &magic != PDF_MAGIC {
        return Err(ShuffleError::unreadable(
            path,
            format!("not a PDF (first bytes: {:?})", magic),
        ));
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(path.to_path_buf())
}

/// True when the file at `path` starts with the PDF magic bytes.
pub fn has_pdf_magic(path: &Path) -> bool {
    let mut magic = [0u8; 4];
    File::open(path)
        .and_then(|mut f| f.read_exact(&mut magic))
        .map(|_| &magic == PDF_MAGIC)
        .unwrap_or(false)
}
