//! PDFium binding for the Rasterizer.
//!
//! Resolution order (first match wins):
//!
//! 1. an explicit path from [`crate::ShuffleConfig::pdfium_library`]
//! 2. `PDFIUM_LIB_PATH`
//! 3. the platform library name in the current directory
//! 4. the system library search path

use crate::error::ShuffleError;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming an existing pdfium shared library.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Bind to pdfium, trying each location in turn.
pub fn bind_pdfium(explicit: Option<&Path>) -> Result<Pdfium, ShuffleError> {
    let mut attempts: Vec<String> = Vec::new();

    for candidate in candidate_paths(explicit) {
        match Pdfium::bind_to_library(&candidate) {
            Ok(bindings) => {
                debug!("Bound pdfium from {}", candidate.display());
                return Ok(Pdfium::new(bindings));
            }
            Err(e) => attempts.push(format!("{}: {:?}", candidate.display(), e)),
        }
    }

    match Pdfium::bind_to_system_library() {
        Ok(bindings) => {
            debug!("Bound pdfium from the system library path");
            Ok(Pdfium::new(bindings))
        }
        Err(e) => {
            attempts.push(format!("system library: {:?}", e));
            Err(ShuffleError::PdfiumBindingFailed(attempts.join("; ")))
        }
    }
}

/// Library paths to try before the system search, in priority order.
fn candidate_paths(explicit: Option<&Path>) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(p) = explicit {
        paths.push(p.to_path_buf());
    }
    if let Ok(p) = std::env::var(PDFIUM_LIB_PATH_ENV) {
        if !p.is_empty() {
            paths.push(PathBuf::from(p));
        }
    }
    paths.push(Pdfium::pdfium_platform_library_name_at_path("./"));
    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_comes_first() {
        let explicit = PathBuf::from("/opt/pdfium/lib/libpdfium.so");
        let paths = candidate_paths(Some(&explicit));
        assert_eq!(paths[0], explicit);
        assert!(paths.len() >= 2);
    }

    #[test]
    fn missing_library_is_tried_before_fallbacks() {
        let bogus = PathBuf::from("/definitely/not/here/libpdfium.so");
        let paths = candidate_paths(Some(&bogus));
        assert_eq!(paths.first(), Some(&bogus));
        assert!(paths.iter().skip(1).all(|p| p != &bogus));
    }

    #[test]
    fn missing_library_is_reported_or_a_fallback_binds() {
        let bogus = PathBuf::from("/definitely/not/here/libpdfium.so");
        match bind_pdfium(Some(&bogus)) {
            Err(ShuffleError::PdfiumBindingFailed(msg)) => {
                assert!(msg.contains("/definitely/not/here"), "got: {msg}");
            }
            Err(other) => panic!("unexpected error: {other}"),
            // Bound from a fallback location, never from the missing path.
            Ok(_) => assert!(!bogus.exists()),
        }
    }
}
