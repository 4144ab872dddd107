//! Report types returned by the pipeline stages.
//!
//! Each stage returns the path it wrote plus enough geometry for the caller
//! to check the result without re-reading the file. Everything here derives
//! `Serialize` so the CLI can print a run as JSON.

use crate::config::RasterFormat;
use crate::error::ShuffleError;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// One rasterised page written by the Rasterizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RasterPage {
    /// 0-based page index in the source document.
    pub index: usize,
    /// Where the image was written (`page_{index}.{ext}`).
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    /// The format actually written.
    pub format: RasterFormat,
    /// True when the primary format failed and the fallback was used.
    pub fell_back: bool,
}

/// A rectangle inside an image, in pixels. `right` and `bottom` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CropRegion {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl CropRegion {
    /// The whole of a `width` × `height` image.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            left: 0,
            top: 0,
            right: width,
            bottom: height,
        }
    }

    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    /// Check `0 ≤ top < bottom ≤ height` and `0 ≤ left < right ≤ width`.
    pub fn validate(&self, width: u32, height: u32) -> Result<(), ShuffleError> {
        if self.left >= self.right || self.right > width {
            return Err(ShuffleError::Internal(format!(
                "crop columns {}..{} invalid for width {}",
                self.left, self.right, width
            )));
        }
        if self.top >= self.bottom || self.bottom > height {
            return Err(ShuffleError::Internal(format!(
                "crop rows {}..{} invalid for height {}",
                self.top, self.bottom, height
            )));
        }
        Ok(())
    }
}

/// One page image after the Cropper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CroppedPage {
    pub index: usize,
    pub path: PathBuf,
    pub original_width: u32,
    pub original_height: u32,
    /// Region kept from the original image.
    pub region: CropRegion,
    /// Height after the fixed margin crop, before whitespace trimming.
    pub margin_cropped_height: u32,
    /// Blank rows removed from the bottom by the whitespace trim.
    pub trimmed_rows: u32,
    /// True when the page was too short and copied unmodified.
    pub passed_through: bool,
}

impl CroppedPage {
    pub fn width(&self) -> u32 {
        self.region.width()
    }

    pub fn height(&self) -> u32 {
        self.region.height()
    }
}

/// A vertically stacked composite written by the Combiner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompositeImage {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Input images, top to bottom.
    pub sources: Vec<PathBuf>,
}

/// The merged PDF written by the Assembler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssembledPdf {
    pub path: PathBuf,
    pub page_count: usize,
    /// Page sources in output order.
    pub sources: Vec<PathBuf>,
}

/// The zip archive written by the Archiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveInfo {
    pub path: PathBuf,
    /// Entry names, in archive order.
    pub entries: Vec<String>,
    /// Size of the finished archive on disk.
    pub bytes: u64,
}

/// Document metadata read without rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}

/// Timings and counts for one shuffle run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShuffleStats {
    pub total_pages: usize,
    pub output_pages: usize,
    pub passed_through_pages: usize,
    pub fallback_pages: usize,
    pub combined_slots: usize,
    pub render_duration_ms: u64,
    pub crop_duration_ms: u64,
    pub assemble_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything a shuffle run produced.
///
/// The `path` of each entry in `pages` and `composites` points into the
/// scratch directory. Those files only outlive the run when the caller named
/// the directory; with a temporary one (`scratch_dir` is `None`) the paths
/// are already gone and only the geometry remains meaningful. Pass an
/// archive destination to keep the images without a scratch directory.
#[derive(Debug, Clone, Serialize)]
pub struct ShuffleOutput {
    pub pdf: AssembledPdf,
    pub archive: Option<ArchiveInfo>,
    /// Cropped pages in source order.
    pub pages: Vec<CroppedPage>,
    pub composites: Vec<CompositeImage>,
    /// Scratch directory used, or `None` when a temporary one was removed.
    pub scratch_dir: Option<PathBuf>,
    pub stats: ShuffleStats,
}

impl ShuffleOutput {
    /// Path of the shuffled PDF.
    pub fn pdf_path(&self) -> &Path {
        &self.pdf.path
    }

    /// Whether the intermediate image paths still point at files.
    pub fn intermediates_retained(&self) -> bool {
        self.scratch_dir.is_some()
    }
}
