//! Configuration types for exam shuffling.
//!
//! All pipeline behaviour is controlled through [`ShuffleConfig`], built via
//! its [`ShuffleConfigBuilder`]. The scratch directory is part of the config
//! rather than a process-wide constant, so two runs with different configs
//! never touch each other's intermediate files.

use crate::error::ShuffleError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Configuration for one shuffle run.
///
/// Built via [`ShuffleConfig::builder()`] or using
/// [`ShuffleConfig::default()`].
///
/// # Example
/// ```rust
/// use exam_shuffle::ShuffleConfig;
///
/// let config = ShuffleConfig::builder()
///     .dpi(150)
///     .margin_px(120)
///     .scratch_dir("/tmp/exam-run-42")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ShuffleConfig {
    /// Rendering DPI used when rasterising each PDF page. Range: 72–600. Default: 200.
    pub dpi: u32,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 6000.
    ///
    /// Caps a huge page (A0 poster at 200 DPI) so pdfium never allocates an
    /// unbounded bitmap. The other dimension is scaled proportionally.
    pub max_rendered_pixels: u32,

    /// Band removed from the top and from the bottom of every page, in pixels. Default: 150.
    ///
    /// Applied identically to every page; the exam is assumed to carry the
    /// same header and footer layout throughout.
    pub margin_px: u32,

    /// Channel value at or above which a pixel counts as blank. Default: 245.
    pub blank_threshold: u8,

    /// Blank rows kept below the lowest content row when trimming. Default: 0.
    pub trim_padding: u32,

    /// What a page shorter than twice the margin does to the run. Default: pass-through.
    pub short_pages: ShortPagePolicy,

    /// Format tried first when writing rasterised pages. Default: PNG.
    pub primary_format: RasterFormat,

    /// Format used for a page whose primary write failed. Default: JPEG.
    pub fallback_format: RasterFormat,

    /// JPEG quality (1–100) for lossy writes. Default: 95.
    pub jpeg_quality: u8,

    /// DPI used to size image pages when converting them back to PDF.
    ///
    /// `None` (default) reuses [`ShuffleConfig::dpi`], so a page that was
    /// never cropped comes back at its original physical size.
    pub image_pdf_dpi: Option<u32>,

    /// Directory for intermediate raster images.
    ///
    /// `None` (default) creates a fresh temporary directory per run, removed
    /// when the run returns. Set it when the intermediate images must outlive
    /// the run; the caller then owns their cleanup.
    pub scratch_dir: Option<PathBuf>,

    /// Write a zip bundle of the intermediate images and final PDF here. Default: none.
    pub archive: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Explicit path to the pdfium shared library. Default: search.
    pub pdfium_library: Option<PathBuf>,

    /// Optional per-page progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ShuffleConfig {
    fn default() -> Self {
        Self {
            dpi: 200,
            max_rendered_pixels: 6000,
            margin_px: 150,
            blank_threshold: 245,
            trim_padding: 0,
            short_pages: ShortPagePolicy::default(),
            primary_format: RasterFormat::Png,
            fallback_format: RasterFormat::Jpeg,
            jpeg_quality: 95,
            image_pdf_dpi: None,
            scratch_dir: None,
            archive: None,
            password: None,
            pdfium_library: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ShuffleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShuffleConfig")
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("margin_px", &self.margin_px)
            .field("blank_threshold", &self.blank_threshold)
            .field("trim_padding", &self.trim_padding)
            .field("short_pages", &self.short_pages)
            .field("primary_format", &self.primary_format)
            .field("fallback_format", &self.fallback_format)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("image_pdf_dpi", &self.image_pdf_dpi)
            .field("scratch_dir", &self.scratch_dir)
            .field("archive", &self.archive)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pdfium_library", &self.pdfium_library)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ShuffleProgressCallback>"),
            )
            .finish()
    }
}

impl ShuffleConfig {
    /// Create a new builder for `ShuffleConfig`.
    pub fn builder() -> ShuffleConfigBuilder {
        ShuffleConfigBuilder {
            config: Self::default(),
        }
    }

    /// The DPI image pages are laid out at when converted back to PDF.
    pub fn effective_image_pdf_dpi(&self) -> u32 {
        self.image_pdf_dpi.unwrap_or(self.dpi)
    }

    /// The crop parameters the Cropper stage needs.
    pub fn crop_settings(&self) -> CropSettings {
        CropSettings {
            margin_px: self.margin_px,
            blank_threshold: self.blank_threshold,
            trim_padding: self.trim_padding,
            jpeg_quality: self.jpeg_quality,
        }
    }

    /// The primary/fallback pair used when writing page rasters.
    pub fn raster_formats(&self) -> RasterFormats {
        RasterFormats {
            primary: self.primary_format,
            fallback: Some(self.fallback_format).filter(|f| *f != self.primary_format),
            jpeg_quality: self.jpeg_quality,
        }
    }
}

/// Builder for [`ShuffleConfig`].
#[derive(Debug)]
pub struct ShuffleConfigBuilder {
    config: ShuffleConfig,
}

impl ShuffleConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.clamp(100, i32::MAX as u32);
        self
    }

    pub fn margin_px(mut self, px: u32) -> Self {
        self.config.margin_px = px;
        self
    }

    pub fn blank_threshold(mut self, threshold: u8) -> Self {
        self.config.blank_threshold = threshold;
        self
    }

    pub fn trim_padding(mut self, rows: u32) -> Self {
        self.config.trim_padding = rows;
        self
    }

    pub fn short_pages(mut self, policy: ShortPagePolicy) -> Self {
        self.config.short_pages = policy;
        self
    }

    pub fn primary_format(mut self, format: RasterFormat) -> Self {
        self.config.primary_format = format;
        self
    }

    pub fn fallback_format(mut self, format: RasterFormat) -> Self {
        self.config.fallback_format = format;
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn image_pdf_dpi(mut self, dpi: u32) -> Self {
        self.config.image_pdf_dpi = Some(dpi);
        self
    }

    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.scratch_dir = Some(dir.into());
        self
    }

    pub fn archive(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.archive = Some(path.into());
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pdfium_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library = Some(path.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ShuffleConfig, ShuffleError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 600 {
            return Err(ShuffleError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if let Some(dpi) = c.image_pdf_dpi {
            if dpi == 0 {
                return Err(ShuffleError::InvalidConfig(
                    "Image PDF DPI must be ≥ 1".into(),
                ));
            }
        }
        if c.jpeg_quality == 0 || c.jpeg_quality > 100 {
            return Err(ShuffleError::InvalidConfig(format!(
                "JPEG quality must be 1–100, got {}",
                c.jpeg_quality
            )));
        }
        Ok(self.config)
    }
}

// ── Stage parameter bundles ──────────────────────────────────────────────

/// Parameters of the Cropper stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropSettings {
    /// Band removed from top and bottom, in pixels.
    pub margin_px: u32,
    /// Channel value at or above which a pixel counts as blank.
    pub blank_threshold: u8,
    /// Blank rows kept below the content.
    pub trim_padding: u32,
    /// Quality used when the cropped page is written as JPEG.
    pub jpeg_quality: u8,
}

impl Default for CropSettings {
    fn default() -> Self {
        ShuffleConfig::default().crop_settings()
    }
}

/// The primary/fallback format contract for raster writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RasterFormats {
    pub primary: RasterFormat,
    /// `None` disables the fallback: a failed primary write is an error.
    pub fallback: Option<RasterFormat>,
    pub jpeg_quality: u8,
}

impl Default for RasterFormats {
    fn default() -> Self {
        ShuffleConfig::default().raster_formats()
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// On-disk encoding of a rasterised page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterFormat {
    /// Lossless bitmap (default).
    Png,
    /// Lossy fallback.
    Jpeg,
}

impl RasterFormat {
    /// File extension written for this format (no leading dot).
    pub fn extension(self) -> &'static str {
        match self {
            RasterFormat::Png => "png",
            RasterFormat::Jpeg => "jpg",
        }
    }

    /// Guess the format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(RasterFormat::Png),
            "jpg" | "jpeg" => Some(RasterFormat::Jpeg),
            _ => None,
        }
    }
}

/// What happens to the run when a page is too short for the margin crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortPagePolicy {
    /// Keep the page uncropped and carry on (default).
    #[default]
    PassThrough,
    /// Abort the run with [`ShuffleError::MarginExceedsImage`].
    Fail,
}
