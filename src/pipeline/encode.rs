//! Raster encoding: `DynamicImage` → image file on disk.
//!
//! Writes follow a two-step contract: attempt the primary format; if that
//! fails, attempt the declared fallback; report which format was used. The
//! caller gets the real path back, so no later stage has to guess an
//! extension.

use crate::config::{RasterFormat, RasterFormats};
use crate::error::ShuffleError;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageError};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Result of a raster write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenRaster {
    pub path: PathBuf,
    pub format: RasterFormat,
    /// True when the primary format failed.
    pub fell_back: bool,
}

/// Write `img` as `{dir}/{stem}.{ext}` using the primary format, falling
/// back to `formats.fallback` when the primary write fails.
pub fn write_raster(
    img: &DynamicImage,
    dir: &Path,
    stem: &str,
    formats: &RasterFormats,
) -> Result<WrittenRaster, ShuffleError> {
    let primary_path = dir.join(format!("{}.{}", stem, formats.primary.extension()));
    let primary_err = match encode_to_file(img, &primary_path, formats.primary, formats.jpeg_quality)
    {
        Ok(()) => {
            return Ok(WrittenRaster {
                path: primary_path,
                format: formats.primary,
                fell_back: false,
            })
        }
        Err(e) => e,
    };

    // A half-written primary file must not be mistaken for the page later.
    if primary_path.is_file() {
        let _ = std::fs::remove_file(&primary_path);
    }

    let Some(fallback) = formats.fallback else {
        return Err(ShuffleError::ImageWriteFailed {
            path: primary_path,
            detail: primary_err.to_string(),
        });
    };

    warn!(
        "Writing {} failed ({}); falling back to {}",
        primary_path.display(),
        primary_err,
        fallback.extension()
    );

    let fallback_path = dir.join(format!("{}.{}", stem, fallback.extension()));
    encode_to_file(img, &fallback_path, fallback, formats.jpeg_quality).map_err(|e| {
        ShuffleError::ImageWriteFailed {
            path: fallback_path.clone(),
            detail: format!("{} (primary {} also failed: {})", e, formats.primary.extension(), primary_err),
        }
    })?;

    Ok(WrittenRaster {
        path: fallback_path,
        format: fallback,
        fell_back: true,
    })
}

/// Encode `img` to `path` in exactly one format.
///
/// JPEG has no alpha channel, so the image is flattened to RGB first.
pub fn encode_to_file(
    img: &DynamicImage,
    path: &Path,
    format: RasterFormat,
    jpeg_quality: u8,
) -> Result<(), ImageError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    match format {
        RasterFormat::Png => img.write_to(&mut writer, image::ImageFormat::Png)?,
        RasterFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            let encoder = JpegEncoder::new_with_quality(&mut writer, jpeg_quality);
            rgb.write_with_encoder(encoder)?;
        }
    }

    writer.flush()?;
    debug!(
        "Encoded {}x{} → {}",
        img.width(),
        img.height(),
        path.display()
    );
    Ok(())
}

/// Write `img` in the format implied by `path`'s extension (PNG if unknown).
pub fn encode_like_path(
    img: &DynamicImage,
    path: &Path,
    jpeg_quality: u8,
) -> Result<RasterFormat, ShuffleError> {
    let format = path
        .extension()
        .and_then(|e| e.to_str())
        .and_then(RasterFormat::from_extension)
        .unwrap_or(RasterFormat::Png);

    encode_to_file(img, path, format, jpeg_quality).map_err(|e| ShuffleError::ImageWriteFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    Ok(format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn sample() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(12, 8, Rgb([10, 20, 30])))
    }

    #[test]
    fn primary_png_written() {
        let dir = tempfile::tempdir().unwrap();
        let out = write_raster(&sample(), dir.path(), "page_0", &RasterFormats::default()).unwrap();
        assert_eq!(out.path, dir.path().join("page_0.png"));
        assert_eq!(out.format, RasterFormat::Png);
        assert!(!out.fell_back);

        let back = image::open(&out.path).unwrap();
        assert_eq!((back.width(), back.height()), (12, 8));
    }

    #[test]
    fn falls_back_to_jpeg_when_png_cannot_be_written() {
        let dir = tempfile::tempdir().unwrap();
        // A directory squatting on the PNG path makes the primary write fail.
        std::fs::create_dir(dir.path().join("page_3.png")).unwrap();

        let out = write_raster(&sample(), dir.path(), "page_3", &RasterFormats::default()).unwrap();
        assert_eq!(out.path, dir.path().join("page_3.jpg"));
        assert_eq!(out.format, RasterFormat::Jpeg);
        assert!(out.fell_back);
        assert!(image::open(&out.path).is_ok());
    }

    #[test]
    fn no_fallback_means_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("page_0.png")).unwrap();
        let formats = RasterFormats {
            primary: RasterFormat::Png,
            fallback: None,
            jpeg_quality: 95,
        };
        let err = write_raster(&sample(), dir.path(), "page_0", &formats).unwrap_err();
        assert!(matches!(err, ShuffleError::ImageWriteFailed { .. }));
    }

    #[test]
    fn jpeg_flattens_alpha() {
        let dir = tempfile::tempdir().unwrap();
        let rgba = DynamicImage::ImageRgba8(image::RgbaImage::new(4, 4));
        let path = dir.path().join("x.jpg");
        assert_eq!(encode_like_path(&rgba, &path, 90).unwrap(), RasterFormat::Jpeg);
        assert!(image::open(&path).is_ok());
    }
}
