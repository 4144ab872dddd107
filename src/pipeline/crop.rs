//! Page cropping: fixed header/footer margin, then trailing whitespace.
//!
//! The geometry lives in two pure functions, [`margin_region`] and
//! [`content_bottom`]; [`crop_image`] wires them to the filesystem and
//! [`crop_page`] applies the run's short-page policy on top.

use crate::config::{CropSettings, ShortPagePolicy};
use crate::error::ShuffleError;
use crate::output::{CropRegion, CroppedPage, RasterPage};
use crate::pipeline::encode::encode_like_path;
use image::{DynamicImage, GenericImageView};
use std::path::Path;
use tracing::{debug, warn};

/// Geometry of one successful crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropOutcome {
    pub original_width: u32,
    pub original_height: u32,
    /// Region kept, in original image coordinates.
    pub region: CropRegion,
    /// Height after the margin crop, before trimming.
    pub margin_cropped_height: u32,
    pub trimmed_rows: u32,
}

/// Scratch file name for the cropped version of page `index`.
pub fn cropped_file_name(index: usize, extension: &str) -> String {
    format!("page_{}_cropped.{}", index, extension)
}

/// The band left after removing `margin` rows from the top and the bottom.
///
/// Returns `None` when the image is not strictly taller than `2 × margin`
/// (or has no columns), since the band would be empty.
pub fn margin_region(width: u32, height: u32, margin: u32) -> Option<CropRegion> {
    if width == 0 || u64::from(height) <= 2 * u64::from(margin) {
        return None;
    }
    Some(CropRegion {
        left: 0,
        top: margin,
        right: width,
        bottom: height - margin,
    })
}

/// One past the lowest row of `image` holding a non-blank pixel.
///
/// A pixel is blank when it is fully transparent or every colour channel is
/// at least `blank_threshold`. Returns `None` for an entirely blank image.
pub fn content_bottom(image: &DynamicImage, blank_threshold: u8) -> Option<u32> {
    let (width, height) = image.dimensions();
    (0..height).rev().find_map(|y| {
        let has_content = (0..width).any(|x| {
            let px = image.get_pixel(x, y).0;
            px[3] != 0 && px[..3].iter().any(|&c| c < blank_threshold)
        });
        has_content.then_some(y + 1)
    })
}

/// Crop the image at `input` and write the result to `output`.
///
/// The output format follows `output`'s extension. On
/// [`ShuffleError::MarginExceedsImage`] nothing is written and `input` is
/// left untouched.
pub fn crop_image(
    input: &Path,
    output: &Path,
    settings: &CropSettings,
) -> Result<CropOutcome, ShuffleError> {
    let img = image::open(input).map_err(|e| ShuffleError::ImageReadFailed {
        path: input.to_path_buf(),
        detail: e.to_string(),
    })?;
    let (width, height) = img.dimensions();

    let band_region =
        margin_region(width, height, settings.margin_px).ok_or_else(|| {
            ShuffleError::MarginExceedsImage {
                path: input.to_path_buf(),
                height,
                margin: settings.margin_px,
            }
        })?;
    let band = img.crop_imm(
        band_region.left,
        band_region.top,
        band_region.width(),
        band_region.height(),
    );
    let band_height = band.height();

    // An all-blank band keeps its full height rather than collapsing to nothing.
    let kept_height = match content_bottom(&band, settings.blank_threshold) {
        Some(bottom) => bottom.saturating_add(settings.trim_padding).min(band_height),
        None => band_height,
    };

    let region = CropRegion {
        bottom: band_region.top + kept_height,
        ..band_region
    };
    region.validate(width, height)?;

    let cropped = band.crop_imm(0, 0, width, kept_height);
    encode_like_path(&cropped, output, settings.jpeg_quality)?;

    debug!(
        "Cropped {} {}x{} → {}x{} (trimmed {} rows)",
        input.display(),
        width,
        height,
        region.width(),
        region.height(),
        band_height - kept_height
    );

    Ok(CropOutcome {
        original_width: width,
        original_height: height,
        region,
        margin_cropped_height: band_height,
        trimmed_rows: band_height - kept_height,
    })
}

/// Crop one rasterised page into `dest_dir` as `page_{index}_cropped.{ext}`.
///
/// A page too short for the margin is copied unmodified under the same name
/// when `policy` is [`ShortPagePolicy::PassThrough`], and fails the call
/// otherwise.
pub fn crop_page(
    page: &RasterPage,
    dest_dir: &Path,
    settings: &CropSettings,
    policy: ShortPagePolicy,
) -> Result<CroppedPage, ShuffleError> {
    let output = dest_dir.join(cropped_file_name(page.index, page.format.extension()));

    match crop_image(&page.path, &output, settings) {
        Ok(outcome) => Ok(CroppedPage {
            index: page.index,
            path: output,
            original_width: outcome.original_width,
            original_height: outcome.original_height,
            region: outcome.region,
            margin_cropped_height: outcome.margin_cropped_height,
            trimmed_rows: outcome.trimmed_rows,
            passed_through: false,
        }),
        Err(err @ ShuffleError::MarginExceedsImage { .. })
            if policy == ShortPagePolicy::PassThrough =>
        {
            warn!("Page {} left uncropped: {}", page.index, err);
            std::fs::copy(&page.path, &output).map_err(|e| ShuffleError::ImageWriteFailed {
                path: output.clone(),
                detail: e.to_string(),
            })?;
            Ok(CroppedPage {
                index: page.index,
                path: output,
                original_width: page.width,
                original_height: page.height,
                region: CropRegion::full(page.width, page.height),
                margin_cropped_height: page.height,
                trimmed_rows: 0,
                passed_through: true,
            })
        }
        Err(err) => Err(err),
    }
}
