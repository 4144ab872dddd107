//! Vertical stacking of page images into one composite.
//!
//! Image `i` is pasted at `x = 0`, `y = sum of the heights before it`. The
//! canvas is as wide as the widest input; anything to the right of a
//! narrower image stays fully transparent. Nothing is scaled.

use crate::error::ShuffleError;
use crate::output::CompositeImage;
use image::{imageops, DynamicImage, RgbaImage};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Stack `images` top to bottom onto a transparent RGBA canvas.
///
/// # Errors
/// [`ShuffleError::EmptyInputSet`] for no images;
/// [`ShuffleError::ImageTooLarge`] if the summed height does not fit in `u32`
/// or the canvas would not fit in memory.
pub fn stack_vertically(images: &[DynamicImage]) -> Result<RgbaImage, ShuffleError> {
    if images.is_empty() {
        return Err(ShuffleError::EmptyInputSet {
            operation: "combine",
        });
    }

    let width = images.iter().map(|i| i.width()).max().unwrap_or(0);
    let total_height: u64 = images.iter().map(|i| u64::from(i.height())).sum();

    let too_large = || ShuffleError::ImageTooLarge {
        width: u64::from(width),
        height: total_height,
    };
    let height = u32::try_from(total_height).map_err(|_| too_large())?;
    let bytes = u64::from(width) * total_height * 4;
    if usize::try_from(bytes).is_err() {
        return Err(too_large());
    }

    let mut canvas = RgbaImage::new(width, height);
    let mut y: i64 = 0;
    for img in images {
        imageops::replace(&mut canvas, &img.to_rgba8(), 0, y);
        y += i64::from(img.height());
    }

    Ok(canvas)
}

/// Read `inputs` in order, stack them, and write the composite as PNG.
pub fn combine_images(inputs: &[PathBuf], output: &Path) -> Result<CompositeImage, ShuffleError> {
    if inputs.is_empty() {
        return Err(ShuffleError::EmptyInputSet {
            operation: "combine",
        });
    }

    let images = inputs
        .iter()
        .map(|p| {
            image::open(p).map_err(|e| ShuffleError::ImageReadFailed {
                path: p.clone(),
                detail: e.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let canvas = stack_vertically(&images)?;
    canvas
        .save_with_format(output, image::ImageFormat::Png)
        .map_err(|e| ShuffleError::ImageWriteFailed {
            path: output.to_path_buf(),
            detail: e.to_string(),
        })?;

    debug!(
        "Combined {} images → {}x{} ({})",
        inputs.len(),
        canvas.width(),
        canvas.height(),
        output.display()
    );

    Ok(CompositeImage {
        path: output.to_path_buf(),
        width: canvas.width(),
        height: canvas.height(),
        sources: inputs.to_vec(),
    })
}
