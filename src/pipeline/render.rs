//! PDF rasterisation: render every page to an image file via pdfium.
//!
//! Pages are rendered one at a time in index order and written to the
//! caller's directory as `page_{index}.{ext}`. Each bitmap is dropped as
//! soon as it is on disk, so memory stays at one page regardless of
//! document length.
//!
//! pdfium keeps thread-local state and is not async-safe; async hosts go
//! through [`crate::shuffle::shuffle_async`], which moves the whole run onto
//! the blocking pool.

use crate::config::{RasterFormats, ShuffleConfig};
use crate::error::ShuffleError;
use crate::output::{DocumentMetadata, RasterPage};
use crate::pipeline::encode::write_raster;
use crate::progress::ProgressCallback;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Points per inch in PDF user space.
const PDF_POINTS_PER_INCH: f32 = 72.0;

/// Rendering parameters for [`rasterize_pdf`].
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub dpi: u32,
    pub max_rendered_pixels: u32,
    pub formats: RasterFormats,
}

impl RenderSettings {
    pub fn from_config(config: &ShuffleConfig) -> Self {
        Self {
            dpi: config.dpi,
            max_rendered_pixels: config.max_rendered_pixels,
            formats: config.raster_formats(),
        }
    }
}

/// Canonical scratch file stem for page `index`.
pub fn page_stem(index: usize) -> String {
    format!("page_{}", index)
}

/// pdfium takes its size limits as `i32`; larger caps saturate.
fn render_pixel_cap(px: u32) -> i32 {
    i32::try_from(px).unwrap_or(i32::MAX)
}

/// Rasterise every page of `pdf_path` into `dest_dir`.
///
/// # Returns
/// One [`RasterPage`] per page, indices `0..N` in increasing order.
///
/// # Errors
/// [`ShuffleError::SourceUnreadable`] if the document cannot be opened or
/// has zero pages; [`ShuffleError::RasterisationFailed`] if pdfium fails on
/// a page.
pub fn rasterize_pdf(
    pdfium: &Pdfium,
    pdf_path: &Path,
    dest_dir: &Path,
    settings: &RenderSettings,
    password: Option<&str>,
    progress: Option<&ProgressCallback>,
) -> Result<Vec<RasterPage>, ShuffleError> {
    let document = load_document(pdfium, pdf_path, password)?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    if total_pages == 0 {
        return Err(ShuffleError::unreadable(pdf_path, "document has no pages"));
    }
    info!("PDF loaded: {} pages", total_pages);

    if let Some(cb) = progress {
        cb.on_shuffle_start(total_pages);
    }

    let max_px = render_pixel_cap(settings.max_rendered_pixels);
    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(settings.dpi as f32 / PDF_POINTS_PER_INCH)
        .set_maximum_width(max_px)
        .set_maximum_height(max_px);

    let mut results = Vec::with_capacity(total_pages);

    for (idx, page) in pages.iter().enumerate() {
        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            ShuffleError::RasterisationFailed {
                page: idx,
                detail: format!("{:?}", e),
            }
        })?;

        // Flatten to RGB: pdfium hands back BGRA and the alpha channel only
        // gets in the way of the blank-row detection later.
        let image = DynamicImage::ImageRgb8(bitmap.as_image().to_rgb8());
        let written = write_raster(&image, dest_dir, &page_stem(idx), &settings.formats)?;

        debug!(
            "Rendered page {} → {}x{} px ({})",
            idx,
            image.width(),
            image.height(),
            written.path.display()
        );

        if let Some(cb) = progress {
            cb.on_page_rendered(idx, total_pages);
        }

        results.push(RasterPage {
            index: idx,
            path: written.path,
            width: image.width(),
            height: image.height(),
            format: written.format,
            fell_back: written.fell_back,
        });
    }

    Ok(results)
}

/// Extract document metadata from a PDF without rendering pages.
pub fn extract_metadata(
    pdfium: &Pdfium,
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<DocumentMetadata, ShuffleError> {
    let document = load_document(pdfium, pdf_path, password)?;

    let metadata = document.metadata();
    let pages = document.pages();

    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    Ok(DocumentMetadata {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        subject: get_meta(PdfDocumentMetadataTagType::Subject),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        page_count: pages.len() as usize,
        pdf_version: format!("{:?}", document.version()),
    })
}

fn load_document<'a>(
    pdfium: &'a Pdfium,
    pdf_path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, ShuffleError> {
    pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        let reason = if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                "wrong password".to_string()
            } else {
                "document is encrypted and needs a password".to_string()
            }
        } else {
            err_str
        };
        ShuffleError::unreadable(pdf_path, reason)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_cap_saturates_instead_of_wrapping() {
        assert_eq!(render_pixel_cap(6000), 6000);
        assert_eq!(render_pixel_cap(i32::MAX as u32), i32::MAX);
        assert_eq!(render_pixel_cap(u32::MAX), i32::MAX);
    }

    #[test]
    fn page_stems_are_zero_based() {
        assert_eq!(page_stem(0), "page_0");
        assert_eq!(page_stem(12), "page_12");
    }

    #[test]
    fn render_settings_follow_config() {
        let config = ShuffleConfig::builder().dpi(150).build().unwrap();
        let s = RenderSettings::from_config(&config);
        assert_eq!(s.dpi, 150);
        assert_eq!(s.formats.primary.extension(), "png");
    }
}
