//! Whole-run entry points: PDF in, shuffled PDF out.
//!
//! [`shuffle`] drives the stages in order on the calling thread. Every
//! intermediate file lives in one scratch directory, either the one named in
//! [`ShuffleConfig::scratch_dir`] or a fresh temporary directory that is
//! removed when the run returns.

use crate::config::ShuffleConfig;
use crate::engine::bind_pdfium;
use crate::error::ShuffleError;
use crate::order::PageOrder;
use crate::output::{CompositeImage, CroppedPage, DocumentMetadata, ShuffleOutput, ShuffleStats};
use crate::pipeline::{archive, assemble, combine, crop, input, render};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::TempDir;
use tracing::{debug, info};

/// Where a run keeps its intermediate images.
enum Scratch {
    /// Supplied by the caller; left in place afterwards.
    Caller(PathBuf),
    /// Created for this run; deleted on drop.
    Owned(TempDir),
}

impl Scratch {
    fn prepare(config: &ShuffleConfig) -> Result<Self, ShuffleError> {
        match &config.scratch_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir).map_err(|e| ShuffleError::ScratchDirFailed {
                    path: dir.clone(),
                    source: e,
                })?;
                Ok(Scratch::Caller(dir.clone()))
            }
            None => tempfile::Builder::new()
                .prefix("exam-shuffle-")
                .tempdir()
                .map(Scratch::Owned)
                .map_err(|e| ShuffleError::ScratchDirFailed {
                    path: std::env::temp_dir(),
                    source: e,
                }),
        }
    }

    fn path(&self) -> &Path {
        match self {
            Scratch::Caller(p) => p,
            Scratch::Owned(t) => t.path(),
        }
    }

    /// The directory to report back, if it outlives the run.
    fn persistent_path(&self) -> Option<PathBuf> {
        match self {
            Scratch::Caller(p) => Some(p.clone()),
            Scratch::Owned(_) => None,
        }
    }
}

/// Rasterise, crop, reorder and reassemble the pages of `input`.
///
/// # Arguments
/// * `input`: source PDF; never modified
/// * `output_pdf`: where the shuffled PDF is written
/// * `order`: output slot `k` holds the source pages `order.slots()[k]`;
///   a slot with several pages is stacked into one output page
/// * `config`: run configuration
///
/// # Errors
/// Any stage error aborts the run; `output_pdf` is only written once every
/// slot image exists, and atomically.
pub fn shuffle(
    input: impl AsRef<Path>,
    output_pdf: impl AsRef<Path>,
    order: &PageOrder,
    config: &ShuffleConfig,
) -> Result<ShuffleOutput, ShuffleError> {
    let total_start = Instant::now();
    let output_pdf = output_pdf.as_ref();
    let pdf_path = input::resolve_input(input.as_ref())?;
    info!("Starting shuffle: {} → {}", pdf_path.display(), output_pdf.display());

    if order.is_empty() {
        return Err(ShuffleError::EmptyInputSet { operation: "order" });
    }

    let scratch = Scratch::prepare(config)?;
    let scratch_dir = scratch.path();
    debug!("Scratch directory: {}", scratch_dir.display());

    // ── Step 1: Rasterise ────────────────────────────────────────────────
    let render_start = Instant::now();
    let pdfium = bind_pdfium(config.pdfium_library.as_deref())?;
    let rasters = render::rasterize_pdf(
        &pdfium,
        &pdf_path,
        scratch_dir,
        &render::RenderSettings::from_config(config),
        config.password.as_deref(),
        config.progress_callback.as_ref(),
    )?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;
    let total_pages = rasters.len();
    info!("Rendered {} pages in {}ms", total_pages, render_duration_ms);

    order.validate(total_pages)?;
    if order.has_groups() {
        debug!("Order {} stacks some pages onto shared output pages", order);
    }

    // ── Step 2: Crop ─────────────────────────────────────────────────────
    let crop_start = Instant::now();
    let settings = config.crop_settings();
    let mut pages: Vec<CroppedPage> = Vec::with_capacity(total_pages);
    for raster in &rasters {
        let page = crop::crop_page(raster, scratch_dir, &settings, config.short_pages)?;
        if let Some(cb) = &config.progress_callback {
            if page.passed_through {
                cb.on_page_passed_through(page.index, total_pages, "shorter than twice the margin");
            } else {
                cb.on_page_cropped(page.index, total_pages, page.height());
            }
        }
        pages.push(page);
    }
    let crop_duration_ms = crop_start.elapsed().as_millis() as u64;

    // ── Step 3: Reorder and combine ──────────────────────────────────────
    let assemble_start = Instant::now();
    let slots = order.apply(&pages)?;
    let mut composites: Vec<CompositeImage> = Vec::new();
    let mut slot_images: Vec<PathBuf> = Vec::with_capacity(slots.len());
    for (k, slot) in slots.iter().enumerate() {
        match slot.as_slice() {
            [single] => slot_images.push(single.path.clone()),
            group => {
                let inputs: Vec<PathBuf> = group.iter().map(|p| p.path.clone()).collect();
                let out = scratch_dir.join(format!("slot_{}_combined.png", k));
                let composite = combine::combine_images(&inputs, &out)?;
                slot_images.push(composite.path.clone());
                composites.push(composite);
            }
        }
    }

    // ── Step 4: Assemble ─────────────────────────────────────────────────
    if let Some(parent) = output_pdf.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ShuffleError::merge(output_pdf, e))?;
    }
    let pdf = assemble::assemble_pdf(&slot_images, output_pdf, config.effective_image_pdf_dpi())?;
    let assemble_duration_ms = assemble_start.elapsed().as_millis() as u64;

    // ── Step 5: Archive ──────────────────────────────────────────────────
    let archive = match &config.archive {
        Some(dest) => {
            let mut files: Vec<PathBuf> = pages.iter().map(|p| p.path.clone()).collect();
            files.extend(composites.iter().map(|c| c.path.clone()));
            files.push(pdf.path.clone());
            Some(archive::create_zip(&files, dest)?)
        }
        None => None,
    };

    let stats = ShuffleStats {
        total_pages,
        output_pages: pdf.page_count,
        passed_through_pages: pages.iter().filter(|p| p.passed_through).count(),
        fallback_pages: rasters.iter().filter(|r| r.fell_back).count(),
        combined_slots: composites.len(),
        render_duration_ms,
        crop_duration_ms,
        assemble_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Shuffle complete: {} pages → {} output pages, {}ms total",
        stats.total_pages, stats.output_pages, stats.total_duration_ms
    );

    if let Some(cb) = &config.progress_callback {
        cb.on_shuffle_complete(total_pages, stats.output_pages);
    }

    Ok(ShuffleOutput {
        pdf,
        archive,
        pages,
        composites,
        scratch_dir: scratch.persistent_path(),
        stats,
    })
}

/// Run [`shuffle`] on tokio's blocking pool.
///
/// pdfium must not run on an async worker thread, so the whole run moves to
/// `spawn_blocking`.
pub async fn shuffle_async(
    input: impl Into<PathBuf>,
    output_pdf: impl Into<PathBuf>,
    order: PageOrder,
    config: ShuffleConfig,
) -> Result<ShuffleOutput, ShuffleError> {
    let input = input.into();
    let output_pdf = output_pdf.into();
    tokio::task::spawn_blocking(move || shuffle(&input, &output_pdf, &order, &config))
        .await
        .map_err(|e| ShuffleError::Internal(format!("shuffle task failed: {}", e)))?
}

/// Read page count and metadata without rendering anything.
pub fn inspect(
    input: impl AsRef<Path>,
    config: &ShuffleConfig,
) -> Result<DocumentMetadata, ShuffleError> {
    let pdf_path = input::resolve_input(input.as_ref())?;
    let pdfium = bind_pdfium(config.pdfium_library.as_deref())?;
    render::extract_metadata(&pdfium, &pdf_path, config.password.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_scratch_dir_is_created_and_kept() {
        let dir = tempfile::tempdir().unwrap();
        let wanted = dir.path().join("a").join("b");
        let config = ShuffleConfig::builder().scratch_dir(&wanted).build().unwrap();

        let scratch = Scratch::prepare(&config).unwrap();
        assert!(wanted.is_dir());
        assert_eq!(scratch.path(), wanted);
        assert_eq!(scratch.persistent_path(), Some(wanted.clone()));
        drop(scratch);
        assert!(wanted.is_dir());
    }

    #[test]
    fn owned_scratch_dir_is_removed_on_drop() {
        let scratch = Scratch::prepare(&ShuffleConfig::default()).unwrap();
        let path = scratch.path().to_path_buf();
        assert!(path.is_dir());
        assert!(scratch.persistent_path().is_none());
        drop(scratch);
        assert!(!path.exists());
    }

    #[test]
    fn scratch_dir_under_a_file_fails() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = ShuffleConfig::builder()
            .scratch_dir(file.path().join("sub"))
            .build()
            .unwrap();
        assert!(matches!(
            Scratch::prepare(&config),
            Err(ShuffleError::ScratchDirFailed { .. })
        ));
    }

    #[test]
    fn missing_input_fails_before_binding_pdfium() {
        let dir = tempfile::tempdir().unwrap();
        let err = shuffle(
            dir.path().join("missing.pdf"),
            dir.path().join("out.pdf"),
            &PageOrder::identity(1),
            &ShuffleConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ShuffleError::SourceUnreadable { .. }));
        assert!(!dir.path().join("out.pdf").exists());
    }

    #[test]
    fn empty_order_is_rejected() {
        let mut pdf = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut pdf, b"%PDF-1.5\n").unwrap();
        let err = shuffle(
            pdf.path(),
            pdf.path().with_extension("out.pdf"),
            &PageOrder::from_indices(Vec::new()),
            &ShuffleConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ShuffleError::EmptyInputSet { .. }));
    }
}
