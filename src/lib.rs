//! # exam-shuffle
//!
//! Rasterise an exam PDF, crop each page's header and footer band, and
//! reassemble the pages into a new PDF in a caller-supplied order.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Render    one image per page via pdfium (blocking)
//!  ├─ 2. Crop      fixed top/bottom margin, then trailing whitespace
//!  ├─ 3. Reorder   PageOrder maps source pages to output slots
//!  ├─ 4. Combine   pages sharing a slot are stacked into one image
//!  ├─ 5. Assemble  slot images → one PDF (printpdf + lopdf)
//!  └─ 6. Archive   optional zip of the intermediate images and the PDF
//! ```
//!
//! Which order to use is not this crate's decision: pass any [`PageOrder`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use exam_shuffle::{shuffle, PageOrder, ShuffleConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ShuffleConfig::builder()
//!         .margin_px(150)
//!         .archive("exam-bundle.zip")
//!         .build()?;
//!     let order: PageOrder = "2,0,3,1".parse()?;
//!     let output = shuffle("exam.pdf", "exam-shuffled.pdf", &order, &config)?;
//!     eprintln!("{} pages written", output.stats.output_pages);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `exam-shuffle` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! exam-shuffle = { version = "0.1", default-features = false }
//! ```
//!
//! ## PDFium
//!
//! Rendering needs the pdfium shared library at runtime. See
//! [`engine::bind_pdfium`] for where it is looked up.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod engine;
pub mod error;
pub mod order;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod shuffle;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    CropSettings, RasterFormat, RasterFormats, ShortPagePolicy, ShuffleConfig,
    ShuffleConfigBuilder,
};
pub use error::ShuffleError;
pub use order::PageOrder;
pub use output::{
    ArchiveInfo, AssembledPdf, CompositeImage, CropRegion, CroppedPage, DocumentMetadata,
    RasterPage, ShuffleOutput, ShuffleStats,
};
pub use pipeline::archive::create_zip;
pub use pipeline::assemble::{assemble_pdf, image_to_pdf};
pub use pipeline::combine::{combine_images, stack_vertically};
pub use pipeline::crop::{content_bottom, crop_image, margin_region};
pub use pipeline::render::rasterize_pdf;
pub use progress::{NoopProgressCallback, ProgressCallback, ShuffleProgressCallback};
pub use shuffle::{inspect, shuffle, shuffle_async};
