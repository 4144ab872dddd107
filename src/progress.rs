//! Progress-callback trait for per-page pipeline events.
//!
//! Inject an [`Arc<dyn ShuffleProgressCallback>`] via
//! [`crate::config::ShuffleConfigBuilder::progress_callback`] to receive
//! events as the pipeline processes each page. The pipeline itself is
//! single-threaded, but the trait is `Send + Sync` so a callback can travel
//! with the config into [`crate::shuffle::shuffle_async`].
//!
//! # Example
//!
//! ```rust
//! use exam_shuffle::{ShuffleConfig, ShuffleProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     cropped: AtomicUsize,
//! }
//!
//! impl ShuffleProgressCallback for CountingCallback {
//!     fn on_page_cropped(&self, index: usize, total_pages: usize, height: u32) {
//!         self.cropped.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("page {}/{} cropped to {}px", index + 1, total_pages, height);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { cropped: AtomicUsize::new(0) });
//!
//! let config = ShuffleConfig::builder()
//!     .progress_callback(counter as Arc<dyn ShuffleProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline as pages move through its stages.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Page indices are 0-based.
pub trait ShuffleProgressCallback: Send + Sync {
    /// Called once after the document is opened, before any page is rendered.
    fn on_shuffle_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called after a page has been rasterised and written to scratch.
    fn on_page_rendered(&self, index: usize, total_pages: usize) {
        let _ = (index, total_pages);
    }

    /// Called after a page has been cropped.
    ///
    /// * `height`: final height of the page image in pixels
    fn on_page_cropped(&self, index: usize, total_pages: usize, height: u32) {
        let _ = (index, total_pages, height);
    }

    /// Called when a page is kept uncropped because it is shorter than twice
    /// the margin.
    fn on_page_passed_through(&self, index: usize, total_pages: usize, reason: &str) {
        let _ = (index, total_pages, reason);
    }

    /// Called once after the output PDF has been written.
    ///
    /// * `output_pages`: pages in the assembled PDF
    fn on_shuffle_complete(&self, total_pages: usize, output_pages: usize) {
        let _ = (total_pages, output_pages);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ShuffleProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ShuffleConfig`].
pub type ProgressCallback = Arc<dyn ShuffleProgressCallback>;
