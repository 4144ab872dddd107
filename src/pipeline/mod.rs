//! Pipeline stages for exam page shuffling.
//!
//! Each submodule implements exactly one transformation step and takes the
//! directories it reads and writes as arguments, so every stage can be run
//! and tested on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ crop ──▶ combine ──▶ assemble ──▶ archive
//! (check)   (pdfium)   (trim)   (stack)     (lopdf)      (zip)
//! ```
//!
//! 1. [`input`]   : check the source path and its `%PDF` magic
//! 2. [`render`]  : rasterise every page to `page_{i}.{ext}`; blocking,
//!    since pdfium is not async-safe
//! 3. [`encode`]  : write rasters with the primary/fallback format contract
//! 4. [`crop`]    : strip the fixed header/footer band, then trailing
//!    whitespace
//! 5. [`combine`] : stack the pages of a grouped output slot into one image
//! 6. [`assemble`]: lay the slot images out as PDF pages and merge them in
//!    slot order
//! 7. [`archive`] : bundle the intermediate images and the final PDF

pub mod archive;
pub mod assemble;
pub mod combine;
pub mod crop;
pub mod encode;
pub mod input;
pub mod render;
