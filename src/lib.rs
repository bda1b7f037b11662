//! PDF Unwatermark Library
//!
//! A cross-platform library for stripping known watermark artifacts from PDF
//! pages. This library provides functionality to:
//! - Identify watermark resources (image/form XObjects, graphics states)
//! - Filter a page's content stream while keeping scopes balanced
//! - Rewrite pages in place, isolating per-page failures
//!
//! # Example
//!
//! ```no_run
//! use pdf_unwatermark::pdf::{RemovalOptions, remove_watermarks_from_file};
//! use std::path::PathBuf;
//!
//! let options = RemovalOptions {
//!     input_path: PathBuf::from("watermarked.pdf"),
//!     output_path: PathBuf::from("clean.pdf"),
//!     ..Default::default()
//! };
//!
//! let report = remove_watermarks_from_file(&options).expect("Failed to remove watermarks");
//! for failure in &report.failures {
//!     eprintln!("{}", failure);
//! }
//! ```

pub mod content;
pub mod error;
pub mod pdf;
pub mod watermark;

// Re-export commonly used items
pub use error::{Error, Result};
pub use watermark::{remove_watermarks, Matcher, RemovalCallback, RemovalReport, WatermarkSession};
