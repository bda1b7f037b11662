//! File-level watermark removal using lopdf

use std::path::{Path, PathBuf};

use lopdf::Document;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::watermark::{default_registry, Matcher, PageScan, RemovalReport, WatermarkSession};

/// Options for removing watermarks from a PDF file
#[derive(Debug, Clone)]
pub struct RemovalOptions {
    /// Input PDF file path
    pub input_path: PathBuf,
    /// Output PDF file path
    pub output_path: PathBuf,
    /// Watermark variants to remove, in order
    pub matchers: Vec<Matcher>,
    /// Drop objects no longer referenced (old content streams, removed XObjects)
    pub prune_unused: bool,
}

impl Default for RemovalOptions {
    fn default() -> Self {
        Self {
            input_path: PathBuf::new(),
            output_path: PathBuf::new(),
            matchers: default_registry(),
            prune_unused: true,
        }
    }
}

/// Load a PDF, rejecting missing files and documents without pages
fn load_document(path: &Path) -> Result<Document> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let doc = Document::load(path)?;
    if doc.get_pages().is_empty() {
        return Err(Error::EmptyPdf(path.to_path_buf()));
    }

    Ok(doc)
}

/// Remove watermarks from a PDF file and save the result
///
/// Page-level failures do not abort the run; they are listed in the returned
/// report. Only loading and saving the file itself are fatal.
///
/// # Example
///
/// ```no_run
/// use pdf_unwatermark::pdf::{RemovalOptions, remove_watermarks_from_file};
/// use std::path::PathBuf;
///
/// let options = RemovalOptions {
///     input_path: PathBuf::from("report.pdf"),
///     output_path: PathBuf::from("report-clean.pdf"),
///     ..Default::default()
/// };
///
/// let report = remove_watermarks_from_file(&options).expect("Failed to remove watermarks");
/// assert!(report.is_clean());
/// ```
pub fn remove_watermarks_from_file(options: &RemovalOptions) -> Result<RemovalReport> {
    if options.matchers.is_empty() {
        return Err(Error::General("No watermark variants selected".to_string()));
    }

    let mut doc = load_document(&options.input_path)?;

    let session = WatermarkSession::new(options.matchers.clone());
    let report = session.run(&mut doc, &mut ());

    if options.prune_unused && report.rewrites > 0 {
        let pruned = doc.prune_objects();
        debug!(count = pruned.len(), "pruned unreferenced objects");
    }

    // Rewritten streams are already compressed; other streams stay as they were
    doc.save(&options.output_path)?;

    info!(
        input = %options.input_path.display(),
        output = %options.output_path.display(),
        rewrites = report.rewrites,
        "saved"
    );

    Ok(report)
}

/// List watermark candidates per page without modifying the file
pub fn scan_file(path: &Path, matchers: &[Matcher]) -> Result<Vec<PageScan>> {
    let doc = load_document(path)?;
    Ok(WatermarkSession::new(matchers.to_vec()).scan(&doc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removal_options_default_uses_builtin_variants() {
        let options = RemovalOptions::default();

        assert_eq!(options.matchers, default_registry());
        assert!(options.prune_unused);
    }

    #[test]
    fn test_remove_nonexistent_file() {
        let options = RemovalOptions {
            input_path: PathBuf::from("nonexistent.pdf"),
            output_path: PathBuf::from("out.pdf"),
            ..Default::default()
        };

        let result = remove_watermarks_from_file(&options);
        assert!(matches!(result.unwrap_err(), Error::FileNotFound(_)));
    }

    #[test]
    fn test_remove_without_variants_fails() {
        let options = RemovalOptions {
            input_path: PathBuf::from("nonexistent.pdf"),
            output_path: PathBuf::from("out.pdf"),
            matchers: Vec::new(),
            ..Default::default()
        };

        let result = remove_watermarks_from_file(&options);
        assert!(matches!(result.unwrap_err(), Error::General(_)));
    }

    #[test]
    fn test_scan_nonexistent_file() {
        let result = scan_file(Path::new("nonexistent.pdf"), &default_registry());
        assert!(matches!(result.unwrap_err(), Error::FileNotFound(_)));
    }
}
