//! Watermark detection and removal

pub mod matcher;
pub mod rewriter;
pub mod scanner;
pub mod session;

// Re-export commonly used items
pub use matcher::{default_registry, Matcher};
pub use rewriter::{rewrite_page, PageOutcome};
pub use scanner::{scan_page, Candidates};
pub use session::{
    remove_watermarks, PageScan, RemovalCallback, RemovalFailure, RemovalReport, WatermarkSession,
};
