//! PDF document model binding

pub mod document;
pub mod page;
pub mod remove;

// Re-export commonly used items
pub use document::{PageMut, PageView};
pub use page::{PageContent, PageTree, Resource, ResourceKind, ResourceView};
pub use remove::{remove_watermarks_from_file, scan_file, RemovalOptions};
