//! Resource candidate scanning

use tracing::debug;

use crate::content::CandidateSet;
use crate::pdf::{ResourceKind, ResourceView};
use super::matcher::Matcher;

/// Watermark candidates found on one page for one variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidates {
    /// Sub-dictionary the names were found in
    pub kind: ResourceKind,
    /// Matched resource names
    pub names: CandidateSet,
}

impl Candidates {
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Apply `matcher` to every entry of the page's resource sub-dictionary it inspects.
///
/// Entries that fail to resolve are left out of the result.
pub fn scan_page<P: ResourceView + ?Sized>(page: &P, matcher: &Matcher) -> Candidates {
    let kind = matcher.resource_kind();
    let mut names = CandidateSet::new();

    for name in page.resource_names(kind) {
        match page.resolve_resource(kind, &name) {
            Ok(resource) => {
                if matcher.matches(&name, &resource) {
                    names.insert(name);
                }
            }
            Err(e) => {
                debug!(variant = matcher.label(), error = %e, "skipping unresolved resource");
            }
        }
    }

    Candidates { kind, names }
}
