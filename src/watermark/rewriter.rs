//! Per-page, per-variant rewrite

use tracing::{debug, info};

use crate::content::{filter_tokens, FilterStats};
use crate::error::Result;
use crate::pdf::PageContent;
use super::matcher::Matcher;
use super::scanner::{scan_page, Candidates};

/// What happened to a page for one variant
#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    /// No candidates; the page was not touched
    Untouched,
    /// Content was rewritten and the candidates dropped from the resources
    Rewritten {
        candidates: Candidates,
        stats: FilterStats,
    },
}

/// Remove one watermark variant from one page.
///
/// Scans the page's resources, filters its content, installs the new content
/// and finally drops the matched resource entries. A page without candidates
/// is returned untouched. If reading or writing the content fails, the page
/// is left exactly as it was.
pub fn rewrite_page<P: PageContent + ?Sized>(page: &mut P, matcher: &Matcher) -> Result<PageOutcome> {
    let candidates = scan_page(&*page, matcher);
    if candidates.is_empty() {
        debug!(variant = matcher.label(), "no candidates");
        return Ok(PageOutcome::Untouched);
    }

    let tokens = page.content_tokens()?;
    let filtered = filter_tokens(tokens, &candidates.names);

    page.set_content_tokens(filtered.tokens)?;
    for name in candidates.names.iter() {
        page.remove_resource(candidates.kind, name);
    }

    info!(
        variant = matcher.label(),
        resources = ?candidates.names.display_names(),
        graphics_states = filtered.stats.graphics_states,
        xobjects = filtered.stats.xobjects,
        text_shows = filtered.stats.text_shows,
        "removed watermark"
    );

    Ok(PageOutcome::Rewritten {
        candidates,
        stats: filtered.stats,
    })
}
