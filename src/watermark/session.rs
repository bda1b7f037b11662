//! Document-wide watermark removal

use std::fmt;

use tracing::{info, info_span, warn};

use crate::content::FilterStats;
use crate::error::Error;
use crate::pdf::PageTree;
use super::matcher::{default_registry, Matcher};
use super::rewriter::{rewrite_page, PageOutcome};
use super::scanner::{scan_page, Candidates};

/// Hooks invoked while a document is processed. All default to no-ops.
pub trait RemovalCallback<D: ?Sized> {
    /// Called once before the first page is processed
    fn on_start(&mut self, _document: &D) {}

    /// Called once for every page/variant pair that failed
    fn on_removal_error(&mut self, _failure: &RemovalFailure) {}

    /// Called once after the last page was processed
    fn on_finished(&mut self, _document: &D) {}
}

impl<D: ?Sized> RemovalCallback<D> for () {}

/// A page/variant pair that could not be rewritten
#[derive(Debug)]
pub struct RemovalFailure {
    /// 1-based page number
    pub page: usize,
    /// Label of the variant being removed
    pub variant: &'static str,
    pub error: Error,
}

impl fmt::Display for RemovalFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page {} ({} watermark): {}", self.page, self.variant, self.error)
    }
}

/// Summary of one removal run
#[derive(Debug, Default)]
pub struct RemovalReport {
    /// Pages visited
    pub pages: usize,
    /// Page/variant pairs whose content was rewritten
    pub rewrites: usize,
    /// Resource entries dropped
    pub resources_removed: usize,
    /// Operations removed from content streams
    pub stats: FilterStats,
    /// Page/variant pairs that failed, in processing order
    pub failures: Vec<RemovalFailure>,
}

impl RemovalReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Candidates of one variant on one page, as reported by a dry run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageScan {
    /// 1-based page number
    pub page: usize,
    pub variant: &'static str,
    pub candidates: Candidates,
}

/// Removes a fixed list of watermark variants from every page of a document
#[derive(Debug, Clone)]
pub struct WatermarkSession {
    matchers: Vec<Matcher>,
}

impl Default for WatermarkSession {
    fn default() -> Self {
        Self::new(default_registry())
    }
}

impl WatermarkSession {
    pub fn new(matchers: Vec<Matcher>) -> Self {
        Self { matchers }
    }

    /// Remove every variant from every page, in page order.
    ///
    /// A failing page/variant pair is reported through `callback` and in the
    /// returned report; processing carries on with the next pair.
    pub fn run<D, C>(&self, document: &mut D, callback: &mut C) -> RemovalReport
    where
        D: PageTree + ?Sized,
        C: RemovalCallback<D> + ?Sized,
    {
        let span = info_span!("remove_watermarks", variants = self.matchers.len());
        let _guard = span.enter();

        callback.on_start(&*document);

        let mut report = RemovalReport::default();
        for (index, page_id) in document.page_ids().into_iter().enumerate() {
            let number = index + 1;
            report.pages += 1;

            for matcher in &self.matchers {
                let mut page = document.page(page_id);
                match rewrite_page(&mut page, matcher) {
                    Ok(PageOutcome::Untouched) => {}
                    Ok(PageOutcome::Rewritten { candidates, stats }) => {
                        report.rewrites += 1;
                        report.resources_removed += candidates.names.len();
                        report.stats.absorb(stats);
                    }
                    Err(error) => {
                        warn!(page = number, variant = matcher.label(), error = %error, "watermark removal failed");
                        let failure = RemovalFailure {
                            page: number,
                            variant: matcher.label(),
                            error,
                        };
                        callback.on_removal_error(&failure);
                        report.failures.push(failure);
                    }
                }
            }
        }

        callback.on_finished(&*document);

        info!(
            pages = report.pages,
            rewrites = report.rewrites,
            resources = report.resources_removed,
            operations = report.stats.total(),
            failures = report.failures.len(),
            "watermark removal finished"
        );
        report
    }

    /// Report the candidates of every variant on every page without changing anything
    pub fn scan<D: PageTree + ?Sized>(&self, document: &D) -> Vec<PageScan> {
        let mut found = Vec::new();
        for (index, page_id) in document.page_ids().into_iter().enumerate() {
            let page = document.view(page_id);
            for matcher in &self.matchers {
                let candidates = scan_page(&page, matcher);
                if !candidates.is_empty() {
                    found.push(PageScan {
                        page: index + 1,
                        variant: matcher.label(),
                        candidates,
                    });
                }
            }
        }
        found
    }
}

/// Remove the built-in watermark variants from `document`
pub fn remove_watermarks<D: PageTree + ?Sized>(document: &mut D) -> RemovalReport {
    WatermarkSession::default().run(document, &mut ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Token;
    use crate::error::Result;
    use crate::pdf::{PageContent, Resource, ResourceKind, ResourceView};
    use lopdf::Dictionary;

    #[derive(Debug, Clone, PartialEq)]
    struct MemoryPage {
        states: Vec<Vec<u8>>,
        tokens: Vec<Token>,
        fail_commit: bool,
    }

    impl MemoryPage {
        fn watermarked() -> Self {
            Self {
                states: vec![b"Xi0".to_vec()],
                tokens: vec![
                    Token::name("Xi0"),
                    Token::op("gs"),
                    Token::text("DRAFT"),
                    Token::op("Tj"),
                ],
                fail_commit: false,
            }
        }
    }

    impl ResourceView for MemoryPage {
        fn resource_names(&self, kind: ResourceKind) -> Vec<Vec<u8>> {
            match kind {
                ResourceKind::ExtGState => self.states.clone(),
                ResourceKind::XObject => Vec::new(),
            }
        }

        fn resolve_resource(&self, _kind: ResourceKind, _name: &[u8]) -> Result<Resource> {
            Ok(Resource::GraphicsState(Dictionary::new()))
        }

        fn content_tokens(&self) -> Result<Vec<Token>> {
            Ok(self.tokens.clone())
        }
    }

    impl PageContent for MemoryPage {
        fn remove_resource(&mut self, _kind: ResourceKind, name: &[u8]) {
            self.states.retain(|state| state != name);
        }

        fn set_content_tokens(&mut self, tokens: Vec<Token>) -> Result<()> {
            if self.fail_commit {
                return Err(Error::Io(std::io::Error::new(std::io::ErrorKind::Other, "write failed")));
            }
            self.tokens = tokens;
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    struct MemoryDocument {
        pages: Vec<MemoryPage>,
    }

    impl PageTree for MemoryDocument {
        type PageId = usize;
        type View<'a> = &'a MemoryPage where Self: 'a;
        type Page<'a> = &'a mut MemoryPage where Self: 'a;

        fn page_ids(&self) -> Vec<usize> {
            (0..self.pages.len()).collect()
        }

        fn view(&self, id: usize) -> &MemoryPage {
            &self.pages[id]
        }

        fn page(&mut self, id: usize) -> &mut MemoryPage {
            &mut self.pages[id]
        }
    }

    #[derive(Debug, Default)]
    struct Recorder {
        started: usize,
        finished: usize,
        failed_pages: Vec<usize>,
    }

    impl RemovalCallback<MemoryDocument> for Recorder {
        fn on_start(&mut self, _document: &MemoryDocument) {
            self.started += 1;
        }

        fn on_removal_error(&mut self, failure: &RemovalFailure) {
            self.failed_pages.push(failure.page);
        }

        fn on_finished(&mut self, _document: &MemoryDocument) {
            self.finished += 1;
        }
    }

    #[test]
    fn test_failure_on_one_page_does_not_stop_the_others() {
        let mut document = MemoryDocument {
            pages: vec![
                MemoryPage::watermarked(),
                MemoryPage {
                    fail_commit: true,
                    ..MemoryPage::watermarked()
                },
                MemoryPage::watermarked(),
            ],
        };
        let mut recorder = Recorder::default();

        let report = WatermarkSession::default().run(&mut document, &mut recorder);

        assert_eq!(recorder.started, 1);
        assert_eq!(recorder.finished, 1);
        assert_eq!(recorder.failed_pages, vec![2]);
        assert_eq!(report.pages, 3);
        assert_eq!(report.rewrites, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].variant, "gstate");

        for index in [0, 2] {
            assert!(document.pages[index].tokens.is_empty());
            assert!(document.pages[index].states.is_empty());
        }
        assert_eq!(document.pages[1], MemoryPage { fail_commit: true, ..MemoryPage::watermarked() });
    }

    #[test]
    fn test_clean_document_is_untouched() {
        let clean = MemoryPage {
            states: vec![b"GS0".to_vec()],
            tokens: vec![Token::name("GS0"), Token::op("gs"), Token::text("body"), Token::op("Tj")],
            fail_commit: false,
        };
        let mut document = MemoryDocument {
            pages: vec![clean.clone(), clean.clone()],
        };

        let report = remove_watermarks(&mut document);

        assert!(report.is_clean());
        assert_eq!(report.rewrites, 0);
        assert_eq!(document.pages, vec![clean.clone(), clean]);
    }

    #[test]
    fn test_scan_reports_without_mutating() {
        let document = MemoryDocument {
            pages: vec![MemoryPage::watermarked()],
        };

        let scans = WatermarkSession::default().scan(&document);

        assert_eq!(scans.len(), 1);
        assert_eq!(scans[0].page, 1);
        assert_eq!(scans[0].variant, "gstate");
        assert_eq!(scans[0].candidates.names.display_names(), vec!["Xi0"]);
        assert_eq!(document.pages[0], MemoryPage::watermarked());
    }
}
