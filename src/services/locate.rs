//! Excerpt locator: maps excerpt strings to highlight boxes on PDF pages.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::HighlightConfig;
use crate::models::{highlighted_pages, Annotation, BoundingBox, PageMapping};
use crate::pdf::PdfDocument;

use super::segments::build_segments;

/// Outcome of locating a set of excerpts in one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocateResult {
    pub annotations: Vec<Annotation>,
    pub page_mappings: Vec<PageMapping>,
    pub highlighted_pages: Vec<u32>,
    pub total_matches: usize,
    /// The run was abandoned before finishing; results are empty and the
    /// request may be retried.
    #[serde(default)]
    pub timed_out: bool,
}

impl LocateResult {
    pub fn from_annotations(annotations: Vec<Annotation>) -> Self {
        Self {
            page_mappings: PageMapping::from_annotations(&annotations),
            highlighted_pages: highlighted_pages(&annotations),
            total_matches: annotations.len(),
            annotations,
            timed_out: false,
        }
    }

    pub fn abandoned() -> Self {
        Self {
            timed_out: true,
            ..Default::default()
        }
    }
}

/// Boxes already accepted on one page.
#[derive(Debug)]
pub struct PageClaims {
    boxes: Vec<BoundingBox>,
    tolerance: f64,
}

impl PageClaims {
    pub fn new(tolerance: f64) -> Self {
        Self {
            boxes: Vec::new(),
            tolerance,
        }
    }

    /// Accept `bbox` unless it overlaps an accepted box.
    pub fn try_claim(&mut self, bbox: BoundingBox) -> bool {
        if self.boxes.iter().any(|b| b.overlaps(&bbox, self.tolerance)) {
            return false;
        }
        self.boxes.push(bbox);
        true
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }
}

/// Search every page for every segment of `excerpts`.
///
/// Runs synchronously; call from a blocking worker. `cancel` is checked
/// before each page, and a cancelled run returns [`LocateResult::abandoned`].
pub fn locate(
    doc: &dyn PdfDocument,
    excerpts: &[String],
    document_id: &str,
    config: &HighlightConfig,
    cancel: &CancellationToken,
) -> LocateResult {
    let segments = build_segments(excerpts, config);
    if segments.is_empty() {
        return LocateResult::default();
    }

    let style = config.style();
    let mut annotations = Vec::new();

    for index in 0..doc.page_count() {
        if cancel.is_cancelled() {
            debug!("Locate cancelled before page {}", index + 1);
            return LocateResult::abandoned();
        }

        let page = match doc.load_page(index) {
            Ok(page) => page,
            Err(e) => {
                warn!("Skipping page {}: {}", index + 1, e);
                continue;
            }
        };
        let page_number = (index + 1) as u32;
        let mut claims = PageClaims::new(config.overlap_tolerance);

        for segment in &segments {
            let quads = match page.search(&segment.text) {
                Ok(quads) => quads,
                Err(e) => {
                    warn!(
                        "Search for {:?} failed on page {}: {}",
                        segment.text, page_number, e
                    );
                    continue;
                }
            };

            for quad in quads.into_iter().take(config.max_hits_per_search) {
                let bbox = quad.bounding_box();
                if claims.try_claim(bbox) {
                    annotations.push(
                        Annotation::highlight(
                            document_id,
                            page_number,
                            bbox,
                            &segment.excerpt,
                            &style,
                        )
                        .with_matched_text(&segment.text),
                    );
                }
            }
        }

        if !claims.is_empty() {
            debug!("Page {}: {} highlight(s)", page_number, claims.len());
        }
    }

    LocateResult::from_annotations(annotations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::{LayoutDocument, PageLayout, PdfError, PdfPage, Quad};
    use std::cell::RefCell;

    const SENTENCE: &str = "Viruses cannot reproduce independently.";

    fn blank_pages(n: usize) -> Vec<PageLayout> {
        (0..n)
            .map(|i| PageLayout::from_text_lines(&[format!("Filler text on page {}", i + 1).as_str()]))
            .collect()
    }

    fn run(doc: &dyn PdfDocument, excerpts: &[&str]) -> LocateResult {
        let excerpts: Vec<String> = excerpts.iter().map(|s| s.to_string()).collect();
        locate(
            doc,
            &excerpts,
            "doc-1",
            &HighlightConfig::default(),
            &CancellationToken::new(),
        )
    }

    fn assert_no_overlaps(result: &LocateResult) {
        for (i, a) in result.annotations.iter().enumerate() {
            for b in &result.annotations[i + 1..] {
                if a.page_number == b.page_number {
                    let (ab, bb) = (a.bounding_box().unwrap(), b.bounding_box().unwrap());
                    assert!(!ab.overlaps(&bb, 10.0), "{:?} overlaps {:?}", ab, bb);
                }
            }
        }
    }

    #[test]
    fn test_verbatim_excerpt_on_page_five() {
        let mut pages = blank_pages(6);
        pages[4] = PageLayout::from_text_lines(&[
            "Chapter two covers replication.",
            SENTENCE,
        ]);
        let expected = pages[4].find(SENTENCE)[0].bounding_box();
        let doc = LayoutDocument::new(pages);

        let result = run(&doc, &[SENTENCE]);
        assert_eq!(result.annotations.len(), 1);
        let annotation = &result.annotations[0];
        assert_eq!(annotation.page_number, 5);
        assert_eq!(annotation.bounding_box(), Some(expected));
        assert_eq!(annotation.excerpt, SENTENCE);
        assert_eq!(annotation.document_id, "doc-1");
        assert_eq!(result.highlighted_pages, vec![5]);
        assert_eq!(result.total_matches, 1);
        assert_eq!(
            result.page_mappings,
            vec![PageMapping {
                excerpt: SENTENCE.to_string(),
                pages: vec![5]
            }]
        );
    }

    #[test]
    fn test_longer_segment_suppresses_overlapping_shorter() {
        let long = "The mitochondria is the powerhouse of the cell and produces energy.";
        let short = "powerhouse of the cell and produces";
        let mut pages = blank_pages(4);
        pages[2] = PageLayout::from_text_lines(&[long]);
        let doc = LayoutDocument::new(pages);

        // Input order does not matter: the longer segment is searched first.
        for excerpts in [[long, short], [short, long]] {
            let result = run(&doc, &excerpts);
            assert_eq!(result.annotations.len(), 1);
            assert_eq!(result.annotations[0].page_number, 3);
            assert_eq!(result.annotations[0].excerpt, long);
            assert_eq!(result.highlighted_pages, vec![3]);
        }
    }

    #[test]
    fn test_distinct_regions_on_same_page() {
        let doc = LayoutDocument::new(vec![PageLayout::from_text_lines(&[
            "Ribosomes translate messenger RNA into protein.",
            "",
            "",
            "Lysosomes digest worn out organelles and debris.",
        ])]);
        let result = run(
            &doc,
            &[
                "Ribosomes translate messenger RNA into protein.",
                "Lysosomes digest worn out organelles and debris.",
            ],
        );
        assert_eq!(result.annotations.len(), 2);
        assert_eq!(result.page_mappings.len(), 2);
        assert_no_overlaps(&result);
    }

    #[test]
    fn test_paraphrased_excerpt_hits_by_window() {
        let doc = LayoutDocument::new(vec![PageLayout::from_text_lines(&[
            "In most cases the immune system clears the infection within days.",
        ])]);
        let excerpt = "Usually the immune system clears the infection within a week.";
        let result = run(&doc, &[excerpt]);
        assert!(!result.annotations.is_empty());
        assert_no_overlaps(&result);
        // Tagged with the parent excerpt, matched on a window
        let annotation = &result.annotations[0];
        assert_eq!(annotation.excerpt, excerpt);
        assert_eq!(
            annotation.matched_text.as_deref(),
            Some("immune system clears the infection within")
        );
    }

    #[test]
    fn test_multi_line_hit_respects_overlap_invariant() {
        let doc = LayoutDocument::new(vec![PageLayout::from_text_lines(&[
            "Enzymes lower the activation energy of",
            "chemical reactions in living organisms.",
        ])]);
        let result = run(
            &doc,
            &["Enzymes lower the activation energy of chemical reactions in living organisms."],
        );
        assert!(!result.annotations.is_empty());
        assert_no_overlaps(&result);
    }

    #[test]
    fn test_empty_and_unmatched_inputs() {
        let doc = LayoutDocument::new(blank_pages(2));
        assert_eq!(run(&doc, &[]), LocateResult::default());
        let result = run(&doc, &["This sentence appears nowhere in the document."]);
        assert!(result.annotations.is_empty());
        assert!(result.page_mappings.is_empty());
        assert!(!result.timed_out);
    }

    /// Records every query and fails searches containing `fail_on`.
    struct RecordingDoc {
        inner: LayoutDocument,
        queries: RefCell<Vec<String>>,
        fail_on: &'static str,
    }

    struct RecordingPage<'a> {
        doc: &'a RecordingDoc,
        page: &'a PageLayout,
    }

    impl PdfDocument for RecordingDoc {
        fn page_count(&self) -> usize {
            self.inner.pages.len()
        }

        fn load_page(&self, index: usize) -> Result<Box<dyn PdfPage + '_>, PdfError> {
            Ok(Box::new(RecordingPage {
                doc: self,
                page: &self.inner.pages[index],
            }))
        }
    }

    impl PdfPage for RecordingPage<'_> {
        fn search(&self, query: &str) -> Result<Vec<Quad>, PdfError> {
            self.doc.queries.borrow_mut().push(query.to_string());
            if query.contains(self.doc.fail_on) {
                return Err(PdfError::SearchFailed("malformed query".to_string()));
            }
            Ok(self.page.find(query))
        }

        fn text(&self) -> Result<String, PdfError> {
            Ok(self.page.text())
        }
    }

    #[test]
    fn test_short_excerpts_never_searched() {
        let doc = RecordingDoc {
            inner: LayoutDocument::new(blank_pages(3)),
            queries: RefCell::new(Vec::new()),
            fail_on: "\u{0}",
        };
        let result = run(&doc, &["too short", "tiny"]);
        assert!(result.annotations.is_empty());
        assert!(doc.queries.borrow().is_empty());
    }

    #[test]
    fn test_search_failure_is_skipped() {
        let doc = RecordingDoc {
            inner: LayoutDocument::new(vec![PageLayout::from_text_lines(&[SENTENCE])]),
            queries: RefCell::new(Vec::new()),
            fail_on: "Broken",
        };
        let result = run(&doc, &["Broken excerpt that errors out", SENTENCE]);
        assert_eq!(result.annotations.len(), 1);
        assert_eq!(result.annotations[0].excerpt, SENTENCE);
        assert_eq!(doc.queries.borrow().len(), 2);
    }

    #[test]
    fn test_cancelled_run_is_abandoned() {
        let doc = LayoutDocument::new(vec![PageLayout::from_text_lines(&[SENTENCE])]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = locate(
            &doc,
            &[SENTENCE.to_string()],
            "doc-1",
            &HighlightConfig::default(),
            &cancel,
        );
        assert!(result.timed_out);
        assert!(result.annotations.is_empty());
    }

    #[test]
    fn test_page_claims() {
        let mut claims = PageClaims::new(10.0);
        assert!(claims.try_claim(BoundingBox::new(0.0, 0.0, 100.0, 12.0)));
        // 9 units below: within tolerance
        assert!(!claims.try_claim(BoundingBox::new(0.0, 21.0, 100.0, 12.0)));
        // 11 units below: clear
        assert!(claims.try_claim(BoundingBox::new(0.0, 23.0, 100.0, 12.0)));
        assert_eq!(claims.len(), 2);
    }
}
