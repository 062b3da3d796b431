//! MuPDF backend: native text search returning glyph-run quads.
//!
//! MuPDF handles are not thread-safe; each request opens its own document
//! and the handle is freed when the `MupdfDocument` is dropped.

use super::{PdfBackend, PdfBackendType, PdfDocument, PdfError, PdfPage, Quad};

/// Upper bound on hits reported per page search.
const MAX_HITS: u32 = 64;

#[derive(Debug, Default)]
pub struct MupdfBackend;

impl MupdfBackend {
    pub fn new() -> Self {
        Self
    }
}

impl PdfBackend for MupdfBackend {
    fn backend_type(&self) -> PdfBackendType {
        PdfBackendType::Mupdf
    }

    fn is_available(&self) -> bool {
        true
    }

    fn availability_hint(&self) -> String {
        "MuPDF is linked into this build".to_string()
    }

    fn open(&self, bytes: &[u8]) -> Result<Box<dyn PdfDocument>, PdfError> {
        let doc = mupdf::Document::from_bytes(bytes, "application/pdf")
            .map_err(|e| PdfError::DocumentUnreadable(e.to_string()))?;
        let page_count = doc
            .page_count()
            .map_err(|e| PdfError::DocumentUnreadable(e.to_string()))?;
        Ok(Box::new(MupdfDocument {
            doc,
            page_count: page_count.max(0) as usize,
        }))
    }
}

struct MupdfDocument {
    doc: mupdf::Document,
    page_count: usize,
}

impl PdfDocument for MupdfDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn load_page(&self, index: usize) -> Result<Box<dyn PdfPage + '_>, PdfError> {
        if index >= self.page_count {
            return Err(PdfError::PageOutOfRange {
                index,
                count: self.page_count,
            });
        }
        let page = self
            .doc
            .load_page(index as i32)
            .map_err(|e| PdfError::SearchFailed(format!("load page {}: {}", index + 1, e)))?;
        Ok(Box::new(MupdfPage { page }))
    }
}

struct MupdfPage {
    page: mupdf::Page,
}

impl PdfPage for MupdfPage {
    fn search(&self, query: &str) -> Result<Vec<Quad>, PdfError> {
        let hits = self
            .page
            .search(query, MAX_HITS)
            .map_err(|e| PdfError::SearchFailed(e.to_string()))?;
        Ok(hits
            .iter()
            .map(|q| {
                Quad::from_coords([
                    q.ul.x as f64,
                    q.ul.y as f64,
                    q.ur.x as f64,
                    q.ur.y as f64,
                    q.ll.x as f64,
                    q.ll.y as f64,
                    q.lr.x as f64,
                    q.lr.y as f64,
                ])
            })
            .collect())
    }

    fn text(&self) -> Result<String, PdfError> {
        self.page
            .to_text()
            .map_err(|e| PdfError::SearchFailed(e.to_string()))
    }
}
