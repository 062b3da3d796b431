//! PDF decoding backends.
//!
//! The highlighting core never parses PDF bytes itself. It talks to a
//! backend that can open a document, load pages and run a literal text
//! search returning quads:
//! - Poppler: `pdftotext -bbox-layout` word layout (default)
//! - MuPDF: native text search (`mupdf` feature)

pub mod layout;
#[cfg(feature = "mupdf")]
mod mupdf_backend;
mod poppler;

use thiserror::Error;

use crate::models::BoundingBox;

pub use layout::{LayoutDocument, PageLayout, WordBox};
#[cfg(feature = "mupdf")]
pub use mupdf_backend::MupdfBackend;
pub use poppler::PopplerBackend;

/// Errors from PDF backends.
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Document could not be decoded as PDF: {0}")]
    DocumentUnreadable(String),

    #[error("Backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("Search failed: {0}")]
    SearchFailed(String),

    #[error("Page {index} out of range (document has {count} pages)")]
    PageOutOfRange { index: usize, count: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Corner of a quad.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadPoint {
    pub x: f64,
    pub y: f64,
}

/// A text search hit: the four corners of a matched glyph run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    pub ul: QuadPoint,
    pub ur: QuadPoint,
    pub ll: QuadPoint,
    pub lr: QuadPoint,
}

impl Quad {
    /// Build from eight numbers ordered `ulx, uly, urx, ury, llx, lly, lrx, lry`.
    pub fn from_coords(c: [f64; 8]) -> Self {
        Self {
            ul: QuadPoint { x: c[0], y: c[1] },
            ur: QuadPoint { x: c[2], y: c[3] },
            ll: QuadPoint { x: c[4], y: c[5] },
            lr: QuadPoint { x: c[6], y: c[7] },
        }
    }

    /// Axis-aligned quad covering a rectangle.
    pub fn from_rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self::from_coords([x0, y0, x1, y0, x0, y1, x1, y1])
    }

    /// Envelope of the quad: left edge from the left corners, top from the
    /// upper corners, right from the right corners, bottom from the lower
    /// corners.
    pub fn bounding_box(&self) -> BoundingBox {
        let x0 = self.ul.x.min(self.ll.x);
        let y0 = self.ul.y.min(self.ur.y);
        let x1 = self.ur.x.max(self.lr.x);
        let y1 = self.ll.y.max(self.lr.y);
        BoundingBox::from_corners(x0, y0, x1, y1)
    }
}

/// Available PDF backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PdfBackendType {
    #[default]
    Poppler,
    Mupdf,
}

impl PdfBackendType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PdfBackendType::Poppler => "poppler",
            PdfBackendType::Mupdf => "mupdf",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "poppler" | "pdftotext" => Some(PdfBackendType::Poppler),
            "mupdf" | "fitz" => Some(PdfBackendType::Mupdf),
            _ => None,
        }
    }
}

impl std::fmt::Display for PdfBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A backend that can open PDF documents.
pub trait PdfBackend: Send + Sync {
    fn backend_type(&self) -> PdfBackendType;

    /// Check if this backend is usable (tools installed, feature compiled in).
    fn is_available(&self) -> bool;

    /// What is needed to make this backend available.
    fn availability_hint(&self) -> String;

    /// Decode a document. The returned handle is released when dropped.
    fn open(&self, bytes: &[u8]) -> Result<Box<dyn PdfDocument>, PdfError>;
}

/// An open document handle.
pub trait PdfDocument {
    fn page_count(&self) -> usize;

    /// Load a page by 0-based index.
    fn load_page(&self, index: usize) -> Result<Box<dyn PdfPage + '_>, PdfError>;
}

/// A loaded page.
pub trait PdfPage {
    /// Literal, case- and whitespace-tolerant search.
    fn search(&self, query: &str) -> Result<Vec<Quad>, PdfError>;

    /// Plain text of the page.
    fn text(&self) -> Result<String, PdfError>;
}

/// Create the backend for a configured type.
pub fn create_backend(backend_type: PdfBackendType) -> Result<Box<dyn PdfBackend>, PdfError> {
    match backend_type {
        PdfBackendType::Poppler => Ok(Box::new(PopplerBackend::new())),
        #[cfg(feature = "mupdf")]
        PdfBackendType::Mupdf => Ok(Box::new(MupdfBackend::new())),
        #[cfg(not(feature = "mupdf"))]
        PdfBackendType::Mupdf => Err(PdfError::BackendNotAvailable(
            "mupdf support not compiled in (rebuild with --features mupdf)".to_string(),
        )),
    }
}

/// Read the text of every page, skipping pages that fail to load.
pub fn page_texts(doc: &dyn PdfDocument) -> Vec<String> {
    (0..doc.page_count())
        .map(|index| match doc.load_page(index).and_then(|page| page.text()) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Failed to read text of page {}: {}", index + 1, e);
                String::new()
            }
        })
        .collect()
}

/// Backend that serves a fixed layout for any non-empty input.
#[cfg(test)]
pub(crate) struct FixtureBackend(pub LayoutDocument);

#[cfg(test)]
impl PdfBackend for FixtureBackend {
    fn backend_type(&self) -> PdfBackendType {
        PdfBackendType::Poppler
    }

    fn is_available(&self) -> bool {
        true
    }

    fn availability_hint(&self) -> String {
        String::new()
    }

    fn open(&self, bytes: &[u8]) -> Result<Box<dyn PdfDocument>, PdfError> {
        if bytes.is_empty() {
            return Err(PdfError::DocumentUnreadable("empty input".to_string()));
        }
        Ok(Box::new(self.0.clone()))
    }
}
