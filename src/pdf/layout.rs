//! Decoded word layout of a document, and text search over it.
//!
//! Backends that only report word boxes (Poppler) decode into this layout;
//! search then runs here instead of inside the decoder.

use crate::models::BoundingBox;

use super::{PdfDocument, PdfError, PdfPage, Quad};

/// Character width used by `PageLayout::from_text_lines`.
const GRID_CHAR_WIDTH: f64 = 6.0;
/// Line pitch used by `PageLayout::from_text_lines`.
const GRID_LINE_PITCH: f64 = 14.0;
const GRID_LINE_HEIGHT: f64 = 12.0;
const GRID_MARGIN: f64 = 72.0;

/// A word and its box on the page.
#[derive(Debug, Clone, PartialEq)]
pub struct WordBox {
    pub text: String,
    /// Index of the text line the word sits on.
    pub line: usize,
    pub bbox: BoundingBox,
}

/// Words of one page in reading order.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    pub width: f64,
    pub height: f64,
    pub words: Vec<WordBox>,
}

impl PageLayout {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            words: Vec::new(),
        }
    }

    /// Lay plain text lines on a fixed grid of a US-letter page.
    pub fn from_text_lines(lines: &[&str]) -> Self {
        let mut page = Self::new(612.0, 792.0);
        for (line_index, line) in lines.iter().enumerate() {
            let y = GRID_MARGIN + line_index as f64 * GRID_LINE_PITCH;
            let mut x = GRID_MARGIN;
            for word in line.split_whitespace() {
                let width = word.chars().count() as f64 * GRID_CHAR_WIDTH;
                page.words.push(WordBox {
                    text: word.to_string(),
                    line: line_index,
                    bbox: BoundingBox::new(x, y, width, GRID_LINE_HEIGHT),
                });
                x += width + GRID_CHAR_WIDTH;
            }
        }
        page
    }

    /// Find every non-overlapping occurrence of `query`, one quad per text
    /// line an occurrence spans.
    pub fn find(&self, query: &str) -> Vec<Quad> {
        let needle = normalize_query(query);
        if needle.is_empty() || self.words.is_empty() {
            return Vec::new();
        }

        // Lowercased words joined by single spaces, with each word's byte span.
        let mut haystack = String::new();
        let mut spans = Vec::with_capacity(self.words.len());
        for word in &self.words {
            if !haystack.is_empty() {
                haystack.push(' ');
            }
            let start = haystack.len();
            haystack.push_str(&word.text.to_lowercase());
            spans.push((start, haystack.len()));
        }

        let mut quads = Vec::new();
        for (start, matched) in haystack.match_indices(&needle) {
            let end = start + matched.len();
            let hit: Vec<usize> = spans
                .iter()
                .enumerate()
                .filter(|(_, (ws, we))| *ws < end && *we > start)
                .map(|(i, _)| i)
                .collect();

            let mut line_start = 0;
            while line_start < hit.len() {
                let line = self.words[hit[line_start]].line;
                let mut line_end = line_start;
                while line_end + 1 < hit.len() && self.words[hit[line_end + 1]].line == line {
                    line_end += 1;
                }
                quads.push(self.line_quad(
                    &haystack,
                    &spans,
                    &hit[line_start..=line_end],
                    start,
                    end,
                ));
                line_start = line_end + 1;
            }
        }
        quads
    }

    /// Quad for the words of one line, trimmed to the matched characters of
    /// the first and last word.
    fn line_quad(
        &self,
        haystack: &str,
        spans: &[(usize, usize)],
        words: &[usize],
        match_start: usize,
        match_end: usize,
    ) -> Quad {
        let first = words[0];
        let last = words[words.len() - 1];

        let mut x0 = self.words[first].bbox.x;
        let (ws, we) = spans[first];
        if match_start > ws {
            let skipped = char_count(haystack, ws, match_start) as f64;
            let total = char_count(haystack, ws, we).max(1) as f64;
            x0 += self.words[first].bbox.width * skipped / total;
        }

        let mut x1 = self.words[last].bbox.right();
        let (ws, we) = spans[last];
        if match_end < we {
            let trailing = char_count(haystack, match_end, we) as f64;
            let total = char_count(haystack, ws, we).max(1) as f64;
            x1 -= self.words[last].bbox.width * trailing / total;
        }

        let mut y0 = f64::MAX;
        let mut y1 = f64::MIN;
        for &i in words {
            y0 = y0.min(self.words[i].bbox.y);
            y1 = y1.max(self.words[i].bbox.bottom());
        }

        Quad::from_rect(x0, y0, x1, y1)
    }

    /// Page text, one line per layout line.
    pub fn text(&self) -> String {
        let mut out = String::new();
        let mut current_line = None;
        for word in &self.words {
            match current_line {
                Some(line) if line == word.line => out.push(' '),
                Some(_) => out.push('\n'),
                None => {}
            }
            out.push_str(&word.text);
            current_line = Some(word.line);
        }
        out
    }
}

fn char_count(haystack: &str, from: usize, to: usize) -> usize {
    haystack[from..to].chars().count()
}

/// Lowercase and collapse runs of whitespace to single spaces.
fn normalize_query(query: &str) -> String {
    query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// A fully decoded document held in memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutDocument {
    pub pages: Vec<PageLayout>,
}

impl LayoutDocument {
    pub fn new(pages: Vec<PageLayout>) -> Self {
        Self { pages }
    }
}

impl PdfDocument for LayoutDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn load_page(&self, index: usize) -> Result<Box<dyn PdfPage + '_>, PdfError> {
        self.pages
            .get(index)
            .map(|page| Box::new(page) as Box<dyn PdfPage + '_>)
            .ok_or(PdfError::PageOutOfRange {
                index,
                count: self.pages.len(),
            })
    }
}

impl PdfPage for &PageLayout {
    fn search(&self, query: &str) -> Result<Vec<Quad>, PdfError> {
        Ok(self.find(query))
    }

    fn text(&self) -> Result<String, PdfError> {
        Ok(PageLayout::text(self))
    }
}
