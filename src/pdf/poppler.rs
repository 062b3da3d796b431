//! Poppler backend: word boxes from `pdftotext -bbox-layout`.

use std::io::Write;
use std::process::Command;
use std::sync::LazyLock;

use regex::Regex;
use tempfile::NamedTempFile;

use crate::models::BoundingBox;
use crate::utils::html_unescape;

use super::layout::{LayoutDocument, PageLayout, WordBox};
use super::{PdfBackend, PdfBackendType, PdfDocument, PdfError};

const PDFTOTEXT: &str = "pdftotext";

/// One alternation per element of interest, in document order.
static BBOX_TAGS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"<page width="([\d.]+)" height="([\d.]+)">|<line\b|<word xMin="([\d.]+)" yMin="([\d.]+)" xMax="([\d.]+)" yMax="([\d.]+)">([^<]*)</word>"#,
    )
    .unwrap()
});

/// Backend that shells out to Poppler's `pdftotext`.
#[derive(Debug, Default)]
pub struct PopplerBackend;

impl PopplerBackend {
    pub fn new() -> Self {
        Self
    }

    /// Run pdftotext on a temp copy of the bytes and return its XHTML output.
    fn run_pdftotext(&self, bytes: &[u8]) -> Result<String, PdfError> {
        let mut file = NamedTempFile::new()?;
        file.write_all(bytes)?;
        file.flush()?;

        let output = Command::new(PDFTOTEXT)
            .args(["-bbox-layout", "-enc", "UTF-8", "-q"])
            .arg(file.path())
            .arg("-")
            .output();

        match output {
            Ok(output) if output.status.success() => {
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(PdfError::DocumentUnreadable(format!(
                    "pdftotext exited with {}: {}",
                    output.status,
                    stderr.trim()
                )))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(
                PdfError::BackendNotAvailable(format!("{} not found in PATH", PDFTOTEXT)),
            ),
            Err(e) => Err(PdfError::Io(e)),
        }
    }
}

impl PdfBackend for PopplerBackend {
    fn backend_type(&self) -> PdfBackendType {
        PdfBackendType::Poppler
    }

    fn is_available(&self) -> bool {
        which::which(PDFTOTEXT).is_ok()
    }

    fn availability_hint(&self) -> String {
        "Install poppler-utils (provides pdftotext)".to_string()
    }

    fn open(&self, bytes: &[u8]) -> Result<Box<dyn PdfDocument>, PdfError> {
        let xhtml = self.run_pdftotext(bytes)?;
        let doc = parse_bbox_layout(&xhtml);
        if doc.pages.is_empty() {
            return Err(PdfError::DocumentUnreadable(
                "no pages in pdftotext output".to_string(),
            ));
        }
        tracing::debug!("Decoded {} pages with pdftotext", doc.pages.len());
        Ok(Box::new(doc))
    }
}

/// Parse `pdftotext -bbox-layout` XHTML into a word layout.
pub fn parse_bbox_layout(xhtml: &str) -> LayoutDocument {
    let mut pages: Vec<PageLayout> = Vec::new();
    let mut line: Option<usize> = None;

    for caps in BBOX_TAGS.captures_iter(xhtml) {
        if let (Some(w), Some(h)) = (caps.get(1), caps.get(2)) {
            pages.push(PageLayout::new(
                w.as_str().parse().unwrap_or(0.0),
                h.as_str().parse().unwrap_or(0.0),
            ));
            line = None;
        } else if caps.get(7).is_none() {
            // <line>
            line = Some(line.map_or(0, |l| l + 1));
        } else if let Some(page) = pages.last_mut() {
            let coord = |i: usize| -> f64 {
                caps.get(i)
                    .and_then(|m| m.as_str().parse().ok())
                    .unwrap_or(0.0)
            };
            let text = html_unescape(caps.get(7).map_or("", |m| m.as_str()));
            if text.trim().is_empty() {
                continue;
            }
            page.words.push(WordBox {
                text,
                line: line.unwrap_or(0),
                bbox: BoundingBox::from_corners(coord(3), coord(4), coord(5), coord(6)),
            });
        }
    }

    LayoutDocument::new(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::PdfPage;

    const SAMPLE: &str = r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Transitional//EN">
<html xmlns="http://www.w3.org/1999/xhtml">
<body>
<doc>
  <page width="612.000000" height="792.000000">
    <flow>
      <block xMin="72.000000" yMin="71.000000" xMax="300.000000" yMax="97.000000">
        <line xMin="72.000000" yMin="71.000000" xMax="300.000000" yMax="83.000000">
          <word xMin="72.000000" yMin="71.000000" xMax="110.000000" yMax="83.000000">Viruses</word>
          <word xMin="113.000000" yMin="71.000000" xMax="150.000000" yMax="83.000000">cannot</word>
        </line>
        <line xMin="72.000000" yMin="85.000000" xMax="300.000000" yMax="97.000000">
          <word xMin="72.000000" yMin="85.000000" xMax="130.000000" yMax="97.000000">reproduce</word>
          <word xMin="133.000000" yMin="85.000000" xMax="160.000000" yMax="97.000000">R&amp;D</word>
        </line>
      </block>
    </flow>
  </page>
  <page width="612.000000" height="792.000000">
    <flow>
      <block xMin="72.000000" yMin="71.000000" xMax="300.000000" yMax="83.000000">
        <line xMin="72.000000" yMin="71.000000" xMax="300.000000" yMax="83.000000">
          <word xMin="72.000000" yMin="71.000000" xMax="120.000000" yMax="83.000000">Second</word>
        </line>
      </block>
    </flow>
  </page>
</doc>
</body>
</html>"#;

    #[test]
    fn test_parse_bbox_layout() {
        let doc = parse_bbox_layout(SAMPLE);
        assert_eq!(doc.pages.len(), 2);

        let first = &doc.pages[0];
        assert_eq!(first.words.len(), 4);
        assert_eq!(first.words[0].line, 0);
        assert_eq!(first.words[2].line, 1);
        assert_eq!(first.words[3].text, "R&D");
        assert_eq!(
            first.words[1].bbox,
            BoundingBox::new(113.0, 71.0, 37.0, 12.0)
        );

        assert_eq!(doc.pages[1].words[0].line, 0);
        assert_eq!(doc.pages[1].width, 612.0);
    }

    #[test]
    fn test_search_parsed_layout() {
        let doc = parse_bbox_layout(SAMPLE);
        let page = &doc.pages[0];
        let quads = (&page).search("cannot reproduce").unwrap();
        assert_eq!(quads.len(), 2);
        assert_eq!(quads[0].bounding_box(), BoundingBox::new(113.0, 71.0, 37.0, 12.0));
        assert_eq!(quads[1].bounding_box(), BoundingBox::new(72.0, 85.0, 58.0, 12.0));
    }

    #[test]
    fn test_parse_empty_output() {
        assert!(parse_bbox_layout("").pages.is_empty());
    }
}
