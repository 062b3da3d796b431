//! Page annotation model shared by the locator, the citation injector and
//! the HTTP API.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in page space (top-left origin).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build a box from its min/max corners.
    pub fn from_corners(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self::new(x0, y0, x1 - x0, y1 - y0)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Whether the two boxes touch once each is grown by `tolerance` on
    /// every side.
    pub fn overlaps(&self, other: &BoundingBox, tolerance: f64) -> bool {
        let separated = self.x > other.right() + tolerance
            || other.x > self.right() + tolerance
            || self.y > other.bottom() + tolerance
            || other.y > self.bottom() + tolerance;
        !separated
    }
}

/// A point in page space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Circle geometry for circle annotations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircleGeometry {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

/// Geometry of an annotation, tagged by annotation type.
///
/// The locator only produces `Highlight`; the other shapes come from the
/// viewer and are carried through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AnnotationShape {
    Highlight { coordinates: BoundingBox },
    Rectangle { coordinates: BoundingBox },
    Circle { coordinates: CircleGeometry },
    Freehand { points: Vec<Point> },
}

impl AnnotationShape {
    /// Rectangular extent, for shapes that have one.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        match self {
            AnnotationShape::Highlight { coordinates }
            | AnnotationShape::Rectangle { coordinates } => Some(*coordinates),
            AnnotationShape::Circle { coordinates } => Some(BoundingBox::new(
                coordinates.x - coordinates.radius,
                coordinates.y - coordinates.radius,
                coordinates.radius * 2.0,
                coordinates.radius * 2.0,
            )),
            AnnotationShape::Freehand { points } => {
                let first = points.first()?;
                let (mut x0, mut y0, mut x1, mut y1) = (first.x, first.y, first.x, first.y);
                for p in points {
                    x0 = x0.min(p.x);
                    y0 = y0.min(p.y);
                    x1 = x1.max(p.x);
                    y1 = y1.max(p.y);
                }
                Some(BoundingBox::from_corners(x0, y0, x1, y1))
            }
        }
    }
}

/// A page-anchored highlight record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: String,
    #[serde(flatten)]
    pub shape: AnnotationShape,
    /// 1-based page number.
    pub page_number: u32,
    pub color: String,
    pub opacity: f32,
    /// Excerpt this annotation was located for; join key for citations.
    pub excerpt: String,
    /// The concrete search string that hit (the excerpt itself, one of its
    /// sentences, or a word window).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_text: Option<String>,
    pub document_id: String,
    pub created_at: DateTime<Utc>,
}

impl Annotation {
    /// Create a highlight annotation with a fresh id.
    pub fn highlight(
        document_id: &str,
        page_number: u32,
        coordinates: BoundingBox,
        excerpt: &str,
        style: &HighlightStyle,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            shape: AnnotationShape::Highlight { coordinates },
            page_number,
            color: style.color.clone(),
            opacity: style.opacity,
            excerpt: excerpt.to_string(),
            matched_text: None,
            document_id: document_id.to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn with_matched_text(mut self, text: &str) -> Self {
        self.matched_text = Some(text.to_string());
        self
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.shape.bounding_box()
    }
}

/// Presentation hints applied to generated highlights.
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightStyle {
    pub color: String,
    pub opacity: f32,
}

impl Default for HighlightStyle {
    fn default() -> Self {
        Self {
            color: "#ffeb3b".to_string(),
            opacity: 0.15,
        }
    }
}

/// Pages on which an excerpt was located.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMapping {
    pub excerpt: String,
    /// Ascending, deduplicated 1-based page numbers.
    pub pages: Vec<u32>,
}

impl PageMapping {
    /// Group annotations by excerpt, keeping first-seen excerpt order.
    pub fn from_annotations(annotations: &[Annotation]) -> Vec<PageMapping> {
        let mut order: Vec<&str> = Vec::new();
        let mut pages: BTreeMap<&str, BTreeSet<u32>> = BTreeMap::new();

        for annotation in annotations {
            let entry = pages.entry(annotation.excerpt.as_str()).or_insert_with(|| {
                order.push(annotation.excerpt.as_str());
                BTreeSet::new()
            });
            entry.insert(annotation.page_number);
        }

        order
            .into_iter()
            .map(|excerpt| PageMapping {
                excerpt: excerpt.to_string(),
                pages: pages
                    .get(excerpt)
                    .map(|set| set.iter().copied().collect())
                    .unwrap_or_default(),
            })
            .collect()
    }
}

/// Sorted, deduplicated page numbers that carry at least one annotation.
pub fn highlighted_pages(annotations: &[Annotation]) -> Vec<u32> {
    annotations
        .iter()
        .map(|a| a.page_number)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
