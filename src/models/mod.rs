//! Data models for pagecite.

mod annotation;
mod source;

pub use annotation::{
    highlighted_pages, Annotation, AnnotationShape, BoundingBox, CircleGeometry, HighlightStyle,
    PageMapping, Point,
};
pub use source::{ModelAnswer, SourceDocument, SourceMetadata};
