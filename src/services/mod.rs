//! Service layer for pagecite business logic.
//!
//! This module contains domain logic separated from transport concerns.
//! Services can be used by the CLI, the web server, or other interfaces.

pub mod answer;
pub mod citation;
pub mod highlight;
pub mod locate;
pub mod retrieval;
pub mod segments;

pub use answer::{parse_model_output, split_sources, try_parse_model_output};
pub use citation::{cited_pages, format_citation, inject_citations, resolve_pages};
pub use highlight::{fallback_annotations, AnnotatedAnswer, HighlightError, HighlightService};
pub use locate::{locate, LocateResult, PageClaims};
pub use retrieval::{chunk_pages, retrieve};
pub use segments::{build_segments, split_sentences, word_windows, Segment};
