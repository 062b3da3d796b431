//! pagecite - locate answer excerpts in PDFs and cite their pages.
//!
//! Maps the free-text source excerpts a language model returns back onto
//! bounding boxes in the PDF they came from, then rewrites the model's
//! answer with `(page N)` citations pointing at those boxes.

pub mod cli;
pub mod config;
pub mod llm;
pub mod models;
pub mod pdf;
pub mod server;
pub mod services;
pub mod storage;
pub mod utils;
