//! HTTP request handlers for the web server.

mod documents;
mod helpers;
mod highlight;

// Re-export handlers for use by the router
pub use documents::{get_document, list_documents, upload_document};
pub use highlight::{api_ask, api_citations, api_highlight, api_locate};
