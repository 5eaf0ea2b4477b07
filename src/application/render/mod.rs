//! Block tree rendering.
//!
//! Rendering is pure and synchronous: it takes a fully fetched block tree and produces
//! markup. Per-block failures become placeholder elements instead of errors, so a document
//! always renders.

mod service;
mod types;

pub use service::{
    balance_tags, first_image_url, remove_surplus_closing_tags, render_block,
    render_document_html, render_sequence, render_spans, sanitize,
};
pub use types::{DEFAULT_MAX_RENDER_DEPTH, RenderContext, RenderError};
