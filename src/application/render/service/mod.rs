mod balance;
mod blocks;
mod lists;
mod media;
mod rich_text;
mod sanitize;

use std::time::Instant;

use metrics::histogram;

use crate::application::render::types::RenderContext;
use crate::domain::blocks::Block;

pub use balance::{balance_tags, remove_surplus_closing_tags};
pub use blocks::render_block;
pub use lists::render_sequence;
pub use media::first_image_url;
pub use rich_text::render_spans;
pub use sanitize::sanitize;

pub(crate) const METRIC_RENDER_MS: &str = "blockpress_render_ms";

/// Render a document's top-level blocks into final markup.
///
/// The assembled markup is sanitized when `context.sanitize` is set; otherwise only the
/// tag balancer runs over it.
pub fn render_document_html(blocks: &[Block], context: RenderContext) -> String {
    let started_at = Instant::now();

    let raw = render_sequence(blocks, context);
    let html = if context.sanitize {
        sanitize(&raw)
    } else {
        balance_tags(&raw)
    };

    histogram!(METRIC_RENDER_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);
    html
}
