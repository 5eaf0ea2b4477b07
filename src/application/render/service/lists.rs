use crate::application::render::types::RenderContext;
use crate::domain::blocks::{Block, ListKind};

use super::blocks::render_block;

/// Open list run while walking a sibling sequence, with the markup of its items so far.
#[derive(Debug)]
enum ListRunState {
    None,
    InBulletedRun(String),
    InNumberedRun(String),
}

impl ListRunState {
    fn open(kind: ListKind, item: String) -> Self {
        match kind {
            ListKind::Bulleted => ListRunState::InBulletedRun(item),
            ListKind::Numbered => ListRunState::InNumberedRun(item),
        }
    }

    /// Add a list item, closing the current run into `output` first if its kind differs.
    fn push_item(self, kind: ListKind, item: String, output: &mut String) -> Self {
        match (self, kind) {
            (ListRunState::InBulletedRun(mut run), ListKind::Bulleted) => {
                run.push_str(&item);
                ListRunState::InBulletedRun(run)
            }
            (ListRunState::InNumberedRun(mut run), ListKind::Numbered) => {
                run.push_str(&item);
                ListRunState::InNumberedRun(run)
            }
            (state, kind) => {
                state.close(output);
                ListRunState::open(kind, item)
            }
        }
    }

    fn close(self, output: &mut String) {
        match self {
            ListRunState::None => {}
            ListRunState::InBulletedRun(run) => {
                output.push_str("<ul class=\"notion-bulleted-list\">");
                output.push_str(&run);
                output.push_str("</ul>");
            }
            ListRunState::InNumberedRun(run) => {
                output.push_str("<ol class=\"notion-numbered-list\">");
                output.push_str(&run);
                output.push_str("</ol>");
            }
        }
    }
}

/// Render siblings in order, folding consecutive list items of one kind into a single list.
pub fn render_sequence(blocks: &[Block], context: RenderContext) -> String {
    let mut output = String::new();
    let mut state = ListRunState::None;

    for block in blocks {
        let html = render_block(block, context);
        state = match block.list_kind() {
            Some(kind) => state.push_item(kind, html, &mut output),
            None => {
                state.close(&mut output);
                output.push_str(&html);
                ListRunState::None
            }
        };
    }
    state.close(&mut output);

    output
}
