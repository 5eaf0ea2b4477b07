#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use blockpress::application::source::{
    BlockRecord, ChildrenPage, ContentSource, FetchError, PageMetadata,
};
use blockpress::domain::blocks::{BlockKind, MediaContent, TextContent};
use blockpress::domain::rich_text::RichTextSpan;

/// In-memory content service: one listing per parent id, served in a single page.
#[derive(Default)]
pub struct InMemorySource {
    children: Mutex<HashMap<String, Vec<BlockRecord>>>,
    metadata: Mutex<HashMap<String, PageMetadata>>,
    failing: Mutex<HashSet<String>>,
    listings: AtomicUsize,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_children(&self, parent: &str, blocks: Vec<BlockRecord>) {
        self.children
            .lock()
            .expect("children lock")
            .insert(parent.to_string(), blocks);
    }

    pub fn set_metadata(&self, metadata: PageMetadata) {
        self.metadata
            .lock()
            .expect("metadata lock")
            .insert(metadata.id.clone(), metadata);
    }

    pub fn fail_listing(&self, parent: &str) {
        self.failing
            .lock()
            .expect("failing lock")
            .insert(parent.to_string());
    }

    pub fn listings(&self) -> usize {
        self.listings.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentSource for InMemorySource {
    async fn list_children(
        &self,
        block_id: &str,
        _cursor: Option<&str>,
        _page_size: u32,
    ) -> Result<ChildrenPage, FetchError> {
        self.listings.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().expect("failing lock").contains(block_id) {
            return Err(FetchError::transport(format!("listing {block_id} failed")));
        }

        let children = self.children.lock().expect("children lock");
        let blocks = children
            .get(block_id)
            .cloned()
            .ok_or_else(|| FetchError::not_found(format!("block {block_id}")))?;
        Ok(ChildrenPage {
            blocks,
            next_cursor: None,
            has_more: false,
        })
    }

    async fn page_metadata(&self, page_id: &str) -> Result<PageMetadata, FetchError> {
        self.metadata
            .lock()
            .expect("metadata lock")
            .get(page_id)
            .cloned()
            .ok_or_else(|| FetchError::not_found(format!("page {page_id}")))
    }
}

pub fn text(kind: fn(TextContent) -> BlockKind, id: &str, spans: Vec<RichTextSpan>) -> BlockRecord {
    BlockRecord::new(id, kind(TextContent::new(spans)))
}

pub fn image(id: &str, url: &str) -> BlockRecord {
    BlockRecord::new(id, BlockKind::Image(MediaContent::external(url)))
}

/// Opening tags in document order, ignoring attributes.
pub fn tag_sequence(html: &str) -> Vec<String> {
    html.split('<')
        .skip(1)
        .filter(|chunk| !chunk.starts_with('/'))
        .map(|chunk| {
            chunk
                .split(|ch: char| ch.is_whitespace() || ch == '>' || ch == '/')
                .next()
                .unwrap_or_default()
                .to_string()
        })
        .collect()
}
