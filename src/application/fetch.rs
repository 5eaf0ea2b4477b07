//! Depth-limited retrieval of a document's block tree.

use std::sync::Arc;

use futures::{
    FutureExt, StreamExt,
    future::BoxFuture,
    stream,
};
use tracing::{debug, warn};

use crate::application::source::{BlockRecord, ContentSource, FetchError, PageMetadata};
use crate::domain::blocks::Block;

pub const DEFAULT_FETCH_DEPTH: usize = 3;
pub const DEFAULT_PAGE_SIZE: u32 = 100;
const MAX_PAGE_SIZE: u32 = 100;
const DEFAULT_CONCURRENCY: usize = 4;
const DEFAULT_MAX_PAGES_PER_PARENT: usize = 50;

#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    pub page_size: u32,
    /// Child listings fetched at once for the siblings of one parent.
    pub concurrency: usize,
    /// Listing pages requested for one parent before the listing is treated as failed.
    pub max_pages_per_parent: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            max_pages_per_parent: DEFAULT_MAX_PAGES_PER_PARENT,
        }
    }
}

pub struct BlockFetcher {
    source: Arc<dyn ContentSource>,
    options: FetchOptions,
}

impl BlockFetcher {
    pub fn new(source: Arc<dyn ContentSource>, options: FetchOptions) -> Self {
        Self { source, options }
    }

    /// Fetch the blocks under `root_id`, descending at most `max_depth` levels.
    ///
    /// The root's direct children are level 1 and are always listed. Failing to list the root
    /// is an error; failing to list any deeper subtree leaves that subtree empty. A listing
    /// that cannot be completed counts as a failure, so no block ever carries a partial set
    /// of children.
    pub async fn fetch_tree(&self, root_id: &str, max_depth: usize) -> Result<Vec<Block>, FetchError> {
        let blocks = self
            .fetch_level(root_id.to_string(), 1, max_depth.max(1))
            .await?;
        debug!(
            target = "application::fetch",
            root_id,
            max_depth,
            top_level = blocks.len(),
            "fetched block tree"
        );
        Ok(blocks)
    }

    pub async fn page_metadata(&self, page_id: &str) -> Result<PageMetadata, FetchError> {
        self.source.page_metadata(page_id).await
    }

    fn fetch_level(
        &self,
        parent_id: String,
        level: usize,
        max_depth: usize,
    ) -> BoxFuture<'_, Result<Vec<Block>, FetchError>> {
        async move {
            let records = self.list_all_children(&parent_id).await?;
            let blocks = stream::iter(
                records
                    .into_iter()
                    .map(|record| self.attach_children(record, level, max_depth)),
            )
            .buffered(self.options.concurrency.max(1))
            .collect::<Vec<_>>()
            .await;
            Ok(blocks)
        }
        .boxed()
    }

    async fn attach_children(&self, record: BlockRecord, level: usize, max_depth: usize) -> Block {
        if !record.has_children || level >= max_depth {
            return record.into_block(Vec::new());
        }

        match self.fetch_level(record.id.clone(), level + 1, max_depth).await {
            Ok(children) => record.into_block(children),
            Err(err) => {
                warn!(
                    target = "application::fetch",
                    block_id = %record.id,
                    level,
                    error = %err,
                    "failed to fetch children; rendering block without them"
                );
                record.into_block(Vec::new())
            }
        }
    }

    async fn list_all_children(&self, parent_id: &str) -> Result<Vec<BlockRecord>, FetchError> {
        let page_size = self.options.page_size.clamp(1, MAX_PAGE_SIZE);
        let mut records = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..self.options.max_pages_per_parent.max(1) {
            let page = self
                .source
                .list_children(parent_id, cursor.as_deref(), page_size)
                .await?;
            records.extend(page.blocks);

            match (page.has_more, page.next_cursor) {
                (true, Some(next)) => cursor = Some(next),
                (true, None) => {
                    return Err(FetchError::incomplete(
                        parent_id,
                        "listing reports more children without a cursor",
                    ));
                }
                (false, _) => return Ok(records),
            }
        }

        debug!(
            target = "application::fetch",
            parent_id,
            pages = self.options.max_pages_per_parent,
            fetched = records.len(),
            "page limit reached while listing children"
        );
        Err(FetchError::incomplete(
            parent_id,
            "page limit reached before the last page",
        ))
    }
}
