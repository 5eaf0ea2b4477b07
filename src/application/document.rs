//! Rendered documents, memoized per page.

use std::{sync::Arc, time::Duration};

use serde::Serialize;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::{info, warn};

use crate::application::fetch::{BlockFetcher, DEFAULT_FETCH_DEPTH};
use crate::application::render::{RenderContext, first_image_url, render_document_html};
use crate::application::source::{FetchError, PageMetadata};
use crate::cache::{CacheKey, ContentCache, Memoized, memoize};
use crate::domain::ids::PageId;

const SOURCE: &str = "application::document";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedDocument {
    pub page_id: String,
    pub title: Option<String>,
    pub html: String,
    /// Page cover when the page has one, otherwise the first image in the body.
    pub thumbnail_url: Option<String>,
    pub first_image_url: Option<String>,
    pub rendered_at: String,
}

#[derive(Debug, Clone, Copy)]
pub struct DocumentOptions {
    pub fetch_depth: usize,
    pub render: RenderContext,
    /// `None` keeps rendered documents until they are invalidated.
    pub ttl: Option<Duration>,
    pub cache_enabled: bool,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            fetch_depth: DEFAULT_FETCH_DEPTH,
            render: RenderContext::default(),
            ttl: Some(Duration::from_secs(600)),
            cache_enabled: true,
        }
    }
}

pub struct DocumentService {
    fetcher: Arc<BlockFetcher>,
    cache: Arc<ContentCache>,
    options: DocumentOptions,
    memoized: Memoized<PageId, RenderedDocument, FetchError>,
}

impl DocumentService {
    pub fn new(
        fetcher: Arc<BlockFetcher>,
        cache: Arc<ContentCache>,
        options: DocumentOptions,
    ) -> Self {
        let loader = Arc::clone(&fetcher);
        let memoized = memoize(
            Arc::clone(&cache),
            move |page_id: PageId| {
                let fetcher = Arc::clone(&loader);
                async move {
                    build_document(&fetcher, &page_id, options.fetch_depth, options.render).await
                }
            },
            |page_id: &PageId| CacheKey::Document(page_id.clone()).to_string(),
            options.ttl,
        );

        Self {
            fetcher,
            cache,
            options,
            memoized,
        }
    }

    /// Rendered document for `page_id`, served from the cache while the entry is live.
    pub async fn render_document(
        &self,
        page_id: &PageId,
    ) -> Result<Arc<RenderedDocument>, FetchError> {
        if !self.options.cache_enabled {
            return self
                .render_uncached(page_id, self.options.render)
                .await
                .map(Arc::new);
        }
        self.memoized.call(page_id.clone()).await
    }

    /// Fetch and render without touching the cache.
    pub async fn render_uncached(
        &self,
        page_id: &PageId,
        render: RenderContext,
    ) -> Result<RenderedDocument, FetchError> {
        build_document(&self.fetcher, page_id, self.options.fetch_depth, render).await
    }

    pub fn cache(&self) -> &Arc<ContentCache> {
        &self.cache
    }
}

async fn build_document(
    fetcher: &BlockFetcher,
    page_id: &PageId,
    fetch_depth: usize,
    render: RenderContext,
) -> Result<RenderedDocument, FetchError> {
    let (tree, metadata) = tokio::join!(
        fetcher.fetch_tree(page_id.as_str(), fetch_depth),
        fetcher.page_metadata(page_id.as_str())
    );
    let blocks = tree?;

    let metadata = metadata.unwrap_or_else(|err| {
        warn!(
            target = SOURCE,
            page_id = %page_id,
            error = %err,
            "page metadata unavailable; rendering without cover or title"
        );
        PageMetadata {
            id: page_id.to_string(),
            ..PageMetadata::default()
        }
    });

    let html = render_document_html(&blocks, render);
    let first_image = first_image_url(&blocks);
    let thumbnail = metadata.cover_url.clone().or_else(|| first_image.clone());
    let rendered_at = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();

    info!(
        target = SOURCE,
        page_id = %page_id,
        blocks = blocks.len(),
        html_len = html.len(),
        "document rendered"
    );

    Ok(RenderedDocument {
        page_id: page_id.to_string(),
        title: metadata.title,
        html,
        thumbnail_url: thumbnail,
        first_image_url: first_image,
        rendered_at,
    })
}
