//! Cache key layout.
//!
//! Everything derived from one page lives under `page:{id}:`, so a change to the page can be
//! evicted with a single pattern. Cross-page listings live under `related:`.

use std::fmt;

use crate::domain::ids::PageId;

/// Pattern matching every key in the cache.
pub const ALL_KEYS: &str = "*";
/// Pattern matching every cross-page listing.
pub const RELATED_KEYS: &str = "related:*";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Rendered document of a page.
    Document(PageId),
    /// Listing of pages related to a page.
    Related(PageId),
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Document(page_id) => write!(f, "page:{page_id}:document"),
            CacheKey::Related(page_id) => write!(f, "related:{page_id}"),
        }
    }
}

/// Pattern matching every key derived from `page_id`.
pub fn page_keys(page_id: &PageId) -> String {
    format!("page:{page_id}:*")
}
