//! Maps change notifications to the cache keys they make stale.

use tracing::{info, warn};

use crate::domain::ids::PageId;

use super::events::{ChangeNotification, EventKind};
use super::keys::{ALL_KEYS, RELATED_KEYS, page_keys};
use super::store::ContentCache;

const SOURCE: &str = "cache::invalidation";

/// Key patterns to evict for `notification`.
///
/// Block and page events evict everything derived from the owning page plus all related
/// listings. Database events evict the whole cache.
pub fn patterns_for(notification: &ChangeNotification) -> Vec<String> {
    match notification.kind() {
        EventKind::Database => vec![ALL_KEYS.to_string()],
        EventKind::Block | EventKind::Page => {
            let raw_page = notification.affected_page();
            match PageId::parse(raw_page) {
                Ok(page_id) => vec![page_keys(&page_id), RELATED_KEYS.to_string()],
                Err(err) => {
                    warn!(
                        target = SOURCE,
                        event_type = %notification.event_type,
                        page_id = raw_page,
                        error = %err,
                        "notification names an unusable page id; evicting related listings only"
                    );
                    vec![RELATED_KEYS.to_string()]
                }
            }
        }
        EventKind::Other => Vec::new(),
    }
}

/// Evict every key made stale by `notification`, returning the number of removed entries.
pub fn apply_notification(cache: &ContentCache, notification: &ChangeNotification) -> usize {
    let patterns = patterns_for(notification);
    let evicted = patterns
        .iter()
        .map(|pattern| cache.delete_by_pattern(pattern))
        .sum();

    info!(
        target = SOURCE,
        event_type = %notification.event_type,
        entity_id = %notification.entity.id,
        patterns = ?patterns,
        evicted,
        "applied change notification"
    );
    evicted
}
