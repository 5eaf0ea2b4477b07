//! TTL key/value store.
//!
//! Values of any `Send + Sync` type live behind `Arc`s keyed by string. Expiry is lazy:
//! `get` drops an expired entry when it sees one, and `clean_expired` sweeps the rest.

use std::{
    any::Any,
    collections::HashMap,
    sync::{Arc, RwLock},
    time::Duration,
};

use metrics::counter;
use time::OffsetDateTime;
use tracing::{debug, warn};

use super::clock::{Clock, SystemClock};
use super::lock::{rw_read, rw_write};
use super::pattern::KeyPattern;

const SOURCE: &str = "cache::store";

pub(crate) const METRIC_CACHE_HIT: &str = "blockpress_cache_hit_total";
pub(crate) const METRIC_CACHE_MISS: &str = "blockpress_cache_miss_total";
pub(crate) const METRIC_CACHE_EXPIRED: &str = "blockpress_cache_expired_total";
pub(crate) const METRIC_CACHE_INVALIDATED: &str = "blockpress_cache_invalidated_total";

type CachedValue = Arc<dyn Any + Send + Sync>;

struct CacheEntry {
    value: CachedValue,
    expires_at: Option<OffsetDateTime>,
}

impl CacheEntry {
    fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

pub struct ContentCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    clock: Arc<dyn Clock>,
}

impl Default for ContentCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentCache {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Live value stored under `key`.
    ///
    /// Returns `None` when the key is absent, expired, or holds a value of another type.
    pub fn get<T>(&self, key: &str) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let now = self.clock.now();
        let lookup = {
            let entries = rw_read(&self.entries, SOURCE, "get");
            entries.get(key).map(|entry| {
                if entry.is_expired(now) {
                    None
                } else {
                    Some(Arc::clone(&entry.value))
                }
            })
        };

        let value = match lookup {
            None => {
                counter!(METRIC_CACHE_MISS).increment(1);
                return None;
            }
            Some(None) => {
                self.evict_if_expired(key, now);
                counter!(METRIC_CACHE_MISS).increment(1);
                return None;
            }
            Some(Some(value)) => value,
        };

        match value.downcast::<T>() {
            Ok(value) => {
                counter!(METRIC_CACHE_HIT).increment(1);
                Some(value)
            }
            Err(_) => {
                warn!(
                    target = SOURCE,
                    key,
                    expected = std::any::type_name::<T>(),
                    "cached value has a different type; treating as miss"
                );
                counter!(METRIC_CACHE_MISS).increment(1);
                None
            }
        }
    }

    /// Store `value` under `key`, replacing any previous entry.
    ///
    /// `ttl = None` keeps the entry until it is deleted.
    pub fn set<T>(&self, key: impl Into<String>, value: T, ttl: Option<Duration>)
    where
        T: Any + Send + Sync,
    {
        self.set_shared(key, Arc::new(value), ttl);
    }

    pub fn set_shared<T>(&self, key: impl Into<String>, value: Arc<T>, ttl: Option<Duration>)
    where
        T: Any + Send + Sync,
    {
        let expires_at = ttl.and_then(|ttl| self.expiry_after(ttl));
        let entry = CacheEntry {
            value,
            expires_at,
        };
        rw_write(&self.entries, SOURCE, "set").insert(key.into(), entry);
    }

    pub fn delete(&self, key: &str) -> bool {
        let removed = rw_write(&self.entries, SOURCE, "delete")
            .remove(key)
            .is_some();
        if removed {
            counter!(METRIC_CACHE_INVALIDATED).increment(1);
        }
        removed
    }

    /// Remove every key matched by a `*` wildcard pattern, returning how many were removed.
    pub fn delete_by_pattern(&self, pattern: &str) -> usize {
        let matcher = match KeyPattern::compile(pattern) {
            Ok(matcher) => matcher,
            Err(err) => {
                warn!(
                    target = SOURCE,
                    pattern,
                    error = %err,
                    "failed to compile cache key pattern"
                );
                return 0;
            }
        };

        let mut entries = rw_write(&self.entries, SOURCE, "delete_by_pattern");
        let before = entries.len();
        entries.retain(|key, _| !matcher.matches(key));
        let removed = before - entries.len();
        drop(entries);

        if removed > 0 {
            counter!(METRIC_CACHE_INVALIDATED).increment(removed as u64);
        }
        debug!(
            target = SOURCE,
            pattern, removed, "deleted cache keys by pattern"
        );
        removed
    }

    pub fn clear(&self) {
        let mut entries = rw_write(&self.entries, SOURCE, "clear");
        let removed = entries.len();
        entries.clear();
        drop(entries);

        if removed > 0 {
            counter!(METRIC_CACHE_INVALIDATED).increment(removed as u64);
        }
    }

    /// Remove every expired entry, returning how many were removed.
    pub fn clean_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = rw_write(&self.entries, SOURCE, "clean_expired");
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - entries.len();
        drop(entries);

        if removed > 0 {
            counter!(METRIC_CACHE_EXPIRED).increment(removed as u64);
        }
        removed
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn size(&self) -> usize {
        rw_read(&self.entries, SOURCE, "size").len()
    }

    fn evict_if_expired(&self, key: &str, now: OffsetDateTime) {
        let mut entries = rw_write(&self.entries, SOURCE, "get.evict");
        // Another writer may have replaced the entry since the read lock was released.
        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(key);
            counter!(METRIC_CACHE_EXPIRED).increment(1);
        }
    }

    fn expiry_after(&self, ttl: Duration) -> Option<OffsetDateTime> {
        let ttl = time::Duration::try_from(ttl).ok()?;
        self.clock.now().checked_add(ttl)
    }
}

#[cfg(test)]
mod tests {
    use time::Duration as TimeDuration;

    use super::*;
    use crate::cache::clock::ManualClock;

    fn cache_with_clock() -> (ContentCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let cache = ContentCache::with_clock(clock.clone());
        (cache, clock)
    }

    #[test]
    fn entry_expires_after_ttl() {
        let (cache, clock) = cache_with_clock();
        cache.set("page:a:document", "html".to_string(), Some(Duration::from_secs(60)));

        clock.advance(TimeDuration::seconds(59));
        assert_eq!(
            cache.get::<String>("page:a:document").as_deref(),
            Some(&"html".to_string())
        );

        clock.advance(TimeDuration::seconds(1));
        assert!(cache.get::<String>("page:a:document").is_none());
        assert_eq!(cache.size(), 0, "expired entry should be dropped on read");
    }

    #[test]
    fn entries_without_ttl_never_expire() {
        let (cache, clock) = cache_with_clock();
        cache.set("forever", 42_u32, None);

        clock.advance(TimeDuration::days(365));
        assert_eq!(cache.get::<u32>("forever").as_deref(), Some(&42));
    }

    #[test]
    fn type_mismatch_is_a_miss() {
        let cache = ContentCache::new();
        cache.set("k", 1_u64, None);
        assert!(cache.get::<String>("k").is_none());
        assert!(cache.get::<u64>("k").is_some());
    }

    #[test]
    fn set_replaces_existing_entry() {
        let cache = ContentCache::new();
        cache.set("k", "first".to_string(), None);
        cache.set("k", "second".to_string(), None);
        assert_eq!(cache.get::<String>("k").as_deref(), Some(&"second".to_string()));
        assert_eq!(cache.size(), 1);
    }

    #[test]
    fn delete_reports_presence() {
        let cache = ContentCache::new();
        cache.set("k", 1_u8, None);
        assert!(cache.delete("k"));
        assert!(!cache.delete("k"));
    }

    #[test]
    fn delete_by_pattern_removes_only_matches() {
        let cache = ContentCache::new();
        cache.set("page:abc:document", 1_u8, None);
        cache.set("page:abc:related", 2_u8, None);
        cache.set("page:abd:document", 3_u8, None);
        cache.set("related:abc", 4_u8, None);

        assert_eq!(cache.delete_by_pattern("page:abc:*"), 2);
        assert!(cache.get::<u8>("page:abd:document").is_some());
        assert!(cache.get::<u8>("related:abc").is_some());
        assert_eq!(cache.size(), 2);
    }

    #[test]
    fn clean_expired_sweeps_only_expired_entries() {
        let (cache, clock) = cache_with_clock();
        cache.set("short", 1_u8, Some(Duration::from_secs(10)));
        cache.set("long", 2_u8, Some(Duration::from_secs(100)));
        cache.set("forever", 3_u8, None);

        clock.advance(TimeDuration::seconds(30));
        assert_eq!(cache.clean_expired(), 1);
        assert_eq!(cache.size(), 2);
        assert_eq!(cache.clean_expired(), 0);
    }

    #[test]
    fn clear_empties_the_store() {
        let cache = ContentCache::new();
        cache.set("a", 1_u8, None);
        cache.set("b", 2_u8, None);
        cache.clear();
        assert_eq!(cache.size(), 0);
    }
}
