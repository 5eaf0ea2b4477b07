//! Blockpress cache system
//!
//! A TTL key/value store shared by the whole process, an async memoization wrapper on top of
//! it, and the mapping from content change notifications to evicted keys.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! document_ttl_secs = 600
//! sweep_interval_secs = 60
//! ```

mod clock;
mod config;
mod events;
mod invalidation;
mod keys;
mod lock;
mod memo;
mod pattern;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CacheConfig;
pub use events::{ChangeNotification, EventKind, NotificationData, NotificationEntity};
pub use invalidation::{apply_notification, patterns_for};
pub use keys::{ALL_KEYS, CacheKey, RELATED_KEYS, page_keys};
pub use memo::{Memoized, memoize};
pub use pattern::KeyPattern;
pub use store::ContentCache;
