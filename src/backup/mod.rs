//! Feed list durability.
//!
//! The primary copy of the feed list lives in the store. Two key/value
//! [`BackupTarget`]s ("local" and "sync") hold minimized copies that
//! [`FeedBackupService::load`] falls back to when the primary copy is empty.

pub mod file;
pub mod memory;
pub mod service;

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::Value;

use crate::app::Result;
use crate::domain::Feed;

pub use file::JsonFileTarget;
pub use memory::MemoryTarget;
pub use service::FeedBackupService;

/// Key the feed list is stored under in every backup target.
pub const FEEDS_KEY: &str = "feeds";

#[async_trait]
pub trait BackupTarget: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Value stored under `key`, or `default` when there is none.
    async fn get(&self, key: &str, default: Value) -> Result<Value>;

    async fn set(&self, key: &str, value: Value) -> Result<()>;
}

/// Process-wide view of the feed list.
///
/// Readers get a cheap snapshot that stays valid while a save swaps in a
/// new list.
#[derive(Debug, Default)]
pub struct FeedCache {
    feeds: RwLock<Arc<Vec<Feed>>>,
}

impl FeedCache {
    pub fn snapshot(&self) -> Arc<Vec<Feed>> {
        match self.feeds.read() {
            Ok(feeds) => Arc::clone(&feeds),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    pub(crate) fn replace(&self, feeds: Vec<Feed>) {
        let feeds = Arc::new(feeds);
        match self.feeds.write() {
            Ok(mut current) => *current = feeds,
            Err(poisoned) => *poisoned.into_inner() = feeds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_snapshot_sees_latest() {
        let cache = FeedCache::default();
        assert!(cache.snapshot().is_empty());

        let before = cache.snapshot();
        cache.replace(vec![Feed {
            id: 1,
            ..Default::default()
        }]);

        assert!(before.is_empty());
        assert_eq!(cache.snapshot().len(), 1);
        assert_eq!(cache.snapshot()[0].id, 1);
    }
}
