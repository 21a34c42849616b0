use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::app::Result;
use crate::backup::{BackupTarget, FeedCache, FEEDS_KEY};
use crate::domain::Feed;
use crate::store::Store;

/// Keeps the feed list, its in-memory cache and both backups in step.
pub struct FeedBackupService {
    local: Arc<dyn BackupTarget>,
    sync: Arc<dyn BackupTarget>,
    cache: FeedCache,
    save_lock: Mutex<()>,
}

impl FeedBackupService {
    pub fn new(local: Arc<dyn BackupTarget>, sync: Arc<dyn BackupTarget>) -> Self {
        Self {
            local,
            sync,
            cache: FeedCache::default(),
            save_lock: Mutex::new(()),
        }
    }

    pub fn cache(&self) -> &FeedCache {
        &self.cache
    }

    /// Read the feed list, restoring it from a backup when the store has none.
    ///
    /// The local backup wins over the synced one. A restored list is saved
    /// back into the store before it is returned. Finding nothing anywhere
    /// is not an error. Runs under the same guard as [`save`](Self::save),
    /// so a concurrent save never has its cache update overwritten.
    pub async fn load<S>(&self, store: &S) -> Result<Vec<Feed>>
    where
        S: Store + ?Sized,
    {
        let _guard = self.save_lock.lock().await;

        let feeds = store.read_feeds().await?;
        if !feeds.is_empty() {
            self.cache.replace(feeds.clone());
            return Ok(feeds);
        }

        for target in [&self.local, &self.sync] {
            let restored = self.read_backup(target.as_ref()).await;
            if restored.is_empty() {
                continue;
            }

            info!(
                backup = target.name(),
                feeds = restored.len(),
                "Restoring feeds from backup"
            );
            return self.save_locked(store, restored).await;
        }

        info!("No feeds in store or backups");
        self.cache.replace(Vec::new());
        Ok(Vec::new())
    }

    /// Replace the stored feed list and mirror a minimized copy to both
    /// backups.
    ///
    /// Without a store the save is skipped and `feeds` comes back untouched.
    /// Backup failures are logged and do not fail the save.
    pub async fn save<S>(&self, store: Option<&S>, feeds: Vec<Feed>) -> Result<Vec<Feed>>
    where
        S: Store + ?Sized,
    {
        let Some(store) = store else {
            info!(feeds = feeds.len(), "Store not initialized; skipping feed save");
            return Ok(feeds);
        };

        let _guard = self.save_lock.lock().await;
        self.save_locked(store, feeds).await
    }

    /// Body of `save`. The caller holds `save_lock`.
    async fn save_locked<S>(&self, store: &S, feeds: Vec<Feed>) -> Result<Vec<Feed>>
    where
        S: Store + ?Sized,
    {
        let stored = store.replace_feeds(feeds).await?;
        self.cache.replace(stored.clone());

        let minimized = serde_json::to_value(
            stored.iter().map(Feed::minimized).collect::<Vec<_>>(),
        )?;
        let (local, sync) = futures::join!(
            self.local.set(FEEDS_KEY, minimized.clone()),
            self.sync.set(FEEDS_KEY, minimized),
        );
        for (target, result) in [(&self.local, local), (&self.sync, sync)] {
            if let Err(e) = result {
                warn!(backup = target.name(), error = %e, "Feed backup failed");
            }
        }

        Ok(stored)
    }

    async fn read_backup(&self, target: &dyn BackupTarget) -> Vec<Feed> {
        let value = match target.get(FEEDS_KEY, Value::Array(Vec::new())).await {
            Ok(Value::Null) => return Vec::new(),
            Ok(value) => value,
            Err(e) => {
                warn!(backup = target.name(), error = %e, "Could not read feed backup");
                return Vec::new();
            }
        };

        match serde_json::from_value(value) {
            Ok(feeds) => feeds,
            Err(e) => {
                warn!(backup = target.name(), error = %e, "Feed backup is malformed");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::StoreError;
    use crate::backup::MemoryTarget;
    use crate::domain::{Entry, EntryInput, Revision};
    use crate::store::SqliteStore;
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::Notify;

    struct BrokenTarget;

    #[async_trait]
    impl BackupTarget for BrokenTarget {
        fn name(&self) -> &str {
            "broken"
        }

        async fn get(&self, _key: &str, _default: Value) -> Result<Value> {
            Err(StoreError::Other("unreachable".into()))
        }

        async fn set(&self, _key: &str, _value: Value) -> Result<()> {
            Err(StoreError::Other("unreachable".into()))
        }
    }

    /// Store whose `read_feeds` pauses after reading until `gate` opens.
    struct GatedStore {
        inner: SqliteStore,
        reached: Notify,
        gate: Notify,
    }

    #[async_trait]
    impl Store for GatedStore {
        async fn put_entries(&self, entries: Vec<EntryInput>) -> Result<Vec<i64>> {
            self.inner.put_entries(entries).await
        }

        async fn delete_entries(&self, ids: &[i64]) -> Result<()> {
            self.inner.delete_entries(ids).await
        }

        async fn clear_entries(&self) -> Result<()> {
            self.inner.clear_entries().await
        }

        async fn list_entries(&self) -> Result<Vec<i64>> {
            self.inner.list_entries().await
        }

        async fn get_entry(&self, id: i64) -> Result<Option<Entry>> {
            self.inner.get_entry(id).await
        }

        async fn get_revision(&self, id: i64) -> Result<Option<Revision>> {
            self.inner.get_revision(id).await
        }

        async fn entries_by_primary_hash(&self, hash: &str) -> Result<Vec<i64>> {
            self.inner.entries_by_primary_hash(hash).await
        }

        async fn entries_by_url(&self, url: &str) -> Result<Vec<i64>> {
            self.inner.entries_by_url(url).await
        }

        async fn entries_by_bookmark(&self, bookmark_id: i64) -> Result<Vec<i64>> {
            self.inner.entries_by_bookmark(bookmark_id).await
        }

        async fn entries_by_tag(&self, tag: &str) -> Result<Vec<i64>> {
            self.inner.entries_by_tag(tag).await
        }

        async fn read_feeds(&self) -> Result<Vec<Feed>> {
            let feeds = self.inner.read_feeds().await?;
            self.reached.notify_one();
            self.gate.notified().await;
            Ok(feeds)
        }

        async fn replace_feeds(&self, feeds: Vec<Feed>) -> Result<Vec<Feed>> {
            self.inner.replace_feeds(feeds).await
        }

        async fn schema_version(&self) -> Result<usize> {
            self.inner.schema_version().await
        }
    }

    fn service(local: MemoryTarget, sync: MemoryTarget) -> (FeedBackupService, Arc<MemoryTarget>, Arc<MemoryTarget>) {
        let local = Arc::new(local);
        let sync = Arc::new(sync);
        let service = FeedBackupService::new(local.clone(), sync.clone());
        (service, local, sync)
    }

    #[tokio::test]
    async fn test_local_backup_takes_precedence() {
        let store = SqliteStore::in_memory().await.unwrap();
        let (service, _, _) = service(
            MemoryTarget::with_value("local", FEEDS_KEY, json!([{"feedID": 5}])),
            MemoryTarget::with_value("sync", FEEDS_KEY, json!([{"feedID": 9}])),
        );

        let feeds = service.load(&store).await.unwrap();
        assert_eq!(feeds.len(), 1);
        assert_eq!(feeds[0].id, 5);

        let primary = store.read_feeds().await.unwrap();
        assert_eq!(primary, feeds);
        assert_eq!(service.cache().snapshot().as_ref(), &feeds);
    }

    #[tokio::test]
    async fn test_sync_backup_used_when_local_empty() {
        let store = SqliteStore::in_memory().await.unwrap();
        let (service, local, _) = service(
            MemoryTarget::new("local"),
            MemoryTarget::with_value("sync", FEEDS_KEY, json!([{"feedID": 9, "title": "Synced"}])),
        );

        let feeds = service.load(&store).await.unwrap();
        assert_eq!(feeds[0].id, 9);
        assert_eq!(feeds[0].title.as_deref(), Some("Synced"));

        // The restore went through the save path, so local is refreshed too.
        let mirrored = local.get(FEEDS_KEY, Value::Null).await.unwrap();
        assert_eq!(mirrored[0]["feedID"], 9);
    }

    #[tokio::test]
    async fn test_primary_store_wins_over_backups() {
        let store = SqliteStore::in_memory().await.unwrap();
        store
            .replace_feeds(vec![Feed {
                id: 2,
                ..Default::default()
            }])
            .await
            .unwrap();
        let (service, _, _) = service(
            MemoryTarget::with_value("local", FEEDS_KEY, json!([{"feedID": 5}])),
            MemoryTarget::new("sync"),
        );

        let feeds = service.load(&store).await.unwrap();
        assert_eq!(feeds.iter().map(|f| f.id).collect::<Vec<_>>(), vec![2]);
    }

    #[tokio::test]
    async fn test_nothing_anywhere_is_empty_not_error() {
        let store = SqliteStore::in_memory().await.unwrap();
        let (service, _, _) = service(
            MemoryTarget::with_value("local", FEEDS_KEY, json!("not a list")),
            MemoryTarget::new("sync"),
        );

        let feeds = service.load(&store).await.unwrap();
        assert!(feeds.is_empty());
        assert!(service.cache().snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_save_writes_minimized_backups() {
        let store = SqliteStore::in_memory().await.unwrap();
        let (service, local, sync) = service(MemoryTarget::new("local"), MemoryTarget::new("sync"));

        let mut feed = Feed::new("https://example.com/feed.xml".into());
        feed.favicon = Some("data:image/png;base64,AAAA".into());
        let stored = service.save(Some(&store), vec![feed]).await.unwrap();
        assert!(stored[0].id > 0);
        assert!(stored[0].favicon.is_some());

        for target in [&local, &sync] {
            let backup = target.get(FEEDS_KEY, Value::Null).await.unwrap();
            let object = backup[0].as_object().unwrap();
            assert_eq!(object["feedID"], stored[0].id);
            assert_eq!(object["url"], "https://example.com/feed.xml");
            assert!(!object.contains_key("favicon"));
            assert!(!object.contains_key("title"));
            assert!(!object.contains_key("parent"));
        }

        assert_eq!(service.cache().snapshot().as_ref(), &stored);
    }

    #[tokio::test]
    async fn test_save_skipped_without_store() {
        let (service, local, _) = service(MemoryTarget::new("local"), MemoryTarget::new("sync"));
        let feeds = vec![Feed::new("https://example.com/feed.xml".into())];

        let returned = service
            .save::<SqliteStore>(None, feeds.clone())
            .await
            .unwrap();

        assert_eq!(returned, feeds);
        assert!(service.cache().snapshot().is_empty());
        assert_eq!(local.get(FEEDS_KEY, Value::Null).await.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn test_backup_failure_does_not_fail_save() {
        let store = SqliteStore::in_memory().await.unwrap();
        let sync = Arc::new(MemoryTarget::new("sync"));
        let service = FeedBackupService::new(Arc::new(BrokenTarget), sync.clone());

        let stored = service
            .save(Some(&store), vec![Feed::folder("News")])
            .await
            .unwrap();

        assert_eq!(stored.len(), 1);
        assert_eq!(store.read_feeds().await.unwrap(), stored);
        let backup = sync.get(FEEDS_KEY, Value::Null).await.unwrap();
        assert_eq!(backup[0]["title"], "News");
    }

    #[tokio::test]
    async fn test_unreadable_backup_falls_through() {
        let store = SqliteStore::in_memory().await.unwrap();
        let sync = Arc::new(MemoryTarget::with_value(
            "sync",
            FEEDS_KEY,
            json!([{"feedID": 9}]),
        ));
        let service = FeedBackupService::new(Arc::new(BrokenTarget), sync);

        let feeds = service.load(&store).await.unwrap();
        assert_eq!(feeds[0].id, 9);
    }

    #[tokio::test]
    async fn test_save_during_load_is_not_lost() {
        let inner = SqliteStore::in_memory().await.unwrap();
        inner
            .replace_feeds(vec![Feed {
                id: 1,
                ..Default::default()
            }])
            .await
            .unwrap();
        let store = GatedStore {
            inner,
            reached: Notify::new(),
            gate: Notify::new(),
        };
        let (service, _, _) = service(MemoryTarget::new("local"), MemoryTarget::new("sync"));
        let newer = vec![Feed {
            id: 2,
            ..Default::default()
        }];

        let (loaded, saved) = tokio::join!(service.load(&store), async {
            // Save while load is paused between reading the store and
            // filling the cache.
            store.reached.notified().await;
            let (saved, _) = tokio::join!(service.save(Some(&store), newer.clone()), async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                store.gate.notify_one();
            });
            saved
        });

        assert_eq!(loaded.unwrap()[0].id, 1);
        assert_eq!(saved.unwrap(), newer);
        assert_eq!(store.inner.read_feeds().await.unwrap(), newer);
        assert_eq!(service.cache().snapshot().as_ref(), &newer);
    }
}
