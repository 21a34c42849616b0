use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::info;

use crate::app::error::{Result, StoreError};
use crate::backup::{BackupTarget, FeedBackupService, JsonFileTarget, MemoryTarget};
use crate::config::{Config, Durability};
use crate::domain::{Entry, EntryInput, Feed, Filter, Revision};
use crate::query::{self, QueryHandle};
use crate::store::{Location, SqliteStore, Store};

pub struct AppContext {
    config: Config,
    store: OnceCell<SqliteStore>,
    backups: FeedBackupService,
}

impl AppContext {
    /// Build a context whose backup targets follow the configured durability:
    /// JSON files for a persistent store, memory for an ephemeral one.
    pub fn new(config: Config) -> Result<Self> {
        let (local, sync): (Arc<dyn BackupTarget>, Arc<dyn BackupTarget>) =
            match config.storage.durability {
                Durability::Ephemeral => (
                    Arc::new(MemoryTarget::new("local")),
                    Arc::new(MemoryTarget::new("sync")),
                ),
                Durability::Persistent => (
                    Arc::new(JsonFileTarget::new("local", config.local_backup_path()?)),
                    Arc::new(JsonFileTarget::new("sync", config.sync_backup_path()?)),
                ),
            };
        Ok(Self::with_targets(config, local, sync))
    }

    pub fn with_targets(
        config: Config,
        local: Arc<dyn BackupTarget>,
        sync: Arc<dyn BackupTarget>,
    ) -> Self {
        Self {
            config,
            store: OnceCell::new(),
            backups: FeedBackupService::new(local, sync),
        }
    }

    pub fn ephemeral() -> Self {
        Self::with_targets(
            Config::ephemeral(),
            Arc::new(MemoryTarget::new("local")),
            Arc::new(MemoryTarget::new("sync")),
        )
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Open and migrate the store, then load the feed list.
    ///
    /// Safe to call any number of times; only the first call does work.
    pub async fn init(&self) -> Result<&SqliteStore> {
        self.store
            .get_or_try_init(|| async {
                let location = match self.config.storage.durability {
                    Durability::Ephemeral => Location::Memory,
                    Durability::Persistent => Location::File(self.config.database_path()?),
                };
                let store = SqliteStore::open(location).await?;
                let feeds = self.backups.load(&store).await?;
                info!(feeds = feeds.len(), "Store initialized");
                Ok::<_, StoreError>(store)
            })
            .await
    }

    pub fn is_initialized(&self) -> bool {
        self.store.initialized()
    }

    pub fn store(&self) -> Result<&SqliteStore> {
        self.store.get().ok_or(StoreError::NotInitialized)
    }

    pub async fn put_entries(&self, entries: Vec<EntryInput>) -> Result<Vec<i64>> {
        self.store()?.put_entries(entries).await
    }

    pub async fn delete_entries(&self, ids: &[i64]) -> Result<()> {
        self.store()?.delete_entries(ids).await
    }

    pub async fn clear_entries(&self) -> Result<()> {
        self.store()?.clear_entries().await
    }

    pub async fn list_entries(&self) -> Result<Vec<i64>> {
        self.store()?.list_entries().await
    }

    pub async fn get_entry(&self, id: i64) -> Result<Option<Entry>> {
        self.store()?.get_entry(id).await
    }

    pub async fn get_revision(&self, id: i64) -> Result<Option<Revision>> {
        self.store()?.get_revision(id).await
    }

    pub async fn load_feeds(&self) -> Result<Vec<Feed>> {
        self.backups.load(self.store()?).await
    }

    /// Skipped, not failed, when called before [`init`](Self::init).
    pub async fn save_feeds(&self, feeds: Vec<Feed>) -> Result<Vec<Feed>> {
        self.backups.save(self.store.get(), feeds).await
    }

    /// The feed list as of the latest load or save.
    pub fn feeds(&self) -> Arc<Vec<Feed>> {
        self.backups.cache().snapshot()
    }

    /// Compile `filter` against the cached feed list.
    ///
    /// An invalid filter is reported even before `init`.
    pub fn query(&self, filter: &Filter) -> Result<QueryHandle> {
        let plan = query::compile(filter, &self.feeds())?;
        let store = self.store()?;
        Ok(QueryHandle::new(store.backend().clone(), plan))
    }
}
