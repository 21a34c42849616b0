use async_trait::async_trait;
use tracing::info;

use crate::app::Result;
use crate::domain::{Entry, EntryInput, Feed, Filter, Revision};
use crate::query::{self, QueryHandle};
use crate::store::backend::{Backend, Location};
use crate::store::transaction::Mode;
use crate::store::{entries, feeds, schema, Store};

pub struct SqliteStore {
    backend: Backend,
}

impl SqliteStore {
    pub async fn open(location: Location) -> Result<Self> {
        let backend = Backend::open(location).await?;
        Ok(Self { backend })
    }

    pub async fn in_memory() -> Result<Self> {
        Self::open(Location::Memory).await
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Compile `filter` against the feed list and bind it to this store.
    /// Invalid filters fail here, before any row is read.
    pub fn query(&self, filter: &Filter, feeds: &[Feed]) -> Result<QueryHandle> {
        let plan = query::compile(filter, feeds)?;
        Ok(QueryHandle::new(self.backend.clone(), plan))
    }

    async fn read<T, F>(&self, label: &'static str, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&rusqlite::Transaction<'_>) -> Result<T> + Send + 'static,
    {
        let mut txn = self.backend.transaction(Mode::ReadOnly, label);
        let request = txn.request(op);
        txn.commit().await?;
        request.await
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn put_entries(&self, inputs: Vec<EntryInput>) -> Result<Vec<i64>> {
        let mut txn = self.backend.transaction(Mode::ReadWrite, "put_entries");
        let before = txn.request(|t| entries::count(t));
        let ids = txn.request(move |t| {
            inputs
                .into_iter()
                .map(|input| entries::write_entry(t, input))
                .collect::<Result<Vec<_>>>()
        });
        let after = txn.request(|t| entries::count(t));
        txn.commit().await?;

        let ids = ids.await?;
        let (before, after) = (before.await?, after.await?);
        info!(before, after, written = ids.len(), "Put entries");
        Ok(ids)
    }

    async fn delete_entries(&self, ids: &[i64]) -> Result<()> {
        let ids = ids.to_vec();
        let requested = ids.len();

        let mut txn = self.backend.transaction(Mode::ReadWrite, "delete_entries");
        let before = txn.request(|t| entries::count(t));
        let deleted = txn.request(move |t| {
            let mut deleted = 0usize;
            for id in ids {
                if entries::delete_entry(t, id)? {
                    deleted += 1;
                }
            }
            Ok(deleted)
        });
        let after = txn.request(|t| entries::count(t));
        txn.commit().await?;

        let deleted = deleted.await?;
        let (before, after) = (before.await?, after.await?);
        info!(before, after, requested, deleted, "Deleted entries");
        Ok(())
    }

    async fn clear_entries(&self) -> Result<()> {
        let mut txn = self.backend.transaction(Mode::ReadWrite, "clear_entries");
        let before = txn.request(|t| entries::count(t));
        let cleared = txn.request(|t| entries::clear(t));
        let after = txn.request(|t| entries::count(t));
        txn.commit().await?;

        cleared.await?;
        let (before, after) = (before.await?, after.await?);
        info!(before, after, "Cleared entries");
        Ok(())
    }

    async fn list_entries(&self) -> Result<Vec<i64>> {
        self.read("list_entries", |t| entries::list_ids(t)).await
    }

    async fn get_entry(&self, id: i64) -> Result<Option<Entry>> {
        self.read("get_entry", move |t| entries::get_entry(t, id))
            .await
    }

    async fn get_revision(&self, id: i64) -> Result<Option<Revision>> {
        self.read("get_revision", move |t| entries::get_revision(t, id))
            .await
    }

    async fn entries_by_primary_hash(&self, hash: &str) -> Result<Vec<i64>> {
        let hash = hash.to_string();
        self.read("entries_by_primary_hash", move |t| {
            entries::ids_by_primary_hash(t, &hash)
        })
        .await
    }

    async fn entries_by_url(&self, url: &str) -> Result<Vec<i64>> {
        let url = url.to_string();
        self.read("entries_by_url", move |t| entries::ids_by_url(t, &url))
            .await
    }

    async fn entries_by_bookmark(&self, bookmark_id: i64) -> Result<Vec<i64>> {
        self.read("entries_by_bookmark", move |t| {
            entries::ids_by_bookmark(t, bookmark_id)
        })
        .await
    }

    async fn entries_by_tag(&self, tag: &str) -> Result<Vec<i64>> {
        let tag = tag.trim().to_string();
        self.read("entries_by_tag", move |t| entries::ids_by_tag(t, &tag))
            .await
    }

    async fn read_feeds(&self) -> Result<Vec<Feed>> {
        self.read("read_feeds", |t| feeds::read_all(t)).await
    }

    async fn replace_feeds(&self, list: Vec<Feed>) -> Result<Vec<Feed>> {
        let mut txn = self.backend.transaction(Mode::ReadWrite, "replace_feeds");
        let before = txn.request(|t| feeds::count(t));
        let stored = txn.request(move |t| feeds::replace_all(t, list));
        let after = txn.request(|t| feeds::count(t));
        txn.commit().await?;

        let stored = stored.await?;
        let (before, after) = (before.await?, after.await?);
        info!(before, after, "Replaced feeds");
        Ok(stored)
    }

    async fn schema_version(&self) -> Result<usize> {
        self.read("schema_version", |t| schema::version(t)).await
    }
}
