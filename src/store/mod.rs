pub mod backend;
pub(crate) mod entries;
pub(crate) mod feeds;
pub mod schema;
pub mod sqlite;
pub mod transaction;

use async_trait::async_trait;

use crate::app::Result;
use crate::domain::{Entry, EntryInput, Feed, Revision};

pub use backend::{Backend, Location};
pub use sqlite::SqliteStore;
pub use transaction::{Completion, Mode, Request, Transaction};

#[async_trait]
pub trait Store: Send + Sync {
    // Entry operations
    async fn put_entries(&self, entries: Vec<EntryInput>) -> Result<Vec<i64>>;
    async fn delete_entries(&self, ids: &[i64]) -> Result<()>;
    async fn clear_entries(&self) -> Result<()>;
    async fn list_entries(&self) -> Result<Vec<i64>>;
    async fn get_entry(&self, id: i64) -> Result<Option<Entry>>;
    async fn get_revision(&self, id: i64) -> Result<Option<Revision>>;

    // Index lookups
    async fn entries_by_primary_hash(&self, hash: &str) -> Result<Vec<i64>>;
    async fn entries_by_url(&self, url: &str) -> Result<Vec<i64>>;
    async fn entries_by_bookmark(&self, bookmark_id: i64) -> Result<Vec<i64>>;
    async fn entries_by_tag(&self, tag: &str) -> Result<Vec<i64>>;

    // Feed operations
    async fn read_feeds(&self) -> Result<Vec<Feed>>;
    async fn replace_feeds(&self, feeds: Vec<Feed>) -> Result<Vec<Feed>>;

    async fn schema_version(&self) -> Result<usize>;
}
