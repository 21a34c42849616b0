pub mod compile;
pub(crate) mod scan;

use std::fmt;
use std::sync::Arc;

use crate::app::Result;
use crate::domain::Entry;
use crate::store::backend::Backend;
use crate::store::transaction::Mode;

pub use compile::{compile, descendants, resolve_feeds, KeyRange, Plan, Predicate, ScanIndex};

/// A compiled query bound to a store.
///
/// `count`, `entries` and `ids` all run the same plan through the same
/// scan, so the number `count` reports is always the number of records
/// `entries` returns.
#[derive(Clone)]
pub struct QueryHandle {
    backend: Backend,
    plan: Arc<Plan>,
}

impl QueryHandle {
    pub(crate) fn new(backend: Backend, plan: Plan) -> Self {
        Self {
            backend,
            plan: Arc::new(plan),
        }
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub async fn count(&self) -> Result<u64> {
        self.run("query.count", |conn, plan| {
            let mut count = 0u64;
            scan::scan(conn, plan, |_| count += 1)?;
            Ok(count)
        })
        .await
    }

    pub async fn entries(&self) -> Result<Vec<Entry>> {
        self.run("query.entries", |conn, plan| {
            let mut entries = Vec::new();
            scan::scan(conn, plan, |entry| entries.push(entry))?;
            Ok(entries)
        })
        .await
    }

    pub async fn ids(&self) -> Result<Vec<i64>> {
        self.run("query.ids", |conn, plan| {
            let mut ids = Vec::new();
            scan::scan(conn, plan, |entry| ids.push(entry.id))?;
            Ok(ids)
        })
        .await
    }

    async fn run<T, F>(&self, label: &'static str, collect: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&rusqlite::Connection, &Plan) -> Result<T> + Send + 'static,
    {
        let plan = Arc::clone(&self.plan);
        let mut txn = self.backend.transaction(Mode::ReadOnly, label);
        let request = txn.request(move |t| collect(&**t, &plan));
        txn.commit().await?;
        request.await
    }
}

impl fmt::Debug for QueryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryHandle").field("plan", &self.plan).finish()
    }
}
