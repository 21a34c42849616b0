use std::path::PathBuf;
use std::thread;

use rusqlite::{Connection, TransactionBehavior};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::app::{Result, StoreError};
use crate::store::schema;
use crate::store::transaction::{Job, Mode, Transaction};

/// Where the SQLite database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Memory,
    File(PathBuf),
}

/// Handle to the worker thread that owns the connection.
///
/// Jobs run one at a time in submission order, so operations against the
/// same tables never interleave.
#[derive(Clone, Debug)]
pub struct Backend {
    jobs: mpsc::UnboundedSender<Job>,
}

impl Backend {
    /// Open the database and run pending migrations before any job is
    /// accepted. A migration failure fails the open.
    pub async fn open(location: Location) -> Result<Self> {
        let (jobs, rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = oneshot::channel();

        thread::Builder::new()
            .name("rivulet-store".into())
            .spawn(move || match open_connection(&location) {
                Ok(conn) => {
                    let _ = ready_tx.send(Ok(()));
                    run(conn, rx);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })?;

        ready_rx.await.map_err(|_| StoreError::BackendClosed)??;
        Ok(Self { jobs })
    }

    pub fn transaction(&self, mode: Mode, label: &'static str) -> Transaction {
        Transaction::new(label, mode, self.jobs.clone())
    }

    pub fn is_closed(&self) -> bool {
        self.jobs.is_closed()
    }
}

fn open_connection(location: &Location) -> Result<Connection> {
    let mut conn = match location {
        Location::Memory => Connection::open_in_memory()?,
        Location::File(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            Connection::open(path)?
        }
    };

    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    schema::migrate(&mut conn)?;
    info!(?location, "Opened store");
    Ok(conn)
}

fn run(mut conn: Connection, mut rx: mpsc::UnboundedReceiver<Job>) {
    while let Some(job) = rx.blocking_recv() {
        let label = job.label;
        let result = execute(&mut conn, job.mode, job.operations);
        match &result {
            Ok(()) => debug!(transaction = label, "Committed"),
            Err(e) => warn!(transaction = label, error = %e, "Rolled back"),
        }
        let _ = job.done.send(result);
    }
    debug!("Store worker stopped");
}

fn execute(
    conn: &mut Connection,
    mode: Mode,
    operations: Vec<crate::store::transaction::Operation>,
) -> Result<()> {
    let behavior = match mode {
        Mode::ReadOnly => TransactionBehavior::Deferred,
        Mode::ReadWrite => TransactionBehavior::Immediate,
    };
    let txn = conn.transaction_with_behavior(behavior)?;

    // Dropping `txn` on an early return rolls it back; the operations that
    // never ran drop their responders with it.
    for operation in operations {
        operation(&txn)?;
    }

    txn.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::params;
    use tokio_test::{assert_err, assert_ok};

    fn count_entries(txn: &rusqlite::Transaction<'_>) -> Result<i64> {
        Ok(txn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?)
    }

    fn insert_entry(txn: &rusqlite::Transaction<'_>, id: i64) -> Result<i64> {
        txn.execute(
            "INSERT INTO entries (id, feed_id, read, date) VALUES (?1, 1, 0, ?2)",
            params![id, id * 100],
        )?;
        Ok(id)
    }

    #[tokio::test]
    async fn test_requests_resolve_and_transaction_commits() {
        let backend = Backend::open(Location::Memory).await.unwrap();

        let mut txn = backend.transaction(Mode::ReadWrite, "test.insert");
        let first = txn.request(|t| insert_entry(t, 1));
        let second = txn.request(|t| insert_entry(t, 2));
        let count = txn.request(count_entries);
        assert_eq!(txn.len(), 3);

        assert_ok!(txn.commit().await);
        assert_eq!(first.await.unwrap(), 1);
        assert_eq!(second.await.unwrap(), 2);
        assert_eq!(count.await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_failed_operation_rolls_back_whole_transaction() {
        let backend = Backend::open(Location::Memory).await.unwrap();

        let mut txn = backend.transaction(Mode::ReadWrite, "test.conflict");
        let first = txn.request(|t| insert_entry(t, 1));
        let duplicate = txn.request(|t| insert_entry(t, 1));
        let after = txn.request(count_entries);

        let err = txn.commit().await.unwrap_err();
        assert!(matches!(err, StoreError::Database(_)));

        // The first request ran before the failure and still reports success.
        assert_ok!(first.await);
        assert!(matches!(duplicate.await, Err(StoreError::Aborted(_))));
        assert!(matches!(after.await, Err(StoreError::Aborted(_))));

        let mut check = backend.transaction(Mode::ReadOnly, "test.count");
        let count = check.request(count_entries);
        assert_ok!(check.commit().await);
        assert_eq!(count.await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_request_error_surfaces_on_completion_once() {
        let backend = Backend::open(Location::Memory).await.unwrap();

        let mut txn = backend.transaction(Mode::ReadWrite, "test.other");
        let failing = txn.request(|_| -> Result<()> { Err(StoreError::Other("boom".into())) });

        let err = txn.commit().await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
        match failing.await {
            Err(StoreError::Aborted(message)) => assert_eq!(message, "boom"),
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_dropped_transaction_aborts_requests() {
        let backend = Backend::open(Location::Memory).await.unwrap();

        let mut txn = backend.transaction(Mode::ReadWrite, "test.dropped");
        let request = txn.request(|t| insert_entry(t, 1));
        drop(txn);

        assert_err!(request.await);
    }

    #[tokio::test]
    async fn test_empty_transaction_commits() {
        let backend = Backend::open(Location::Memory).await.unwrap();
        let txn = backend.transaction(Mode::ReadOnly, "test.empty");
        assert!(txn.is_empty());
        assert_ok!(txn.commit().await);
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.db");

        {
            let backend = Backend::open(Location::File(path.clone())).await.unwrap();
            let mut txn = backend.transaction(Mode::ReadWrite, "test.insert");
            let _ = txn.request(|t| insert_entry(t, 1));
            assert_ok!(txn.commit().await);
        }

        let backend = Backend::open(Location::File(path)).await.unwrap();
        let mut txn = backend.transaction(Mode::ReadOnly, "test.count");
        let count = txn.request(count_entries);
        assert_ok!(txn.commit().await);
        assert_eq!(count.await.unwrap(), 1);
    }
}
