//! Request and transaction completion handles.
//!
//! A [`Transaction`] queues operations; [`Transaction::commit`] hands them to
//! the backend worker, which runs them in order inside one SQLite transaction.
//! Two kinds of completion come back:
//!
//! - each [`Request`] resolves as soon as the worker has executed that one
//!   operation, which can be before or after the transaction commits;
//! - the [`Completion`] resolves once the whole transaction has committed, or
//!   fails once if any operation failed and everything was rolled back.
//!
//! A resolved request therefore does not mean its write is durable. Await the
//! completion for that.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::{mpsc, oneshot};

use crate::app::{Result, StoreError};

pub(crate) type Operation = Box<dyn FnOnce(&rusqlite::Transaction<'_>) -> Result<()> + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    ReadOnly,
    ReadWrite,
}

pub(crate) struct Job {
    pub label: &'static str,
    pub mode: Mode,
    pub operations: Vec<Operation>,
    pub done: oneshot::Sender<Result<()>>,
}

pub struct Transaction {
    label: &'static str,
    mode: Mode,
    operations: Vec<Operation>,
    jobs: mpsc::UnboundedSender<Job>,
}

impl Transaction {
    pub(crate) fn new(label: &'static str, mode: Mode, jobs: mpsc::UnboundedSender<Job>) -> Self {
        Self {
            label,
            mode,
            operations: Vec::new(),
            jobs,
        }
    }

    /// Queue one operation. It runs after every previously queued one.
    pub fn request<T, F>(&mut self, op: F) -> Request<T>
    where
        T: Send + 'static,
        F: FnOnce(&rusqlite::Transaction<'_>) -> Result<T> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.operations.push(Box::new(move |txn: &rusqlite::Transaction<'_>| match op(txn) {
            Ok(value) => {
                let _ = tx.send(Ok(value));
                Ok(())
            }
            Err(e) => {
                let _ = tx.send(Err(StoreError::Aborted(e.to_string())));
                Err(e)
            }
        }));
        Request { rx }
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Submit the queued operations. No more can be added afterwards.
    pub fn commit(self) -> Completion {
        let (done, rx) = oneshot::channel();
        let job = Job {
            label: self.label,
            mode: self.mode,
            operations: self.operations,
            done,
        };
        // A closed worker drops the job, and with it every responder.
        let _ = self.jobs.send(job);
        Completion { rx }
    }
}

/// Result of one queued operation.
#[must_use = "requests do nothing unless awaited"]
pub struct Request<T> {
    rx: oneshot::Receiver<Result<T>>,
}

impl<T> Future for Request<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|received| {
            received.unwrap_or_else(|_| {
                Err(StoreError::Aborted(
                    "transaction ended before the request ran".into(),
                ))
            })
        })
    }
}

/// Commit signal of a whole transaction.
#[must_use = "a transaction's outcome is only known once its completion is awaited"]
pub struct Completion {
    rx: oneshot::Receiver<Result<()>>,
}

impl Future for Completion {
    type Output = Result<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(StoreError::BackendClosed)))
    }
}
