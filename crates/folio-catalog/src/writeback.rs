//! Fire-and-forget persistence of content into the durable tree.
//!
//! Callers hand a `(path, content)` pair to [`WriteBackWriter::enqueue`] and
//! move on. A bounded channel feeds a fixed pool of worker tasks, each of
//! which creates the missing directories above the path and writes the blob.
//! A full queue drops the write instead of blocking the caller; failures of
//! either kind are logged and counted, never returned.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use folio_store::DurableTree;
use folio_types::TreePath;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex, Notify};
use tracing::{debug, error, warn};

use crate::error::{CatalogError, CatalogResult};

/// Queue size and worker count for a [`WriteBackWriter`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteBackConfig {
    pub workers: usize,
    pub queue_capacity: usize,
}

impl Default for WriteBackConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 1024,
        }
    }
}

impl WriteBackConfig {
    pub fn validate(&self) -> CatalogResult<()> {
        if self.workers == 0 {
            return Err(CatalogError::Config(
                "write_back.workers must be at least 1".into(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(CatalogError::Config(
                "write_back.queue_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Running totals for a [`WriteBackWriter`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct WriteBackStats {
    /// Blobs written successfully.
    pub written: u64,
    /// Writes the durable tree rejected.
    pub failed: u64,
    /// Writes discarded because the queue was full.
    pub dropped: u64,
}

struct Job {
    path: TreePath,
    content: Bytes,
}

#[derive(Default)]
struct Shared {
    outstanding: AtomicUsize,
    idle: Notify,
    written: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

impl Shared {
    fn finish(&self) {
        if self.outstanding.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }
}

/// Background writer that persists blobs without making callers wait.
///
/// Cloning is cheap; clones feed the same queue. Workers exit once every
/// clone has been dropped and the queue is empty.
#[derive(Clone)]
pub struct WriteBackWriter {
    sender: mpsc::Sender<Job>,
    shared: Arc<Shared>,
}

impl WriteBackWriter {
    /// Start the worker pool on the current tokio runtime.
    pub fn spawn(tree: Arc<dyn DurableTree>, config: &WriteBackConfig) -> CatalogResult<Self> {
        config.validate()?;
        let (sender, receiver) = mpsc::channel(config.queue_capacity);
        let receiver = Arc::new(Mutex::new(receiver));
        let shared = Arc::new(Shared::default());

        for id in 0..config.workers {
            tokio::spawn(worker(
                id,
                Arc::clone(&tree),
                Arc::clone(&receiver),
                Arc::clone(&shared),
            ));
        }
        debug!(
            workers = config.workers,
            capacity = config.queue_capacity,
            "write-back pool started"
        );

        Ok(Self { sender, shared })
    }

    /// Schedule `content` to be written at `path`. Never blocks.
    pub fn enqueue(&self, path: TreePath, content: Bytes) {
        self.shared.outstanding.fetch_add(1, Ordering::SeqCst);
        if let Err(e) = self.sender.try_send(Job { path, content }) {
            let (reason, job) = match e {
                mpsc::error::TrySendError::Full(job) => ("queue full", job),
                mpsc::error::TrySendError::Closed(job) => ("writer closed", job),
            };
            let err = CatalogError::DurableWriteFailed {
                path: job.path.to_string(),
                reason: reason.into(),
            };
            warn!(error = %err, "dropping durable write");
            self.shared.dropped.fetch_add(1, Ordering::Relaxed);
            self.shared.finish();
        }
    }

    /// Wait until every enqueued write has been attempted.
    pub async fn drain(&self) {
        loop {
            let notified = self.shared.idle.notified();
            if self.shared.outstanding.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }

    pub fn stats(&self) -> WriteBackStats {
        WriteBackStats {
            written: self.shared.written.load(Ordering::Relaxed),
            failed: self.shared.failed.load(Ordering::Relaxed),
            dropped: self.shared.dropped.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for WriteBackWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteBackWriter")
            .field("outstanding", &self.shared.outstanding.load(Ordering::SeqCst))
            .field("stats", &self.stats())
            .finish()
    }
}

async fn worker(
    id: usize,
    tree: Arc<dyn DurableTree>,
    receiver: Arc<Mutex<mpsc::Receiver<Job>>>,
    shared: Arc<Shared>,
) {
    loop {
        // Hold the lock only while waiting for the next job.
        let job = receiver.lock().await.recv().await;
        let Some(job) = job else {
            debug!(worker = id, "write-back worker stopping");
            return;
        };

        match persist(tree.as_ref(), &job).await {
            Ok(()) => {
                debug!(worker = id, path = %job.path, bytes = job.content.len(), "persisted blob");
                shared.written.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                error!(worker = id, error = %e, "durable write failed");
                shared.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
        shared.finish();
    }
}

async fn persist(tree: &dyn DurableTree, job: &Job) -> CatalogResult<()> {
    let failed = |e: folio_store::StoreError| CatalogError::DurableWriteFailed {
        path: job.path.to_string(),
        reason: e.to_string(),
    };
    if let Some(parent) = job.path.parent().filter(|p| !p.is_root()) {
        tree.create_dirs(&parent).await.map_err(failed)?;
    }
    tree.write(&job.path, job.content.clone())
        .await
        .map_err(failed)
}
