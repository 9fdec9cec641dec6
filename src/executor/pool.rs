//! Bounded worker pool for processing entries concurrently.
//!
//! Dispatcher + worker inbox design:
//! - single-consumer upstream `mpsc::Receiver` (dispatcher)
//! - per-worker `mpsc` inbox channels, filled round-robin
//! - blocking filesystem work runs in `spawn_blocking`
//! - explicit sender drop on shutdown before awaiting workers
//!
//! Results are returned sorted by entry index, so callers see input order
//! regardless of completion order.

use super::EntryResult;
use crate::types::{FailureReason, MappingEntry, ModSyncError, Result};
use tokio::runtime::{Builder, Runtime};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use std::sync::Arc;

/// Work item accepted by the pool.
#[derive(Debug, Clone)]
pub struct EntryJob {
    pub index: usize,
    pub entry: MappingEntry,
}

/// Function run for every job on a blocking thread.
pub type JobHandler = Arc<dyn Fn(&EntryJob) -> EntryResult + Send + Sync>;

/// Runtime stats for the pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStats {
    pub workers: usize,
    pub enqueued: usize,
    pub dispatched: usize,
    pub completed: usize,
    pub per_worker_completed: Vec<usize>,
}

impl PoolStats {
    fn new(workers: usize) -> Self {
        Self {
            workers,
            enqueued: 0,
            dispatched: 0,
            completed: 0,
            per_worker_completed: vec![0; workers],
        }
    }
}

type ResultSlots = Arc<Mutex<Vec<(usize, EntryResult)>>>;

/// Worker pool with bounded channels.
pub struct ParallelExecutor {
    runtime: Runtime,
    enqueue_tx: Option<mpsc::Sender<EntryJob>>,
    dispatcher_handle: Option<JoinHandle<()>>,
    worker_handles: Vec<JoinHandle<()>>,
    results: ResultSlots,
    stats: Arc<Mutex<PoolStats>>,
}

impl ParallelExecutor {
    /// Create a dispatcher + worker pool.
    pub fn new(worker_count: usize, queue_capacity: usize, handler: JobHandler) -> Result<Self> {
        let workers = worker_count.max(1);
        let capacity = queue_capacity.max(1);
        let runtime = Builder::new_multi_thread()
            .worker_threads(workers)
            .thread_name("modsync-worker")
            .enable_all()
            .build()
            .map_err(ModSyncError::Io)?;

        let stats = Arc::new(Mutex::new(PoolStats::new(workers)));
        let results: ResultSlots = Arc::new(Mutex::new(Vec::new()));
        let handle = runtime.handle().clone();

        let (enqueue_tx, enqueue_rx) = mpsc::channel::<EntryJob>(capacity);

        let mut worker_txs = Vec::with_capacity(workers);
        let mut worker_handles = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            let (worker_tx, worker_rx) = mpsc::channel::<EntryJob>(capacity);
            worker_txs.push(worker_tx);
            worker_handles.push(handle.spawn(worker_loop(
                worker_id,
                worker_rx,
                Arc::clone(&handler),
                Arc::clone(&results),
                Arc::clone(&stats),
            )));
        }

        let dispatcher_handle =
            handle.spawn(dispatcher_loop(enqueue_rx, worker_txs, Arc::clone(&stats)));

        Ok(Self {
            runtime,
            enqueue_tx: Some(enqueue_tx),
            dispatcher_handle: Some(dispatcher_handle),
            worker_handles,
            results,
            stats,
        })
    }

    /// Enqueue a job; blocks while the upstream queue is full.
    pub fn enqueue(&self, job: EntryJob) -> Result<()> {
        let sender = self
            .enqueue_tx
            .as_ref()
            .ok_or_else(|| ModSyncError::Worker("pool queue is already closed".to_string()))?;
        let stats = Arc::clone(&self.stats);

        self.runtime.block_on(async {
            sender
                .send(job)
                .await
                .map_err(|_| ModSyncError::Worker("pool queue receiver is closed".to_string()))?;

            let mut guard = stats.lock().await;
            guard.enqueued += 1;
            Ok(())
        })
    }

    /// Close queue input, wait for every job, and return results in index order.
    pub fn close_and_wait(mut self) -> Result<(Vec<EntryResult>, PoolStats)> {
        self.enqueue_tx.take();

        let dispatcher = self.dispatcher_handle.take();
        let workers = std::mem::take(&mut self.worker_handles);
        let results = Arc::clone(&self.results);
        let stats = Arc::clone(&self.stats);

        self.runtime.block_on(async move {
            if let Some(handle) = dispatcher {
                handle.await.map_err(map_join_error)?;
            }
            for handle in workers {
                handle.await.map_err(map_join_error)?;
            }

            let mut slots = std::mem::take(&mut *results.lock().await);
            slots.sort_by_key(|(index, _)| *index);
            let ordered = slots.into_iter().map(|(_, result)| result).collect();
            let stats = stats.lock().await.clone();
            Ok((ordered, stats))
        })
    }
}

async fn dispatcher_loop(
    mut enqueue_rx: mpsc::Receiver<EntryJob>,
    worker_txs: Vec<mpsc::Sender<EntryJob>>,
    stats: Arc<Mutex<PoolStats>>,
) {
    let mut next_worker = 0usize;
    let worker_len = worker_txs.len();

    while let Some(job) = enqueue_rx.recv().await {
        if worker_len == 0 {
            break;
        }

        let target = next_worker % worker_len;
        if worker_txs[target].send(job).await.is_ok() {
            let mut guard = stats.lock().await;
            guard.dispatched += 1;
            next_worker = (next_worker + 1) % worker_len;
        }
    }
    // worker_txs are dropped here, which closes worker inboxes.
}

async fn worker_loop(
    worker_id: usize,
    mut worker_rx: mpsc::Receiver<EntryJob>,
    handler: JobHandler,
    results: ResultSlots,
    stats: Arc<Mutex<PoolStats>>,
) {
    while let Some(job) = worker_rx.recv().await {
        let index = job.index;
        let entry = job.entry.clone();
        let handler = Arc::clone(&handler);

        let result = match tokio::task::spawn_blocking(move || handler(&job)).await {
            Ok(result) => result,
            Err(err) => EntryResult::failed(
                entry,
                FailureReason::Other(format!("worker task failed: {}", err)),
            ),
        };

        results.lock().await.push((index, result));

        let mut guard = stats.lock().await;
        guard.completed += 1;
        if let Some(slot) = guard.per_worker_completed.get_mut(worker_id) {
            *slot += 1;
        }
    }
}

fn map_join_error(error: tokio::task::JoinError) -> ModSyncError {
    ModSyncError::Worker(format!("pool task failed: {}", error))
}
