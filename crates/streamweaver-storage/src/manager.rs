//! Storage Manager
//!
//! Decouples the retention loop from cold-storage latency: callers submit
//! encoded blocks onto a bounded queue and await the outcome; a fixed pool
//! of workers drains the queue and drives the configured backend with
//! retry and exponential backoff.
//!
//! ## Submission semantics
//!
//! - Enqueueing never blocks: a full queue fails the submit with
//!   [`StorageError::QueueFull`] immediately.
//! - Each task owns a single-receive result channel; the worker delivers
//!   exactly one result to it. If the submitter's context is cancelled
//!   first, the submit returns [`StorageError::Cancelled`] and the
//!   worker's eventual result is discarded.
//! - No ordering is guaranteed across tasks. Within a task the backend is
//!   invoked at most once per attempt; a block may be re-installed after a
//!   transient failure, which backends treat as an overwrite.
//!
//! ## Lifecycle
//!
//! The backend is registered before `start`; registration afterwards is an
//! error. `start` spawns the workers under a child of the root
//! cancellation token; `stop` cancels that token and awaits the workers
//! within a deadline.

use crate::backend::StorageBackend;
use crate::error::{Result, StorageError};
use crate::retry::RetryPolicy;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use streamweaver_block::Block;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct StorageManagerConfig {
    /// Number of worker tasks draining the queue.
    pub worker_pool_size: usize,

    /// Bound on queued (not yet claimed) tasks.
    pub queue_size: usize,

    /// Maximum attempts per task, first try included.
    pub max_retries: u32,

    /// Budget on total elapsed time across one task's attempts.
    pub backoff_limit: Duration,
}

impl Default for StorageManagerConfig {
    fn default() -> Self {
        Self {
            worker_pool_size: 5,
            queue_size: 1000,
            max_retries: 3,
            backoff_limit: Duration::from_secs(60),
        }
    }
}

/// In-flight unit of work.
enum StorageTask {
    WriteBlock(WriteBlockTask),
}

struct WriteBlockTask {
    stream_name: String,
    block: Block,
    result: oneshot::Sender<Result<()>>,
    created_at: Instant,
}

type SharedReceiver = Arc<tokio::sync::Mutex<mpsc::Receiver<StorageTask>>>;

pub struct StorageManager {
    config: StorageManagerConfig,
    retry: RetryPolicy,
    backend: Mutex<Option<Arc<dyn StorageBackend>>>,
    tx: mpsc::Sender<StorageTask>,
    rx: Mutex<Option<mpsc::Receiver<StorageTask>>>,
    started: AtomicBool,
    shutdown: Mutex<Option<CancellationToken>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl StorageManager {
    pub fn new(config: StorageManagerConfig) -> Self {
        let retry = RetryPolicy {
            max_attempts: config.max_retries,
            backoff_limit: config.backoff_limit,
            ..RetryPolicy::default()
        };
        Self::with_retry_policy(config, retry)
    }

    /// Construct with an explicit retry policy (tests use short backoffs).
    pub fn with_retry_policy(config: StorageManagerConfig, retry: RetryPolicy) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_size.max(1));
        Self {
            config,
            retry,
            backend: Mutex::new(None),
            tx,
            rx: Mutex::new(Some(rx)),
            started: AtomicBool::new(false),
            shutdown: Mutex::new(None),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Register the cold-storage backend. Must happen before `start`.
    pub fn register_backend(&self, backend: Arc<dyn StorageBackend>) -> Result<()> {
        if self.started.load(Ordering::SeqCst) {
            return Err(StorageError::AlreadyStarted);
        }
        let provider = backend.provider();
        *self.backend.lock().unwrap() = Some(backend);
        info!(provider = %provider, "Registered storage backend");
        Ok(())
    }

    /// Spawn the worker pool. Workers stop when `ctx` (or `stop`) cancels.
    pub fn start(self: &Arc<Self>, ctx: &CancellationToken) -> Result<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(StorageError::AlreadyStarted);
        }
        let rx = self
            .rx
            .lock()
            .unwrap()
            .take()
            .ok_or(StorageError::AlreadyStarted)?;
        let rx: SharedReceiver = Arc::new(tokio::sync::Mutex::new(rx));

        let shutdown = ctx.child_token();
        *self.shutdown.lock().unwrap() = Some(shutdown.clone());

        let mut workers = self.workers.lock().unwrap();
        for worker_id in 0..self.config.worker_pool_size.max(1) {
            let manager = Arc::clone(self);
            let rx = Arc::clone(&rx);
            let token = shutdown.clone();
            workers.push(tokio::spawn(async move {
                manager.worker_loop(worker_id, rx, token).await;
            }));
        }

        info!(
            workers = self.config.worker_pool_size,
            queue_size = self.config.queue_size,
            "Storage manager started"
        );
        Ok(())
    }

    /// Submit a block write and await its outcome.
    pub async fn submit(&self, ctx: &CancellationToken, block: Block) -> Result<()> {
        if self.backend.lock().unwrap().is_none() {
            return Err(StorageError::NoBackendRegistered);
        }
        if !self.started.load(Ordering::SeqCst) {
            return Err(StorageError::NotStarted);
        }

        let (result_tx, result_rx) = oneshot::channel();
        let task = StorageTask::WriteBlock(WriteBlockTask {
            stream_name: block.stream_name.clone(),
            block,
            result: result_tx,
            created_at: Instant::now(),
        });

        self.tx.try_send(task).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => StorageError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => StorageError::Cancelled,
        })?;

        tokio::select! {
            _ = ctx.cancelled() => Err(StorageError::Cancelled),
            result = result_rx => result.unwrap_or(Err(StorageError::Cancelled)),
        }
    }

    /// Cancel the workers and await their completion within `timeout`.
    pub async fn stop(&self, timeout: Duration) -> Result<()> {
        if let Some(token) = self.shutdown.lock().unwrap().take() {
            token.cancel();
        }
        let workers: Vec<_> = std::mem::take(&mut *self.workers.lock().unwrap());
        let drain = async {
            for worker in workers {
                let _ = worker.await;
            }
        };
        tokio::time::timeout(timeout, drain)
            .await
            .map_err(|_| StorageError::Cancelled)?;
        info!("Storage manager stopped");
        Ok(())
    }

    async fn worker_loop(&self, worker_id: usize, rx: SharedReceiver, token: CancellationToken) {
        debug!(worker_id, "Storage worker started");
        loop {
            let task = tokio::select! {
                _ = token.cancelled() => break,
                task = async { rx.lock().await.recv().await } => match task {
                    Some(task) => task,
                    None => break,
                },
            };
            match task {
                StorageTask::WriteBlock(task) => self.run_write(worker_id, task, &token).await,
            }
        }
        debug!(worker_id, "Storage worker stopped");
    }

    async fn run_write(&self, worker_id: usize, task: WriteBlockTask, token: &CancellationToken) {
        let backend = match self.backend.lock().unwrap().clone() {
            Some(backend) => backend,
            None => {
                let _ = task.result.send(Err(StorageError::NoBackendRegistered));
                return;
            }
        };

        let started = Instant::now();
        let mut attempt: u32 = 0;
        let outcome = loop {
            attempt += 1;
            match backend.archive_block(token, &task.block).await {
                Ok(()) => break Ok(()),
                Err(e) if !e.is_transient() => break Err(e),
                Err(e) => {
                    if attempt >= self.retry.max_attempts {
                        break Err(StorageError::RetriesExhausted {
                            attempts: attempt,
                            last_error: e.to_string(),
                        });
                    }
                    let delay = self.retry.backoff(attempt - 1);
                    if started.elapsed() + delay >= self.retry.backoff_limit {
                        break Err(StorageError::RetriesExhausted {
                            attempts: attempt,
                            last_error: e.to_string(),
                        });
                    }
                    warn!(
                        worker_id,
                        stream = %task.stream_name,
                        block_id = %task.block.block_id,
                        attempt,
                        backoff_ms = delay.as_millis() as u64,
                        error = %e,
                        "Block write failed, backing off"
                    );
                    tokio::select! {
                        _ = token.cancelled() => break Err(StorageError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        };

        match &outcome {
            Ok(()) => debug!(
                worker_id,
                stream = %task.stream_name,
                block_id = %task.block.block_id,
                attempts = attempt,
                queued_ms = task.created_at.elapsed().as_millis() as u64,
                "Block write completed"
            ),
            Err(e) => warn!(
                worker_id,
                stream = %task.stream_name,
                block_id = %task.block.block_id,
                error = %e,
                "Block write failed"
            ),
        }

        // The submitter may have gone away; dropping the result is fine.
        let _ = task.result.send(outcome);
    }
}
