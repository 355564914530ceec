//! Bounded worker pool
//!
//! A fixed number of workers pull jobs from one bounded queue. Handlers can
//! ask for a job to be re-queued after a delay. Every job, including one
//! waiting out a retry delay, holds a pending slot until it finishes or is
//! dropped; shutdown closes the queue only once no slots remain.

use crate::AuditError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// What a handler wants done with a job after running it
#[derive(Debug)]
pub enum JobOutcome<J> {
    Done,
    RetryAfter(Duration, J),
}

/// Runs jobs of type `J`
#[async_trait]
pub trait JobHandler<J: Send + 'static>: Send + Sync + 'static {
    async fn handle(&self, job: J) -> JobOutcome<J>;
}

/// Counts one outstanding job; released on drop
struct PendingSlot(Arc<watch::Sender<usize>>);

impl PendingSlot {
    fn take(counter: &Arc<watch::Sender<usize>>) -> Self {
        counter.send_modify(|pending| *pending += 1);
        Self(Arc::clone(counter))
    }
}

impl Drop for PendingSlot {
    fn drop(&mut self) {
        self.0.send_modify(|pending| *pending = pending.saturating_sub(1));
    }
}

/// A named pool of workers sharing one bounded queue
pub struct WorkerPool<J: Send + 'static> {
    name: &'static str,
    sender: Mutex<Option<mpsc::Sender<(J, PendingSlot)>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    pending: Arc<watch::Sender<usize>>,
    closing: AtomicBool,
}

impl<J: Send + 'static> WorkerPool<J> {
    /// Starts `workers` workers on the current runtime
    ///
    /// # Arguments
    ///
    /// * `name` - Pool name used in logs and errors
    /// * `workers` - Number of concurrent workers (at least one)
    /// * `capacity` - Queue length; `submit` waits when it is full
    /// * `handler` - Runs each job
    pub fn new(
        name: &'static str,
        workers: usize,
        capacity: usize,
        handler: Arc<dyn JobHandler<J>>,
    ) -> Self {
        let (sender, receiver) = mpsc::channel::<(J, PendingSlot)>(capacity.max(1));
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let (pending, _) = watch::channel(0usize);

        let handles = (0..workers.max(1))
            .map(|worker| {
                let receiver = Arc::clone(&receiver);
                let handler = Arc::clone(&handler);
                let retry_sender = sender.downgrade();

                tokio::spawn(async move {
                    loop {
                        let next = { receiver.lock().await.recv().await };
                        let Some((job, slot)) = next else {
                            tracing::debug!(pool = name, worker, "Queue closed, worker exiting");
                            break;
                        };

                        if let JobOutcome::RetryAfter(delay, job) = handler.handle(job).await {
                            let retry_sender = retry_sender.clone();
                            tokio::spawn(async move {
                                tokio::time::sleep(delay).await;
                                let Some(sender) = retry_sender.upgrade() else {
                                    tracing::warn!(pool = name, "Pool stopped, dropping retry");
                                    return;
                                };
                                if sender.send((job, slot)).await.is_err() {
                                    tracing::warn!(pool = name, "Pool stopped, dropping retry");
                                }
                            });
                        }
                    }
                })
            })
            .collect();

        Self {
            name,
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(handles),
            pending: Arc::new(pending),
            closing: AtomicBool::new(false),
        }
    }

    /// Jobs queued, running, or waiting to be retried
    pub fn pending(&self) -> usize {
        *self.pending.borrow()
    }

    /// Queues a job, waiting while the queue is full
    pub async fn submit(&self, job: J) -> Result<(), AuditError> {
        if self.closing.load(Ordering::SeqCst) {
            return Err(AuditError::PoolClosed(self.name));
        }

        let sender = self
            .sender
            .lock()
            .map_err(|_| AuditError::LockPoisoned)?
            .clone()
            .ok_or(AuditError::PoolClosed(self.name))?;

        let slot = PendingSlot::take(&self.pending);
        sender
            .send((job, slot))
            .await
            .map_err(|_| AuditError::PoolClosed(self.name))
    }

    /// Stops accepting jobs and waits until every accepted job, retries
    /// included, has finished
    pub async fn shutdown(&self) -> Result<(), AuditError> {
        self.closing.store(true, Ordering::SeqCst);

        let outstanding = self.pending();
        if outstanding > 0 {
            tracing::info!(pool = self.name, outstanding, "Waiting for pending jobs");
        }
        let mut pending = self.pending.subscribe();
        // The pool holds the sender, so the watch channel cannot close here
        let _ = pending.wait_for(|count| *count == 0).await;

        let sender = self.sender.lock().map_err(|_| AuditError::LockPoisoned)?.take();
        drop(sender);

        let workers: Vec<JoinHandle<()>> = self
            .workers
            .lock()
            .map_err(|_| AuditError::LockPoisoned)?
            .drain(..)
            .collect();
        for worker in workers {
            worker.await?;
        }

        tracing::debug!(pool = self.name, "Worker pool stopped");
        Ok(())
    }
}
