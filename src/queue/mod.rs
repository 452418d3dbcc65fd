//! Serialized access to the store.
//!
//! Every storage operation is handed to [`RequestQueue`] as a closure. A single
//! worker thread owns the [`Gateway`] and runs the closures one at a time in the
//! order they were enqueued, so no two operations ever touch the store at the
//! same time regardless of how many tasks are producing work.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, Semaphore, TryAcquireError};
use tracing::{debug, error, warn};

use crate::data::Gateway;
use crate::error::{Result, StoreError};

pub const DEFAULT_QUEUE_CAPACITY: usize = 32;

type Job = Box<dyn FnOnce(&Gateway) + Send>;

/// Pending result of an enqueued operation.
#[must_use = "the operation result is only observed through the ticket"]
pub struct Ticket<T> {
    receiver: oneshot::Receiver<Result<T>>,
}

impl<T> Ticket<T> {
    pub async fn wait(self) -> Result<T> {
        self.receiver
            .await
            .map_err(|_| StoreError::OperationAborted)?
    }
}

pub struct RequestQueue {
    sender: mpsc::Sender<Job>,
    // One permit per admitted operation, held until it has finished running
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl RequestQueue {
    pub fn new(gateway: Gateway) -> Result<Self> {
        Self::with_capacity(gateway, DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_capacity(gateway: Gateway, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(StoreError::InvalidCapacity);
        }

        let (sender, receiver) = mpsc::channel(capacity);

        thread::Builder::new()
            .name("plug-db-queue".to_string())
            .spawn(move || drain(gateway, receiver))
            .map_err(StoreError::WorkerSpawn)?;

        Ok(RequestQueue {
            sender,
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Admitted operations that have not finished yet, the running one included.
    pub fn outstanding(&self) -> usize {
        self.capacity - self.permits.available_permits()
    }

    /// Admits an operation without waiting for it to run.
    ///
    /// Fails straight away with [`StoreError::QueueFull`] when `capacity`
    /// operations are already outstanding; it never waits for room.
    pub fn enqueue<T, F>(&self, operation: F) -> Result<Ticket<T>>
    where
        T: Send + 'static,
        F: FnOnce(&Gateway) -> Result<T> + Send + 'static,
    {
        let permit = match self.permits.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(TryAcquireError::NoPermits) => {
                warn!("Request queue is full ({} operations), rejecting", self.capacity);
                return Err(StoreError::QueueFull {
                    capacity: self.capacity,
                });
            }
            Err(TryAcquireError::Closed) => return Err(StoreError::QueueClosed),
        };

        let (respond_to, receiver) = oneshot::channel();

        let job: Job = Box::new(move |gateway: &Gateway| {
            let result = operation(gateway);
            //Free the slot before the caller hears back
            drop(permit);
            let _ = respond_to.send(result);
        });

        self.sender.try_send(job).map_err(|err| match err {
            TrySendError::Full(_) => StoreError::QueueFull {
                capacity: self.capacity,
            },
            TrySendError::Closed(_) => StoreError::QueueClosed,
        })?;

        Ok(Ticket { receiver })
    }

    pub async fn submit<T, F>(&self, operation: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Gateway) -> Result<T> + Send + 'static,
    {
        self.enqueue(operation)?.wait().await
    }
}

fn drain(gateway: Gateway, mut receiver: mpsc::Receiver<Job>) {
    debug!("Request queue worker started");

    while let Some(job) = receiver.blocking_recv() {
        if panic::catch_unwind(AssertUnwindSafe(|| job(&gateway))).is_err() {
            error!("Queued operation panicked, continuing with the next one");
        }
    }

    debug!("Request queue worker stopped");
}
