//! Bounded worker pool
//!
//! A semaphore caps how many spawned tasks run at once. Each task holds its
//! permit until it finishes.

use dbfixture_core::errors::{ProvisionError, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

pub const DEFAULT_CAPACITY: usize = 5;

#[derive(Debug, Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl WorkerPool {
    /// A pool running at most `capacity` tasks at once (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits not currently held by a running task
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Spawn `task` once a permit is free
    pub async fn spawn<F, T>(&self, task: F) -> Result<PoolTask<T>>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| ProvisionError::WorkerPool {
                reason: format!("Semaphore closed: {e}"),
            })?;

        let handle = tokio::spawn(async move {
            let _permit = permit;
            task.await
        });
        Ok(PoolTask { handle })
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Handle to a task spawned on a [`WorkerPool`]
#[derive(Debug)]
pub struct PoolTask<T> {
    handle: JoinHandle<T>,
}

impl<T> PoolTask<T> {
    /// Wait for the task; a panic or cancellation becomes `WorkerPool`
    pub async fn join(self) -> Result<T> {
        self.handle.await.map_err(|e| ProvisionError::WorkerPool {
            reason: format!("Task failed to complete: {e}"),
        })
    }
}
