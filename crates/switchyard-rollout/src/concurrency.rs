//! ConcurrencyCoordinator: the two serialization domains of a project run.
//!
//! - Container pipeline: how many containers deploy at once. Width 1 until
//!   the record read-modify-write cycle is safe under concurrent mutation.
//! - Load balancer: list-then-create calls on listeners, target groups and
//!   routing rules, always width 1.

use tokio::sync::{AcquireError, Mutex, MutexGuard, Semaphore, SemaphorePermit};

pub const DEFAULT_CONTAINER_CONCURRENCY: usize = 1;

#[derive(Debug)]
pub struct ConcurrencyCoordinator {
    pipeline: Semaphore,
    load_balancer: Mutex<()>,
}

impl Default for ConcurrencyCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_CONTAINER_CONCURRENCY)
    }
}

impl ConcurrencyCoordinator {
    pub fn new(container_concurrency: usize) -> Self {
        Self {
            pipeline: Semaphore::new(container_concurrency.max(1)),
            load_balancer: Mutex::new(()),
        }
    }

    /// Wait for a free slot in the container pipeline.
    pub async fn container_slot(&self) -> Result<SemaphorePermit<'_>, AcquireError> {
        self.pipeline.acquire().await
    }

    /// Exclusive access to load-balancer mutations.
    pub async fn load_balancer(&self) -> MutexGuard<'_, ()> {
        self.load_balancer.lock().await
    }
}
