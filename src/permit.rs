use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tracing::debug;

/// Bounds the number of concurrently in-flight queries across both the UDP
/// and TCP listeners. Holding the returned permit keeps it reserved; dropping
/// it (FSM completion) frees a slot for the next accepted query.
#[derive(Clone)]
pub struct PermitManager {
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
}

impl PermitManager {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        }
    }

    pub async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        match self.semaphore.clone().acquire_owned().await {
            Ok(permit) => Some(permit),
            Err(_) => {
                debug!("permit semaphore closed");
                None
            }
        }
    }

    pub fn try_acquire(&self) -> Option<OwnedSemaphorePermit> {
        match self.semaphore.clone().try_acquire_owned() {
            Ok(permit) => Some(permit),
            Err(TryAcquireError::NoPermits) => {
                debug!(max_concurrent = self.max_concurrent, "no permits available");
                None
            }
            Err(TryAcquireError::Closed) => {
                debug!("permit semaphore closed");
                None
            }
        }
    }
}
