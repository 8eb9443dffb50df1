//! Bounded pool of request workers
//!
//! Each in-flight request holds one permit for its whole lifetime; a
//! streaming response keeps its permit until the stream is dropped.

use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("Worker pool closed")]
    Closed,
}

#[derive(Debug, Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    max_workers: usize,
}

impl WorkerPool {
    pub fn new(max_workers: usize) -> Self {
        let max_workers = max_workers.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_workers)),
            max_workers,
        }
    }

    /// Wait for a free worker.
    pub async fn acquire(&self) -> Result<WorkerGuard, PoolError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PoolError::Closed)?;

        Ok(WorkerGuard {
            _permit: permit,
            acquired_at: Instant::now(),
        })
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub fn close(&self) {
        self.semaphore.close();
    }
}

/// Released on drop.
#[derive(Debug)]
pub struct WorkerGuard {
    _permit: OwnedSemaphorePermit,
    acquired_at: Instant,
}

impl WorkerGuard {
    pub fn held_for(&self) -> Duration {
        self.acquired_at.elapsed()
    }
}

/// A stream that keeps a worker busy until it is exhausted or dropped.
pub struct GuardedStream<S> {
    inner: S,
    guard: Option<WorkerGuard>,
}

impl<S> GuardedStream<S> {
    pub fn new(inner: S, guard: WorkerGuard) -> Self {
        Self {
            inner,
            guard: Some(guard),
        }
    }
}

impl<S: Stream + Unpin> Stream for GuardedStream<S> {
    type Item = S::Item;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let polled = Pin::new(&mut self.inner).poll_next(cx);
        if let Poll::Ready(None) = polled {
            // hand the worker back before the transport closes
            if let Some(guard) = self.guard.take() {
                debug!(held_ms = guard.held_for().as_millis() as u64, "stream finished, worker released");
            }
        }
        polled
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
