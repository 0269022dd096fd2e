//! Hub lifecycle: background workers and shutdown signalling.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Tracks the hub's background workers and the token every connection task
/// derives from.
#[derive(Debug)]
pub struct Lifecycle {
    token: CancellationToken,
    closed: AtomicBool,
    workers: Mutex<Vec<JoinHandle<()>>>,
    active: Arc<AtomicUsize>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            closed: AtomicBool::new(false),
            workers: Mutex::new(Vec::new()),
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Get a clone of the shutdown token.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// A token cancelled with the hub or on its own.
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// Spawn a tracked background worker.
    pub fn spawn_worker<F>(&self, name: &'static str, worker: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.active.fetch_add(1, Ordering::AcqRel);
        let guard = WorkerGuard {
            name,
            active: Arc::clone(&self.active),
        };
        let handle = tokio::spawn(async move {
            let _guard = guard;
            worker.await;
        });
        self.workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handle);
    }

    /// Mark the hub closed. Returns `true` only for the first caller.
    pub fn begin_shutdown(&self) -> bool {
        !self.closed.swap(true, Ordering::SeqCst)
    }

    /// Whether shutdown has begun.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Signal every worker and connection task to stop.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Wait for every spawned worker to finish.
    pub async fn join_workers(&self) {
        let handles = std::mem::take(
            &mut *self
                .workers
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        tracing::debug!("Waiting for {} worker(s) to stop", handles.len());

        for result in futures::future::join_all(handles).await {
            if let Err(e) = result {
                tracing::error!("Hub worker failed: {}", e);
            }
        }
    }

    /// Number of workers still running.
    pub fn active_workers(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Lifecycle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

struct WorkerGuard {
    name: &'static str,
    active: Arc<AtomicUsize>,
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::AcqRel);
        tracing::debug!("Hub worker '{}' stopped", self.name);
    }
}
