// SPDX-FileCopyrightText: 2026 lxbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded FIFO with a single panic-resilient worker.
//!
//! `submit` never waits for backend I/O: it either hands the request to the
//! channel or rejects it with [`LxbotError::QueueFull`]. The worker runs each
//! backend call in its own task so that a panic inside the backend surfaces
//! as a [`BackendErrorKind::WorkerFault`](lxbot_core::BackendErrorKind)
//! failure instead of killing the worker.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use lxbot_core::{Backend, BackendError, CallResult, Endpoint, LxbotError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Extra time granted past the backend timeout before the worker gives up on
/// a call that ignores its own deadline.
const WATCHDOG_GRACE: Duration = Duration::from_secs(5);

/// Callback invoked exactly once with the outcome of an accepted request.
///
/// Runs on the worker task; it must not block on I/O.
pub type Completion = Box<dyn FnOnce(CallResult) + Send + 'static>;

/// Fixed-at-startup queue parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueSettings {
    /// Maximum number of requests waiting behind the one being executed.
    pub capacity: usize,
    /// Timeout passed to every backend call.
    pub timeout: Duration,
}

impl QueueSettings {
    pub fn new(capacity: usize, timeout: Duration) -> Self {
        Self { capacity, timeout }
    }
}

struct Job {
    endpoint: Endpoint,
    payload: serde_json::Value,
    completion: Completion,
    submitted_at: Instant,
}

/// Handle to the running dispatch queue.
pub struct DispatchQueue {
    tx: mpsc::Sender<Job>,
    capacity: usize,
    cancel: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl DispatchQueue {
    /// Spawns the worker task and returns the submission handle.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(backend: Arc<dyn Backend>, settings: QueueSettings) -> Result<Self, LxbotError> {
        if settings.capacity == 0 {
            return Err(LxbotError::Config(
                "dispatch queue capacity must be at least 1".into(),
            ));
        }

        let (tx, rx) = mpsc::channel(settings.capacity);
        let cancel = CancellationToken::new();
        let worker = tokio::spawn(run_worker(
            backend,
            rx,
            settings.timeout,
            cancel.clone(),
        ));

        info!(
            capacity = settings.capacity,
            timeout_secs = settings.timeout.as_secs(),
            "dispatch queue started"
        );

        Ok(Self {
            tx,
            capacity: settings.capacity,
            cancel,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Enqueues a request without waiting.
    ///
    /// On rejection the completion is dropped uninvoked.
    pub fn submit<F>(
        &self,
        endpoint: Endpoint,
        payload: serde_json::Value,
        completion: F,
    ) -> Result<(), LxbotError>
    where
        F: FnOnce(CallResult) + Send + 'static,
    {
        let job = Job {
            endpoint,
            payload,
            completion: Box::new(completion),
            submitted_at: Instant::now(),
        };
        match self.tx.try_send(job) {
            Ok(()) => {
                debug!(endpoint = %endpoint, pending = self.pending(), "request queued");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(capacity = self.capacity, endpoint = %endpoint, "dispatch queue full");
                Err(LxbotError::QueueFull {
                    capacity: self.capacity,
                })
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err(LxbotError::Internal("dispatch queue is shut down".into()))
            }
        }
    }

    /// Maximum number of waiting requests.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of requests waiting to be dequeued (excludes the one executing).
    pub fn pending(&self) -> usize {
        self.capacity.saturating_sub(self.tx.capacity())
    }

    /// Stops the worker and waits for it to exit.
    ///
    /// An executing call is abandoned and every request still waiting is
    /// completed with a worker-fault failure, so no completion is lost.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handle = match self.worker.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            error!(error = %e, "dispatch worker terminated abnormally");
        }
    }
}

impl Drop for DispatchQueue {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_worker(
    backend: Arc<dyn Backend>,
    mut rx: mpsc::Receiver<Job>,
    timeout: Duration,
    cancel: CancellationToken,
) {
    loop {
        let job = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            job = rx.recv() => match job {
                Some(job) => job,
                None => break,
            },
        };

        let queued_ms = job.submitted_at.elapsed().as_millis() as u64;
        let started = Instant::now();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(BackendError::worker_fault("dispatch queue shut down")),
            result = execute(&backend, job.endpoint, job.payload, timeout) => result,
        };

        match &result {
            Ok(_) => debug!(
                endpoint = %job.endpoint,
                queued_ms,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "backend call succeeded"
            ),
            Err(e) => warn!(
                endpoint = %job.endpoint,
                queued_ms,
                elapsed_ms = started.elapsed().as_millis() as u64,
                kind = %e.kind,
                error = %e,
                "backend call failed"
            ),
        }

        deliver(job.completion, result);
    }

    rx.close();
    let mut drained = 0usize;
    while let Ok(job) = rx.try_recv() {
        deliver(
            job.completion,
            Err(BackendError::worker_fault("dispatch queue shut down")),
        );
        drained += 1;
    }
    info!(drained, "dispatch worker stopped");
}

/// Runs one backend call in its own task.
///
/// A panic or a call that overruns its deadline by more than
/// [`WATCHDOG_GRACE`] becomes a failure result.
async fn execute(
    backend: &Arc<dyn Backend>,
    endpoint: Endpoint,
    payload: serde_json::Value,
    timeout: Duration,
) -> CallResult {
    let backend = Arc::clone(backend);
    let mut handle = tokio::spawn(async move { backend.call(endpoint, payload, timeout).await });

    let outcome = tokio::time::timeout(timeout + WATCHDOG_GRACE, &mut handle).await;
    match outcome {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) if join_err.is_panic() => {
            let message = panic_message(join_err.into_panic().as_ref());
            error!(endpoint = %endpoint, panic = %message, "backend call panicked");
            Err(BackendError::worker_fault(format!(
                "backend call panicked: {message}"
            )))
        }
        Ok(Err(join_err)) => Err(BackendError::worker_fault(format!(
            "backend call aborted: {join_err}"
        ))),
        Err(_) => {
            handle.abort();
            Err(BackendError::timeout(timeout))
        }
    }
}

/// Invokes a completion, containing any panic it raises.
fn deliver(completion: Completion, result: CallResult) {
    if let Err(panic) = std::panic::catch_unwind(AssertUnwindSafe(move || completion(result))) {
        error!(
            panic = %panic_message(panic.as_ref()),
            "completion callback panicked"
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
