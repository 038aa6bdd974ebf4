use std::{
    collections::HashMap,
    future::Future,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use parking_lot::Mutex;
use tokio::{
    sync::watch,
    task::{AbortHandle, JoinHandle},
};
use tracing::{info, warn};

use crate::error::AppError;

/// Terminal state of one generation job.
#[derive(Debug)]
pub enum JobOutcome<T> {
    Completed(T),
    Cancelled,
    TimedOut,
    Failed(AppError),
}

impl<T> JobOutcome<T> {
    pub fn into_result(self) -> Result<T, AppError> {
        match self {
            JobOutcome::Completed(v) => Ok(v),
            JobOutcome::Cancelled => Err(AppError::CancelledByUser),
            JobOutcome::TimedOut => Err(AppError::Upstream(crate::openai::UpstreamError::Http(
                "generation timed out".into(),
            ))),
            JobOutcome::Failed(e) => Err(e),
        }
    }
}

struct JobSlot {
    ticket: u64,
    cancel: watch::Sender<bool>,
}

/// In-flight work returned by [`JobRegistry::start`].
pub struct JobHandle<T> {
    id: String,
    ticket: u64,
    cancelled: watch::Receiver<bool>,
    task: JoinHandle<Result<T, AppError>>,
}

/// Request id -> cancellation signal for running jobs.
///
/// A second `start` for an id that is still running replaces the slot
/// without cancelling the earlier job; each job only ever removes the slot
/// carrying its own ticket.
#[derive(Default)]
pub struct JobRegistry {
    slots: Mutex<HashMap<String, JobSlot>>,
    tickets: AtomicU64,
}

impl JobRegistry {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.slots.lock().len() }

    #[cfg(test)]
    pub fn contains(&self, id: &str) -> bool { self.slots.lock().contains_key(id) }

    pub fn start<F, T>(&self, id: &str, work: F) -> JobHandle<T>
    where
        F: Future<Output = Result<T, AppError>> + Send + 'static,
        T: Send + 'static,
    {
        let (cancel, cancelled) = watch::channel(false);
        let ticket = self.tickets.fetch_add(1, Ordering::Relaxed);
        if self.slots.lock().insert(id.to_string(), JobSlot { ticket, cancel }).is_some() {
            warn!(job = id, "Replacing an in-flight job slot; the earlier job keeps running");
        }
        info!(job = id, ticket, active = self.len(), "▶️ Job started");
        let task = tokio::spawn(work);
        JobHandle { id: id.to_string(), ticket, cancelled, task }
    }

    /// Signals cancellation and drops the slot at once. `false` means there was nothing to cancel.
    pub fn cancel(&self, id: &str) -> bool {
        let Some(slot) = self.slots.lock().remove(id) else {
            info!(job = id, "No active generation to cancel");
            return false;
        };
        let _ = slot.cancel.send(true);
        info!(job = id, ticket = slot.ticket, "⏹️ Cancellation requested");
        true
    }

    /// Waits for the job to finish, be cancelled or exceed `timeout`; the slot is released in every case.
    pub async fn wait<T>(&self, handle: JobHandle<T>, timeout: Option<Duration>) -> JobOutcome<T> {
        let JobHandle { id, ticket, mut cancelled, mut task } = handle;
        // Runs on every exit, including the waiter being dropped mid-flight.
        let guard = SlotGuard { registry: self, id: &id, ticket, task: task.abort_handle() };
        let deadline = async {
            match timeout {
                Some(d) => tokio::time::sleep(d).await,
                None => std::future::pending().await,
            }
        };

        let outcome = tokio::select! {
            biased;
            joined = &mut task => match joined {
                Ok(Ok(v)) => JobOutcome::Completed(v),
                Ok(Err(AppError::CancelledByUser)) => JobOutcome::Cancelled,
                Ok(Err(e)) => JobOutcome::Failed(e),
                Err(e) if e.is_cancelled() => JobOutcome::Cancelled,
                Err(e) => JobOutcome::Failed(AppError::Internal(format!("generation task panicked: {e}"))),
            },
            _ = cancellation(&mut cancelled) => JobOutcome::Cancelled,
            _ = deadline => JobOutcome::TimedOut,
        };

        drop(guard);
        match &outcome {
            JobOutcome::Completed(_) => info!(job = %id, ticket, "✅ Job completed"),
            JobOutcome::Cancelled => info!(job = %id, ticket, "⏹️ Job cancelled"),
            JobOutcome::TimedOut => warn!(job = %id, ticket, "⏱️ Job timed out"),
            JobOutcome::Failed(e) => warn!(job = %id, ticket, "❌ Job failed: {}", e),
        }
        outcome
    }

    pub async fn run<F, T>(&self, id: &str, work: F, timeout: Option<Duration>) -> JobOutcome<T>
    where
        F: Future<Output = Result<T, AppError>> + Send + 'static,
        T: Send + 'static,
    {
        let handle = self.start(id, work);
        self.wait(handle, timeout).await
    }

    fn release(&self, id: &str, ticket: u64) {
        let mut slots = self.slots.lock();
        if slots.get(id).is_some_and(|slot| slot.ticket == ticket) {
            slots.remove(id);
        }
    }
}

/// Releases a job's slot and aborts its task when the waiter goes away.
/// Aborting an already finished task is a no-op.
struct SlotGuard<'a> {
    registry: &'a JobRegistry,
    id: &'a str,
    ticket: u64,
    task: AbortHandle,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.task.abort();
        self.registry.release(self.id, self.ticket);
    }
}

// Resolves once `true` is observed. A dropped sender means the slot was
// replaced, not cancelled, so that case never resolves.
async fn cancellation(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            if *rx.borrow() {
                return;
            }
            std::future::pending::<()>().await;
        }
    }
}
