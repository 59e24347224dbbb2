//! Fixed-size worker pool pulling tasks from a shared queue

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use crossbeam::channel::{self, Receiver};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{Result, GrayBatchError};
use crate::parallel::progress::ProgressTracker;
use crate::processing::{Codec, FileProcessor, Outcome, Task};

/// Cooperative cancellation shared by a batch and its workers
///
/// Checked before a task starts and between its processing steps. In-flight
/// blocking calls (a long decode, say) run to completion.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once [`cancel`](Self::cancel) has been called
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(GrayBatchError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Load every task into a closed multi-consumer queue
///
/// Workers drain the returned receiver; iteration ends once it is empty.
pub fn work_queue(tasks: Vec<Task>) -> Receiver<Task> {
    let (sender, receiver) = channel::unbounded();
    for task in tasks {
        // The receiver is alive in this scope, so send cannot fail
        let _ = sender.send(task);
    }
    receiver
}

/// Per-worker counters returned when a worker exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub worker_id: usize,
    pub processed: usize,
}

/// Spawns blocking workers that run tasks through a [`FileProcessor`]
pub struct WorkerPool<C> {
    processor: Arc<FileProcessor<C>>,
    tracker: Arc<ProgressTracker>,
    cancel: CancellationToken,
}

impl<C: Codec + 'static> WorkerPool<C> {
    pub fn new(
        processor: Arc<FileProcessor<C>>,
        tracker: Arc<ProgressTracker>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            processor,
            tracker,
            cancel,
        }
    }

    /// Start `worker_count` workers on the blocking thread pool
    ///
    /// Each worker holds a clone of `outcomes`; the channel closes when the
    /// last worker exits, which happens only after the queue is drained.
    pub fn spawn(
        &self,
        worker_count: usize,
        queue: Receiver<Task>,
        outcomes: mpsc::Sender<Outcome>,
    ) -> Vec<JoinHandle<WorkerStats>> {
        (0..worker_count)
            .map(|worker_id| {
                let processor = Arc::clone(&self.processor);
                let tracker = Arc::clone(&self.tracker);
                let cancel = self.cancel.clone();
                let queue = queue.clone();
                let outcomes = outcomes.clone();

                tokio::task::spawn_blocking(move || {
                    run_worker(worker_id, &processor, &queue, &outcomes, &tracker, &cancel)
                })
            })
            .collect()
    }
}

fn run_worker<C: Codec>(
    worker_id: usize,
    processor: &FileProcessor<C>,
    queue: &Receiver<Task>,
    outcomes: &mpsc::Sender<Outcome>,
    tracker: &ProgressTracker,
    cancel: &CancellationToken,
) -> WorkerStats {
    let mut stats = WorkerStats {
        worker_id,
        processed: 0,
    };

    for task in queue.iter() {
        debug!(
            "Worker {} picked task #{} ({:?}), {} outstanding",
            worker_id, task.index, task.input_path, tracker.remaining()
        );
        let outcome = run_isolated(processor, &task, cancel);

        tracker.record(&outcome);
        stats.processed += 1;

        if outcomes.blocking_send(outcome).is_err() {
            debug!("Outcome receiver dropped, worker {} stopping", worker_id);
            break;
        }
    }

    debug!("Worker {} finished after {} tasks", worker_id, stats.processed);
    stats
}

/// Run one task, turning a panic into a failure outcome
fn run_isolated<C: Codec>(
    processor: &FileProcessor<C>,
    task: &Task,
    cancel: &CancellationToken,
) -> Outcome {
    panic::catch_unwind(AssertUnwindSafe(|| processor.process_cancellable(task, cancel)))
        .unwrap_or_else(|payload| {
            let message = panic_message(payload.as_ref());
            warn!("Processing {:?} panicked: {}", task.input_path, message);
            Outcome::failure(&task.input_path, &GrayBatchError::panicked(message))
        })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use crate::error::FailureKind;

    #[test]
    fn test_cancellation_token() {
        let token = CancellationToken::new();
        let shared = token.clone();
        assert!(token.check().is_ok());

        shared.cancel();
        assert!(token.is_cancelled());
        assert!(matches!(token.check(), Err(GrayBatchError::Cancelled)));
    }

    #[test]
    fn test_work_queue_drains_then_ends() {
        let tasks = Task::batch(["a.png", "b.png", "c.png"], std::path::Path::new("out"));
        let queue = work_queue(tasks);

        let drained: Vec<PathBuf> = queue.iter().map(|t| t.input_path).collect();
        assert_eq!(drained.len(), 3);
        assert!(queue.try_recv().is_err());
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");

        let payload: Box<dyn Any + Send> = Box::new(String::from("kaboom"));
        assert_eq!(panic_message(payload.as_ref()), "kaboom");

        let payload: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }

    #[tokio::test]
    async fn test_workers_share_the_queue() {
        let tasks = Task::batch((0..7).map(|i| format!("missing-{}.png", i)), std::path::Path::new("out"));
        let tracker = Arc::new(ProgressTracker::new(tasks.len()));
        let pool = WorkerPool::new(
            Arc::new(FileProcessor::new()),
            Arc::clone(&tracker),
            CancellationToken::new(),
        );

        let (tx, mut rx) = mpsc::channel(16);
        let handles = pool.spawn(3, work_queue(tasks), tx);

        let mut received = 0;
        while let Some(outcome) = rx.recv().await {
            assert_eq!(outcome.kind, Some(FailureKind::Open));
            received += 1;
        }

        let stats = futures::future::join_all(handles).await;
        let processed: usize = stats.into_iter().map(|s| s.unwrap().processed).sum();
        assert_eq!(received, 7);
        assert_eq!(processed, 7);
        assert!(tracker.is_complete());
    }
}
