//! Concurrent batch execution with unordered outcome delivery

use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use futures::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::{BatchConfig, Concurrency};
use crate::processing::{Codec, FileProcessor, ImageCodec, Outcome, Task};

pub mod progress;
pub mod scheduler;

pub use progress::*;
pub use scheduler::*;

/// Default capacity of the outcome channel
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Runs a batch of files through a [`FileProcessor`] on a worker pool
pub struct BatchCoordinator<C = ImageCodec> {
    processor: Arc<FileProcessor<C>>,
    concurrency: Concurrency,
    channel_capacity: usize,
    cancel: CancellationToken,
}

impl BatchCoordinator<ImageCodec> {
    /// Create a coordinator with the default codec and worker count
    pub fn new() -> Self {
        Self::with_processor(FileProcessor::new())
    }

    /// Create a coordinator from batch configuration
    pub fn from_config(config: &BatchConfig) -> Self {
        Self::new()
            .concurrency(config.concurrency())
            .channel_capacity(config.channel_capacity)
    }
}

impl Default for BatchCoordinator<ImageCodec> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Codec + 'static> BatchCoordinator<C> {
    pub fn with_processor(processor: FileProcessor<C>) -> Self {
        Self {
            processor: Arc::new(processor),
            concurrency: Concurrency::default(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            cancel: CancellationToken::new(),
        }
    }

    pub fn concurrency(mut self, concurrency: Concurrency) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// Token that cancels every batch started by this coordinator
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Start converting `inputs` into `output_dir`
    ///
    /// Returns immediately; outcomes arrive on the stream in completion
    /// order. Must be called from within a tokio runtime.
    pub fn run<I, P>(&self, inputs: I, output_dir: &Path) -> OutcomeStream
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.run_tasks(Task::batch(inputs, output_dir))
    }

    /// Start a batch of prepared tasks
    pub fn run_tasks(&self, tasks: Vec<Task>) -> OutcomeStream {
        let total = tasks.len();
        let worker_count = self.concurrency.worker_count(total);
        info!("Starting batch of {} files on {} workers", total, worker_count);

        let tracker = Arc::new(ProgressTracker::new(total));
        let (outcome_tx, outcome_rx) = mpsc::channel(self.channel_capacity);

        let pool = WorkerPool::new(
            Arc::clone(&self.processor),
            Arc::clone(&tracker),
            self.cancel.clone(),
        );
        let handles = pool.spawn(worker_count, work_queue(tasks), outcome_tx);
        let supervisor = tokio::spawn(supervise(handles, Arc::clone(&tracker)));

        OutcomeStream {
            receiver: outcome_rx,
            tracker,
            supervisor: Some(supervisor),
        }
    }

    /// Run a batch and collect every outcome
    pub async fn run_to_end<I, P>(&self, inputs: I, output_dir: &Path) -> Vec<Outcome>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.run(inputs, output_dir).collect_all().await
    }
}

async fn supervise(handles: Vec<JoinHandle<WorkerStats>>, tracker: Arc<ProgressTracker>) {
    for result in futures::future::join_all(handles).await {
        if let Err(e) = result {
            error!("Worker join error: {}", e);
        }
    }
    tracker.complete_batch();
}

/// Outcomes of a running batch, closed once every task has reported
pub struct OutcomeStream {
    receiver: mpsc::Receiver<Outcome>,
    tracker: Arc<ProgressTracker>,
    supervisor: Option<JoinHandle<()>>,
}

impl OutcomeStream {
    /// Next outcome, or `None` once the batch is finished
    pub async fn next_outcome(&mut self) -> Option<Outcome> {
        self.receiver.recv().await
    }

    /// Number of tasks in the batch
    pub fn total(&self) -> usize {
        self.tracker.total()
    }

    pub fn progress(&self) -> ProgressState {
        self.tracker.get_state()
    }

    /// Every task has emitted its outcome (some may still be buffered)
    pub fn is_complete(&self) -> bool {
        self.tracker.is_complete()
    }

    /// Drain the stream and wait for the workers to wind down
    pub async fn collect_all(mut self) -> Vec<Outcome> {
        let mut outcomes = Vec::with_capacity(self.total());
        while let Some(outcome) = self.next_outcome().await {
            outcomes.push(outcome);
        }
        self.finish().await;
        outcomes
    }

    /// Refuse further outcomes and wait for the workers to exit
    ///
    /// Workers stop at their next send; tasks not yet picked up are dropped.
    pub async fn close(&mut self) {
        self.receiver.close();
        self.finish().await;
    }

    /// Wait for the worker supervisor to exit
    pub async fn finish(&mut self) {
        if let Some(supervisor) = self.supervisor.take() {
            if let Err(e) = supervisor.await {
                error!("Batch supervisor failed: {}", e);
            }
        }
    }
}

impl Stream for OutcomeStream {
    type Item = Outcome;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Outcome>> {
        self.receiver.poll_recv(cx)
    }
}
