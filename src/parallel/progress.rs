//! Completion tracking for a running batch

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::info;

use crate::processing::Outcome;

/// Thread-safe counter of emitted outcomes
///
/// Workers record each outcome before handing it to the channel, so
/// `emitted() == total` holds once every task has produced its outcome.
#[derive(Debug)]
pub struct ProgressTracker {
    total: usize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    start_time: Instant,
}

/// Snapshot of a batch's progress
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressState {
    pub total_files: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed_time: Duration,
    pub files_per_second: f64,
    pub completion_percentage: f64,
}

impl ProgressTracker {
    /// Create a tracker expecting `total` outcomes
    pub fn new(total: usize) -> Self {
        Self {
            total,
            succeeded: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            start_time: Instant::now(),
        }
    }

    /// Count one emitted outcome
    pub fn record(&self, outcome: &Outcome) {
        if outcome.is_success() {
            self.succeeded.fetch_add(1, Ordering::AcqRel);
        } else {
            self.failed.fetch_add(1, Ordering::AcqRel);
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn emitted(&self) -> usize {
        self.succeeded.load(Ordering::Acquire) + self.failed.load(Ordering::Acquire)
    }

    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.emitted())
    }

    /// Every task has emitted its outcome
    pub fn is_complete(&self) -> bool {
        self.emitted() == self.total
    }

    /// Get current progress state
    pub fn get_state(&self) -> ProgressState {
        let succeeded = self.succeeded.load(Ordering::Acquire);
        let failed = self.failed.load(Ordering::Acquire);
        let elapsed_time = self.start_time.elapsed();
        let done = succeeded + failed;

        ProgressState {
            total_files: self.total,
            succeeded,
            failed,
            elapsed_time,
            files_per_second: if elapsed_time.as_secs_f64() > 0.0 {
                done as f64 / elapsed_time.as_secs_f64()
            } else {
                0.0
            },
            completion_percentage: if self.total > 0 {
                (done as f64 / self.total as f64) * 100.0
            } else {
                100.0
            },
        }
    }

    /// Log the final tally
    pub fn complete_batch(&self) {
        info!("Batch finished: {}", self.get_state().summary_line());
    }
}

impl ProgressState {
    /// One-line tally with status and throughput
    pub fn summary_line(&self) -> String {
        format!(
            "{}: {}/{} files converted, {} failed in {:.2}s ({})",
            self.status_text(),
            self.succeeded,
            self.total_files,
            self.failed,
            self.elapsed_time.as_secs_f64(),
            self.speed_text()
        )
    }

    /// Get human-readable completion status
    pub fn status_text(&self) -> String {
        let done = self.succeeded + self.failed;
        if done >= self.total_files {
            "Completed".to_string()
        } else {
            format!("{}/{} files processed", done, self.total_files)
        }
    }

    /// Get processing speed as human-readable string
    pub fn speed_text(&self) -> String {
        if self.files_per_second >= 1.0 {
            format!("{:.1} files/sec", self.files_per_second)
        } else if self.files_per_second > 0.0 {
            format!("{:.1} sec/file", 1.0 / self.files_per_second)
        } else {
            "Unknown".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GrayBatchError;

    #[test]
    fn test_progress_tracker_basic() {
        let tracker = ProgressTracker::new(4);
        assert_eq!(tracker.remaining(), 4);
        assert!(!tracker.is_complete());

        tracker.record(&Outcome::success("a.png", "out/a.png"));
        tracker.record(&Outcome::failure("b.png", &GrayBatchError::Cancelled));

        let state = tracker.get_state();
        assert_eq!(state.succeeded, 1);
        assert_eq!(state.failed, 1);
        assert_eq!(state.completion_percentage, 50.0);
        assert_eq!(tracker.remaining(), 2);
    }

    #[test]
    fn test_completion() {
        let tracker = ProgressTracker::new(2);
        tracker.record(&Outcome::success("a.png", "out/a.png"));
        tracker.record(&Outcome::success("b.jpg", "out/b.jpg"));
        assert!(tracker.is_complete());
        assert_eq!(tracker.get_state().status_text(), "Completed");
    }

    #[test]
    fn test_empty_batch_is_complete() {
        let tracker = ProgressTracker::new(0);
        assert!(tracker.is_complete());
        assert_eq!(tracker.get_state().completion_percentage, 100.0);
    }

    #[test]
    fn test_progress_state_methods() {
        let state = ProgressState {
            total_files: 10,
            succeeded: 3,
            failed: 1,
            elapsed_time: Duration::from_secs(2),
            files_per_second: 2.5,
            completion_percentage: 40.0,
        };

        assert!(state.status_text().contains("4/10"));
        assert!(state.speed_text().contains("2.5"));

        let slow = ProgressState { files_per_second: 0.5, ..state.clone() };
        assert_eq!(slow.speed_text(), "2.0 sec/file");

        assert_eq!(
            state.summary_line(),
            "4/10 files processed: 3/10 files converted, 1 failed in 2.00s (2.5 files/sec)"
        );
    }
}
