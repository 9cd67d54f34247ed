use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::{JobId, OutputStatus, QueueSnapshot, TaskDescriptor, TaskQueueState};

/// Retry budget value meaning "resubmit as often as needed".
pub const UNLIMITED_RETRIES: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskState {
    Pending,
    Submitted,
    SeenInQueue,
    Completed,
    Failed,
}

/// What happened to a task during one reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// Already complete, or never submitted.
    Unchanged,
    /// Output arrived this cycle.
    Completed,
    /// Seen in the queue in a healthy state.
    InQueue,
    /// Absent from the queue; streak incremented.
    Missing,
    /// Reported by the scheduler in an error state.
    Errored,
}

/// Everything we know about one task in a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// position within the dataset
    index: u32,
    /// scheduler job, once submitted
    job_id: Option<JobId>,
    state: TaskState,
    /// job description file handed to the submission collaborator
    submit_file: PathBuf,
    /// file the task is expected to produce
    output: PathBuf,
    /// time of the latest (re)submission
    submitted_at: Option<SystemTime>,
    /// consecutive cycles this task was missing from the queue
    not_found_streak: u32,
    /// -1 = unlimited, 0 = exhausted
    retry_budget: i32,
    /// true once the current attempt has been seen by the scheduler
    has_reached_queue: bool,
}

impl TaskRecord {
    /// Create a new, not yet submitted task.
    pub fn new(index: u32, submit_file: PathBuf, output: PathBuf, retry_budget: i32) -> Self {
        Self {
            index,
            job_id: None,
            state: TaskState::Pending,
            submit_file,
            output,
            submitted_at: None,
            not_found_streak: 0,
            retry_budget,
            has_reached_queue: false,
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn job_id(&self) -> Option<JobId> {
        self.job_id
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn submit_file(&self) -> &Path {
        &self.submit_file
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn submitted_at(&self) -> Option<SystemTime> {
        self.submitted_at
    }

    pub fn not_found_streak(&self) -> u32 {
        self.not_found_streak
    }

    pub fn retry_budget(&self) -> i32 {
        self.retry_budget
    }

    pub fn has_reached_queue(&self) -> bool {
        self.has_reached_queue
    }

    pub fn is_completed(&self) -> bool {
        self.state == TaskState::Completed
    }

    pub fn is_pending(&self) -> bool {
        self.state == TaskState::Pending
    }

    /// True if another resubmission is allowed.
    pub fn has_budget(&self) -> bool {
        self.retry_budget == UNLIMITED_RETRIES || self.retry_budget > 0
    }

    /// Describe this task to the submission collaborator.
    pub fn descriptor<'a>(&'a self, dataset: &'a str) -> TaskDescriptor<'a> {
        TaskDescriptor {
            dataset,
            index: self.index,
            submit_file: &self.submit_file,
        }
    }

    /// Where this task stands in `snapshot`.
    pub fn queue_state(&self, snapshot: &QueueSnapshot) -> TaskQueueState {
        snapshot.classify(self.job_id)
    }

    /// Record a successful hand-off to the scheduler.
    pub fn mark_submitted(&mut self, job: JobId, now: SystemTime) {
        self.job_id = Some(job);
        self.state = TaskState::Submitted;
        self.submitted_at = Some(now);
        self.not_found_streak = 0;
        self.has_reached_queue = false;
    }

    /// Record an automatic resubmission, spending one retry if the budget is finite.
    pub fn mark_resubmitted(&mut self, job: JobId, now: SystemTime) {
        self.mark_submitted(job, now);
        if self.retry_budget > 0 {
            self.retry_budget -= 1;
        }
    }

    pub fn mark_failed(&mut self) {
        debug_assert!(!self.is_completed());
        self.state = TaskState::Failed;
    }

    /// Restore the retry budget, unless the task is already done.
    pub fn reset_budget(&mut self, retry_budget: i32) {
        if !self.is_completed() {
            self.retry_budget = retry_budget;
        }
    }

    /// Update this task with what the scheduler and filesystem say about it.
    ///
    /// A fresh output only counts once the job has left the queue, so a job that is
    /// still writing its file is not declared complete early.
    pub fn reconcile(&mut self, queue: TaskQueueState, output: OutputStatus) -> Reconciled {
        if self.is_completed() || self.job_id.is_none() {
            return Reconciled::Unchanged;
        }

        if output == OutputStatus::Fresh && queue != TaskQueueState::InQueueHealthy {
            self.state = TaskState::Completed;
            self.not_found_streak = 0;
            return Reconciled::Completed;
        }

        match queue {
            TaskQueueState::InQueueHealthy => {
                self.has_reached_queue = true;
                self.not_found_streak = 0;
                if self.state == TaskState::Submitted {
                    self.state = TaskState::SeenInQueue;
                }
                Reconciled::InQueue
            }
            TaskQueueState::NotFound => {
                self.not_found_streak += 1;
                Reconciled::Missing
            }
            TaskQueueState::InQueueError => {
                // the scheduler did report it, just not in a state it will recover from
                self.has_reached_queue = true;
                Reconciled::Errored
            }
        }
    }
}
