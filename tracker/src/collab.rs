//! Interfaces to everything outside the tracker: the scheduler, the filesystem,
//! the merge tool and the operator.

use std::path::Path;
use std::time::SystemTime;

use anyhow::Result;

use crate::{JobId, ProbeError, QueueSnapshot, SubmissionError};

/// Queries the scheduler for the state of every job it knows about.
pub trait QueueProbe {
    fn poll(&mut self) -> Result<QueueSnapshot, ProbeError>;
}

/// What the submission collaborator needs to know about a task.
#[derive(Debug, Clone, Copy)]
pub struct TaskDescriptor<'a> {
    pub dataset: &'a str,
    pub index: u32,
    pub submit_file: &'a Path,
}

/// Hands tasks to the scheduler.
pub trait Submitter {
    fn submit(&mut self, task: &TaskDescriptor) -> Result<JobId, SubmissionError>;

    fn resubmit(&mut self, task: &TaskDescriptor) -> Result<JobId, SubmissionError> {
        self.submit(task)
    }

    /// Take a job out of the queue.
    fn remove(&mut self, job: JobId) -> Result<(), SubmissionError>;
}

/// Result of looking for a task's output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStatus {
    Missing,
    /// Exists, but predates the latest submission.
    Stale,
    /// Exists and was written after the latest submission.
    Fresh,
}

pub trait OutputCheck {
    fn check(&self, path: &Path, since: SystemTime) -> OutputStatus;
}

/// Asks the operator a yes/no question.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> Result<bool>;
}

/// Answers every question the same way, without asking anyone.
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl Confirm for AutoConfirm {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        log::info!("{prompt} (answering {})", if self.0 { "yes" } else { "no" });
        Ok(self.0)
    }
}

/// A complete dataset, ready to be merged.
#[derive(Debug)]
pub struct AggregationRequest<'a> {
    pub dataset: &'a str,
    pub task_count: usize,
    pub outputs: Vec<&'a Path>,
    pub target: Option<&'a Path>,
}

/// Merges the outputs of a complete dataset.
pub trait Aggregator {
    /// True if the merged result for `target` already exists.
    fn is_merged(&self, target: &Path) -> bool;

    /// Start aggregating. Implementations may return before the work is done.
    fn aggregate(&mut self, request: &AggregationRequest) -> Result<()>;

    /// Block until every aggregation started so far has finished.
    fn wait(&mut self) -> Result<()> {
        Ok(())
    }
}
