//! State tracking for tasks submitted to a batch scheduler.
//!
//! Nothing in this crate talks to the scheduler or the filesystem directly;
//! everything external goes through the traits in [`collab`](crate::Submitter).

mod id;
pub use id::{JobId, ParseJobIdError};

/// Scheduler snapshots
mod queue;
pub use queue::{QueueSnapshot, QueueState, TaskQueueState};

/// Per-task state and transitions
mod task;
pub use task::{Reconciled, TaskRecord, TaskState, UNLIMITED_RETRIES};

/// Resubmission decisions and the run-wide circuit breaker
mod policy;
pub use policy::{
    ResubmitGuard, RetryPolicy, DEFAULT_MAX_RESUBMIT_RATIO, DEFAULT_RESUBMIT_AFTER,
    DEFAULT_STALL_AFTER,
};

/// Per-dataset aggregation of task state
mod dataset;
pub use dataset::{Cycle, DatasetStatus, DatasetTracker, Events};

mod report;
pub use report::{DatasetProgress, ProgressReport};

/// Interfaces to external collaborators
mod collab;
pub use collab::{
    AggregationRequest, Aggregator, AutoConfirm, Confirm, OutputCheck, OutputStatus, QueueProbe,
    Submitter, TaskDescriptor,
};

mod error;
pub use error::{Error, PolicyViolation, ProbeError, SubmissionError};
