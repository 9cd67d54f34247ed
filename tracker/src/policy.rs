use crate::{Confirm, Error, PolicyViolation, TaskQueueState, TaskRecord};

/// Default number of missed polls after which a task that reached the queue is lost.
pub const DEFAULT_RESUBMIT_AFTER: u32 = 5;
/// Default number of missed polls after which a task counts toward a stalled dataset.
pub const DEFAULT_STALL_AFTER: u32 = 6;
/// Default share of all tasks that may be resubmitted before asking the operator.
pub const DEFAULT_MAX_RESUBMIT_RATIO: f64 = 0.10;

/// Decides, per task, whether it is lost and whether we may resubmit it.
///
/// The two ceilings are independent: `resubmit_after` governs single tasks,
/// `stall_after` governs the dataset-wide failure declaration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub resubmit_after: u32,
    pub stall_after: u32,
    /// if false, lost tasks are marked failed instead of resubmitted
    pub auto_resubmit: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            resubmit_after: DEFAULT_RESUBMIT_AFTER,
            stall_after: DEFAULT_STALL_AFTER,
            auto_resubmit: true,
        }
    }
}

impl RetryPolicy {
    /// True if the task has gone missing, or died in the queue, after the scheduler
    /// had seen it. Tasks that never showed up may just be waiting for a slot.
    pub fn needs_resubmit(&self, task: &TaskRecord, queue: TaskQueueState) -> bool {
        if task.is_completed() || task.job_id().is_none() || !task.has_reached_queue() {
            return false;
        }
        match queue {
            TaskQueueState::InQueueHealthy => false,
            TaskQueueState::InQueueError => true,
            TaskQueueState::NotFound => task.not_found_streak() > self.resubmit_after,
        }
    }

    pub fn should_resubmit(&self, task: &TaskRecord, queue: TaskQueueState) -> bool {
        self.auto_resubmit && task.has_budget() && self.needs_resubmit(task, queue)
    }

    /// True if the task has been missing for longer than the stall ceiling.
    pub fn is_stalled(&self, task: &TaskRecord) -> bool {
        task.not_found_streak() > self.stall_after
    }
}

/// Run-wide circuit breaker on autonomous resubmission.
///
/// Owned by the orchestrator and lent to each dataset while it reconciles.
#[derive(Debug, Clone)]
pub struct ResubmitGuard {
    total_tasks: usize,
    resubmitted: usize,
    max_ratio: f64,
    /// set once the operator approved going over the limit
    confirmed: bool,
}

impl ResubmitGuard {
    pub fn new(total_tasks: usize, max_ratio: f64) -> Self {
        Self {
            total_tasks,
            resubmitted: 0,
            max_ratio,
            confirmed: false,
        }
    }

    pub fn resubmitted(&self) -> usize {
        self.resubmitted
    }

    pub fn total_tasks(&self) -> usize {
        self.total_tasks
    }

    pub fn ratio(&self) -> f64 {
        if self.total_tasks == 0 {
            0.0
        } else {
            self.resubmitted as f64 / self.total_tasks as f64
        }
    }

    pub fn is_tripped(&self) -> bool {
        self.ratio() > self.max_ratio
    }

    /// Check whether one more autonomous resubmission may go ahead.
    ///
    /// The operator is asked at most once: the first time the limit is exceeded.
    /// After a yes, the breaker stays open for the rest of the run.
    pub fn permit(&mut self, confirm: &dyn Confirm) -> Result<(), Error> {
        if self.confirmed || !self.is_tripped() {
            return Ok(());
        }
        let violation = PolicyViolation {
            resubmitted: self.resubmitted,
            total: self.total_tasks,
            limit_percent: self.max_ratio * 100.0,
        };
        let prompt = format!(
            "More than {:.0}% of tasks are dead ({} of {} resubmitted). Continue resubmitting?",
            violation.limit_percent, violation.resubmitted, violation.total,
        );
        if confirm.confirm(&prompt).map_err(Error::Confirm)? {
            log::warn!("Operator approved resubmitting past the limit");
            self.confirmed = true;
            Ok(())
        } else {
            Err(violation.into())
        }
    }

    pub fn record(&mut self) {
        self.resubmitted += 1;
    }
}
