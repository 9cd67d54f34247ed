use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::{
    AggregationRequest, Confirm, Error, OutputCheck, OutputStatus, QueueSnapshot, Reconciled,
    ResubmitGuard, RetryPolicy, Submitter, TaskQueueState, TaskRecord, TaskState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatasetStatus {
    Working,
    AllTransferred,
    Merging,
    AlreadyMerged,
    Failed,
}

impl DatasetStatus {
    /// True once nothing more will happen to this dataset without operator action.
    pub fn is_finished(self) -> bool {
        !matches!(self, Self::Working)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Working => "Working",
            Self::AllTransferred => "Transferred",
            Self::Merging => "Merging",
            Self::AlreadyMerged => "Already Merged",
            Self::Failed => "Failed",
        }
    }
}

/// Messages produced while reconciling, for the caller to show to the user.
#[derive(Debug, Default)]
pub struct Events {
    lines: Vec<String>,
    resubmitted: usize,
}

impl Events {
    pub fn push(&mut self, line: String) {
        self.lines.push(line);
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Number of automatic resubmissions.
    pub fn resubmitted(&self) -> usize {
        self.resubmitted
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn append(&mut self, other: Events) {
        self.lines.extend(other.lines);
        self.resubmitted += other.resubmitted;
    }
}

/// Everything one dataset's reconciliation borrows from the orchestrator.
pub struct Cycle<'a> {
    pub snapshot: &'a QueueSnapshot,
    pub outputs: &'a dyn OutputCheck,
    pub submitter: &'a mut dyn Submitter,
    pub confirm: &'a dyn Confirm,
    pub guard: &'a mut ResubmitGuard,
    pub policy: RetryPolicy,
    pub now: SystemTime,
}

/// Tracks every task of one dataset and the status of the dataset as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetTracker {
    name: String,
    expected_tasks: usize,
    tasks: Vec<TaskRecord>,
    status: DatasetStatus,
    /// where the merged result goes, if known
    aggregate_to: Option<PathBuf>,
    /// time of the first submission in this dataset
    started_at: Option<SystemTime>,
    aggregation_triggered: bool,
}

impl DatasetTracker {
    pub fn new(name: String, aggregate_to: Option<PathBuf>, tasks: Vec<TaskRecord>) -> Self {
        Self {
            name,
            expected_tasks: tasks.len(),
            tasks,
            status: DatasetStatus::Working,
            aggregate_to,
            started_at: None,
            aggregation_triggered: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn expected_tasks(&self) -> usize {
        self.expected_tasks
    }

    pub fn tasks(&self) -> &[TaskRecord] {
        &self.tasks
    }

    pub fn status(&self) -> DatasetStatus {
        self.status
    }

    pub fn aggregate_to(&self) -> Option<&Path> {
        self.aggregate_to.as_deref()
    }

    pub fn started_at(&self) -> Option<SystemTime> {
        self.started_at
    }

    pub fn aggregation_triggered(&self) -> bool {
        self.aggregation_triggered
    }

    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.is_completed()).count()
    }

    pub fn missing(&self) -> impl Iterator<Item = &TaskRecord> {
        self.tasks.iter().filter(|t| !t.is_completed())
    }

    /// Check internal consistency, e.g. after loading from disk.
    pub fn is_consistent(&self) -> bool {
        self.expected_tasks == self.tasks.len()
            && (self.status != DatasetStatus::AllTransferred
                || self.completed_count() == self.expected_tasks)
    }

    pub fn reset_budgets(&mut self, retry_budget: i32) {
        for task in &mut self.tasks {
            task.reset_budget(retry_budget);
        }
    }
}

// SUBMISSION ///////////////
impl DatasetTracker {
    /// Hand every pending task to the scheduler. Tasks that fail to submit stay
    /// pending, so calling this again next cycle retries them.
    pub fn submit_pending(&mut self, submitter: &mut dyn Submitter, now: SystemTime) -> Events {
        let mut events = Events::default();
        for task in self.tasks.iter_mut().filter(|t| t.is_pending()) {
            match submitter.submit(&task.descriptor(&self.name)) {
                Ok(job) => {
                    log::debug!("submitted {} task {} as {job}", self.name, task.index());
                    task.mark_submitted(job, now);
                    self.started_at.get_or_insert(now);
                }
                Err(e) => {
                    log::warn!("{e}");
                    events.push(format!(
                        "Submission of {} task {} failed; will retry",
                        self.name,
                        task.index()
                    ));
                }
            }
        }
        events
    }

    /// Operator-requested resubmission of every missing task that is not healthy in
    /// the queue. Ignores the streak ceiling, the retry budget and the circuit breaker.
    /// With no snapshot, every missing task is resubmitted.
    pub fn resubmit_missing(
        &mut self,
        snapshot: Option<&QueueSnapshot>,
        submitter: &mut dyn Submitter,
        now: SystemTime,
    ) -> Events {
        let mut events = Events::default();
        let mut any = false;
        for task in self.tasks.iter_mut().filter(|t| !t.is_completed()) {
            let queue = snapshot.map(|s| task.queue_state(s));
            if queue == Some(TaskQueueState::InQueueHealthy) {
                continue;
            }
            if queue == Some(TaskQueueState::InQueueError) {
                remove_quietly(submitter, task);
            }
            let res = if task.is_pending() {
                submitter.submit(&task.descriptor(&self.name))
            } else {
                submitter.resubmit(&task.descriptor(&self.name))
            };
            match res {
                Ok(job) => {
                    task.mark_submitted(job, now);
                    any = true;
                    events.push(format!(
                        "Resubmitted {} task {} as {job}",
                        self.name,
                        task.index()
                    ));
                }
                Err(e) => {
                    log::warn!("{e}");
                    events.push(format!(
                        "Resubmission of {} task {} failed",
                        self.name,
                        task.index()
                    ));
                }
            }
        }
        if any && self.status == DatasetStatus::Failed {
            self.status = DatasetStatus::Working;
        }
        events
    }
}

// RECONCILIATION ///////////
impl DatasetTracker {
    /// Bring every task up to date with `cycle.snapshot` and the filesystem,
    /// resubmit lost tasks, and update the dataset status.
    ///
    /// Only fails if the circuit breaker trips and the operator does not approve.
    pub fn reconcile_all(&mut self, cycle: &mut Cycle) -> Result<Events, Error> {
        let mut events = Events::default();
        let mut running = false;
        // every incomplete task is past the stall ceiling, or failed and stuck in the queue:
        let mut stalled = true;

        for task in self.tasks.iter_mut() {
            let queue = task.queue_state(cycle.snapshot);
            let output = match task.submitted_at() {
                Some(since) if !task.is_completed() => cycle.outputs.check(task.output(), since),
                _ => OutputStatus::Missing,
            };

            match task.reconcile(queue, output) {
                Reconciled::Completed => {
                    log::info!("{} task {} completed", self.name, task.index())
                }
                Reconciled::InQueue => running = true,
                Reconciled::Errored => log::info!(
                    "{} task {} is in an error state in the queue",
                    self.name,
                    task.index()
                ),
                Reconciled::Missing | Reconciled::Unchanged => (),
            }

            // a failed dataset gets no more automatic retries:
            if self.status != DatasetStatus::Failed {
                if cycle.policy.should_resubmit(task, queue) {
                    cycle.guard.permit(cycle.confirm)?;
                    if queue == TaskQueueState::InQueueError {
                        remove_quietly(&mut *cycle.submitter, task);
                    }
                    match cycle.submitter.resubmit(&task.descriptor(&self.name)) {
                        Ok(job) => {
                            task.mark_resubmitted(job, cycle.now);
                            cycle.guard.record();
                            events.resubmitted += 1;
                            events.push(format!(
                                "AutoResubmitted {} task {} as {job}",
                                self.name,
                                task.index()
                            ));
                        }
                        Err(e) => {
                            log::warn!("{e}");
                            events.push(format!(
                                "AutoResubmission of {} task {} failed; will retry",
                                self.name,
                                task.index()
                            ));
                        }
                    }
                } else if task.state() != TaskState::Failed
                    && cycle.policy.needs_resubmit(task, queue)
                {
                    give_up_on(&self.name, task, queue, &mut *cycle.submitter, &mut events);
                }
            }

            if !task.is_completed() {
                let stuck = task.state() == TaskState::Failed
                    && queue == TaskQueueState::InQueueError;
                stalled &= task.has_reached_queue() && (stuck || cycle.policy.is_stalled(task));
            }
        }

        self.update_status(running, stalled, &mut events);
        Ok(events)
    }

    fn update_status(&mut self, running: bool, stalled: bool, events: &mut Events) {
        let completed = self.completed_count();
        if completed == self.expected_tasks {
            if matches!(self.status, DatasetStatus::Working | DatasetStatus::Failed) {
                self.status = DatasetStatus::AllTransferred;
            }
        } else if self.status == DatasetStatus::Working && !running && stalled {
            self.status = DatasetStatus::Failed;
            let e = Error::Stalled(self.name.clone(), self.expected_tasks - completed);
            log::error!("{e}");
            events.push(e.to_string());
        }
    }
}

// AGGREGATION //////////////
impl DatasetTracker {
    /// All outputs are in, and no one has started merging them yet.
    pub fn ready_to_aggregate(&self) -> bool {
        self.completed_count() == self.expected_tasks
            && self.status != DatasetStatus::Failed
            && !self.aggregation_triggered
    }

    /// Allow aggregation to run again, even if it already ran.
    pub fn request_reaggregation(&mut self) {
        self.aggregation_triggered = false;
    }

    pub fn aggregation_request(&self) -> AggregationRequest<'_> {
        AggregationRequest {
            dataset: &self.name,
            task_count: self.expected_tasks,
            outputs: self.tasks.iter().map(|t| t.output()).collect(),
            target: self.aggregate_to.as_deref(),
        }
    }

    pub fn mark_merging(&mut self) {
        self.aggregation_triggered = true;
        self.status = DatasetStatus::Merging;
    }

    pub fn mark_already_merged(&mut self) {
        self.aggregation_triggered = true;
        self.status = DatasetStatus::AlreadyMerged;
    }
}

/// The task needs resubmitting but may not be. A job stuck in an error state is taken
/// out of the queue either way, so its absence counts toward the streak.
///
/// The task fails when its budget is spent, or when it has been missing past the
/// resubmit ceiling. With budget left and automatic resubmission off, an errored
/// task is only removed, and fails later once the streak runs out.
fn give_up_on(
    dataset: &str,
    task: &mut TaskRecord,
    queue: TaskQueueState,
    submitter: &mut dyn Submitter,
    events: &mut Events,
) {
    if queue == TaskQueueState::InQueueError {
        remove_quietly(submitter, task);
        if task.has_budget() {
            events.push(format!(
                "{dataset} task {} removed from the queue in an error state",
                task.index()
            ));
            return;
        }
    }
    task.mark_failed();
    events.push(format!(
        "{dataset} task {} failed (retries left: {})",
        task.index(),
        task.retry_budget()
    ));
}

fn remove_quietly(submitter: &mut dyn Submitter, task: &TaskRecord) {
    if let Some(job) = task.job_id() {
        if let Err(e) = submitter.remove(job) {
            log::warn!("unable to remove job {job} from queue: {e}");
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{AutoConfirm, JobId, QueueState, SubmissionError, TaskDescriptor};
    use std::collections::HashSet;
    use std::time::Duration;

    /// Hands out job ids from consecutive clusters and remembers what it was asked to do.
    #[derive(Default)]
    struct FakeSubmitter {
        next_cluster: u64,
        submitted: Vec<u32>,
        removed: Vec<JobId>,
        fail: bool,
    }

    impl Submitter for FakeSubmitter {
        fn submit(&mut self, task: &TaskDescriptor) -> Result<JobId, SubmissionError> {
            if self.fail {
                return Err(SubmissionError::Failed("fake".into(), "nope".into()));
            }
            self.next_cluster += 1;
            self.submitted.push(task.index);
            Ok(JobId::new(self.next_cluster, 0))
        }

        fn remove(&mut self, job: JobId) -> Result<(), SubmissionError> {
            self.removed.push(job);
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeOutputs {
        fresh: HashSet<PathBuf>,
    }

    impl OutputCheck for FakeOutputs {
        fn check(&self, path: &Path, _since: SystemTime) -> OutputStatus {
            if self.fresh.contains(path) {
                OutputStatus::Fresh
            } else {
                OutputStatus::Missing
            }
        }
    }

    struct Harness {
        dataset: DatasetTracker,
        submitter: FakeSubmitter,
        outputs: FakeOutputs,
        guard: ResubmitGuard,
        policy: RetryPolicy,
        confirm: AutoConfirm,
    }

    impl Harness {
        fn new(n: u32, budget: i32) -> Self {
            let tasks = (0..n)
                .map(|i| {
                    let submit = PathBuf::from(format!("ds_{}.submit", i + 1));
                    let output = PathBuf::from(format!("out/ds_{i}.root"));
                    TaskRecord::new(i, submit, output, budget)
                })
                .collect();
            let mut h = Self {
                dataset: DatasetTracker::new("ds".into(), None, tasks),
                submitter: FakeSubmitter::default(),
                outputs: FakeOutputs::default(),
                guard: ResubmitGuard::new(n as usize, 0.10),
                policy: RetryPolicy::default(),
                confirm: AutoConfirm(true),
            };
            let events = h.dataset.submit_pending(&mut h.submitter, SystemTime::UNIX_EPOCH);
            assert!(events.is_empty());
            h
        }

        fn reconcile(&mut self, snapshot: &QueueSnapshot) -> Result<Events, Error> {
            let mut cycle = Cycle {
                snapshot,
                outputs: &self.outputs,
                submitter: &mut self.submitter,
                confirm: &self.confirm,
                guard: &mut self.guard,
                policy: self.policy,
                now: SystemTime::UNIX_EPOCH + Duration::from_secs(10),
            };
            self.dataset.reconcile_all(&mut cycle)
        }

        fn all_in_queue(&self, state: QueueState) -> QueueSnapshot {
            self.dataset
                .tasks()
                .iter()
                .filter_map(|t| t.job_id())
                .map(|job| (job, state))
                .collect()
        }

        fn snapshot_of(&self, states: &[(usize, QueueState)]) -> QueueSnapshot {
            states
                .iter()
                .filter_map(|(i, state)| Some((self.dataset.tasks()[*i].job_id()?, *state)))
                .collect()
        }

        fn complete(&mut self, index: usize) {
            let path = self.dataset.tasks()[index].output().to_path_buf();
            self.outputs.fresh.insert(path);
        }

        fn states(&self) -> Vec<TaskState> {
            self.dataset.tasks().iter().map(|t| t.state()).collect()
        }
    }

    #[test]
    fn test_all_transferred() -> Result<(), Error> {
        let mut h = Harness::new(10, 3);
        assert_eq!(h.submitter.submitted.len(), 10);

        let snapshot = h.all_in_queue(QueueState::Running);
        h.reconcile(&snapshot)?;
        assert!(h.states().iter().all(|s| *s == TaskState::SeenInQueue));
        assert_eq!(h.dataset.status(), DatasetStatus::Working);
        assert!(!h.dataset.ready_to_aggregate());

        for i in 0..10 {
            h.complete(i);
        }
        h.reconcile(&QueueSnapshot::default())?;
        assert_eq!(h.dataset.completed_count(), 10);
        assert_eq!(h.dataset.status(), DatasetStatus::AllTransferred);
        assert!(h.dataset.ready_to_aggregate());

        h.dataset.mark_merging();
        h.reconcile(&QueueSnapshot::default())?;
        assert!(!h.dataset.ready_to_aggregate());
        assert_eq!(h.dataset.status(), DatasetStatus::Merging);

        h.dataset.request_reaggregation();
        assert!(h.dataset.ready_to_aggregate());
        Ok(())
    }

    #[test]
    fn test_lost_task_is_resubmitted() -> Result<(), Error> {
        let mut h = Harness::new(1, 3);
        let first_job = h.dataset.tasks()[0].job_id();
        let snapshot = h.all_in_queue(QueueState::Running);
        h.reconcile(&snapshot)?;

        let empty = QueueSnapshot::default();
        for _ in 0..5 {
            let events = h.reconcile(&empty)?;
            assert_eq!(events.resubmitted(), 0);
        }
        let events = h.reconcile(&empty)?;
        assert_eq!(events.resubmitted(), 1);

        let task = &h.dataset.tasks()[0];
        assert_eq!(task.retry_budget(), 2);
        assert_eq!(task.not_found_streak(), 0);
        assert_eq!(task.state(), TaskState::Submitted);
        assert!(!task.has_reached_queue());
        assert_ne!(task.job_id(), first_job);
        assert_eq!(h.guard.resubmitted(), 1);
        Ok(())
    }

    #[test]
    fn test_error_state_resubmits_immediately() -> Result<(), Error> {
        let mut h = Harness::new(2, 3);
        let bad_job = h.dataset.tasks()[1].job_id().unwrap();
        let snapshot: QueueSnapshot = [
            (h.dataset.tasks()[0].job_id().unwrap(), QueueState::Running),
            (bad_job, QueueState::Unknown),
        ]
        .into_iter()
        .collect();

        let events = h.reconcile(&snapshot)?;
        assert_eq!(events.resubmitted(), 1);
        assert_eq!(h.submitter.removed, vec![bad_job]);
        let task = &h.dataset.tasks()[1];
        assert_ne!(task.job_id(), Some(bad_job));
        assert_eq!(task.retry_budget(), 2);
        Ok(())
    }

    #[test]
    fn test_never_seen_is_never_resubmitted() -> Result<(), Error> {
        let mut h = Harness::new(3, -1);
        let empty = QueueSnapshot::default();
        for _ in 0..20 {
            let events = h.reconcile(&empty)?;
            assert_eq!(events.resubmitted(), 0);
        }
        assert_eq!(h.submitter.submitted.len(), 3);
        assert_eq!(h.dataset.status(), DatasetStatus::Working);
        assert!(h.dataset.tasks().iter().all(|t| t.not_found_streak() == 20));
        Ok(())
    }

    #[test]
    fn test_reconcile_is_idempotent() -> Result<(), Error> {
        let mut h = Harness::new(4, 3);
        h.complete(0);
        let snapshot = h.snapshot_of(&[
            (1, QueueState::Idle),
            (2, QueueState::Running),
            (3, QueueState::Unknown),
        ]);

        let first = h.reconcile(&snapshot)?;
        assert_eq!(first.resubmitted(), 1);
        let states = h.states();
        let status = h.dataset.status();

        let second = h.reconcile(&snapshot)?;
        assert_eq!(second.resubmitted(), 0);
        assert_eq!(h.states(), states);
        assert_eq!(h.dataset.status(), status);
        assert_eq!(h.submitter.submitted.len(), 5);
        Ok(())
    }

    #[test]
    fn test_breaker_requires_confirmation() -> Result<(), Error> {
        let mut h = Harness::new(10, 3);
        h.confirm = AutoConfirm(false);
        let snapshot = h.all_in_queue(QueueState::Running);
        h.reconcile(&snapshot)?;

        // two tasks die in the queue and are resubmitted: 20% of the run.
        let mut dying: Vec<(usize, QueueState)> =
            (2..10).map(|i| (i, QueueState::Running)).collect();
        dying.push((0, QueueState::Unknown));
        dying.push((1, QueueState::Unknown));
        let snapshot = h.snapshot_of(&dying);
        let events = h.reconcile(&snapshot)?;
        assert_eq!(events.resubmitted(), 2);
        assert!(h.guard.is_tripped());

        // a third death now needs a yes, and we answer no:
        let job = h.dataset.tasks()[5].job_id();
        let snapshot = h.snapshot_of(&[(5, QueueState::Unknown)]);
        let res = h.reconcile(&snapshot);
        assert!(matches!(res, Err(Error::Policy(_))));
        assert_eq!(h.guard.resubmitted(), 2);
        assert_eq!(h.dataset.tasks()[5].job_id(), job);
        Ok(())
    }

    #[test]
    fn test_stalled_dataset_fails() -> Result<(), Error> {
        let mut h = Harness::new(3, 0);
        let snapshot = h.all_in_queue(QueueState::Running);
        h.reconcile(&snapshot)?;

        let empty = QueueSnapshot::default();
        for _ in 0..6 {
            h.reconcile(&empty)?;
        }
        // budget 0: past the resubmit ceiling, each task is failed rather than resubmitted.
        assert!(h.states().iter().all(|s| *s == TaskState::Failed));
        assert_eq!(h.dataset.status(), DatasetStatus::Working);

        let events = h.reconcile(&empty)?;
        assert_eq!(h.dataset.status(), DatasetStatus::Failed);
        assert!(events.lines().iter().any(|l| l.contains("stalled")));
        assert!(!h.dataset.ready_to_aggregate());

        // even with budget restored, a failed dataset is not retried automatically:
        h.dataset.reset_budgets(3);
        for _ in 0..3 {
            let events = h.reconcile(&empty)?;
            assert_eq!(events.resubmitted(), 0);
        }
        assert_eq!(h.submitter.submitted.len(), 3);
        assert_eq!(h.dataset.status(), DatasetStatus::Failed);
        Ok(())
    }

    #[test]
    fn test_running_task_prevents_stall() -> Result<(), Error> {
        let mut h = Harness::new(2, 0);
        let snapshot = h.all_in_queue(QueueState::Running);
        h.reconcile(&snapshot)?;
        let alive = h.dataset.tasks()[0].job_id().unwrap();
        let snapshot: QueueSnapshot = [(alive, QueueState::Running)].into_iter().collect();
        for _ in 0..10 {
            h.reconcile(&snapshot)?;
        }
        assert_eq!(h.states(), vec![TaskState::SeenInQueue, TaskState::Failed]);
        assert_eq!(h.dataset.status(), DatasetStatus::Working);
        Ok(())
    }

    #[test]
    fn test_held_job_without_budget_fails_dataset() -> Result<(), Error> {
        let mut h = Harness::new(1, 0);
        let job = h.dataset.tasks()[0].job_id().unwrap();
        let snapshot = h.all_in_queue(QueueState::Running);
        h.reconcile(&snapshot)?;

        // the job sits in the queue held, and stays there even after removal:
        let held = h.snapshot_of(&[(0, QueueState::Unknown)]);
        h.reconcile(&held)?;
        assert_eq!(h.states(), vec![TaskState::Failed]);
        assert_eq!(h.submitter.removed, vec![job]);
        assert_eq!(h.dataset.status(), DatasetStatus::Failed);

        for _ in 0..3 {
            h.reconcile(&held)?;
        }
        assert_eq!(h.submitter.removed, vec![job]);
        assert_eq!(h.submitter.submitted.len(), 1);
        assert!(h.dataset.status().is_finished());
        Ok(())
    }

    #[test]
    fn test_removed_held_job_fails_dataset() -> Result<(), Error> {
        let mut h = Harness::new(2, 0);
        let snapshot = h.all_in_queue(QueueState::Running);
        h.reconcile(&snapshot)?;

        // task 1 keeps running while task 0 is held, then leaves the queue:
        let held = h.snapshot_of(&[(0, QueueState::Unknown), (1, QueueState::Running)]);
        h.reconcile(&held)?;
        assert_eq!(h.states(), vec![TaskState::Failed, TaskState::SeenInQueue]);
        assert_eq!(h.dataset.status(), DatasetStatus::Working);

        let empty = QueueSnapshot::default();
        for _ in 0..6 {
            h.reconcile(&empty)?;
        }
        assert_eq!(h.dataset.status(), DatasetStatus::Working);
        h.reconcile(&empty)?;
        assert_eq!(h.dataset.status(), DatasetStatus::Failed);
        Ok(())
    }

    #[test]
    fn test_held_job_without_auto_resubmit() -> Result<(), Error> {
        let mut h = Harness::new(1, 3);
        h.policy.auto_resubmit = false;
        let job = h.dataset.tasks()[0].job_id().unwrap();
        let snapshot = h.all_in_queue(QueueState::Running);
        h.reconcile(&snapshot)?;

        // budget left: the job is taken out of the queue, but the task is not failed yet
        let held = h.snapshot_of(&[(0, QueueState::Unknown)]);
        let events = h.reconcile(&held)?;
        assert_eq!(events.resubmitted(), 0);
        assert_eq!(h.submitter.removed, vec![job]);
        assert_eq!(h.states(), vec![TaskState::SeenInQueue]);

        let empty = QueueSnapshot::default();
        for _ in 0..5 {
            h.reconcile(&empty)?;
        }
        assert_eq!(h.states(), vec![TaskState::SeenInQueue]);
        h.reconcile(&empty)?;
        let task = &h.dataset.tasks()[0];
        assert_eq!(task.state(), TaskState::Failed);
        assert_eq!(task.retry_budget(), 3);
        assert!(task.not_found_streak() > h.policy.resubmit_after);
        assert_eq!(h.submitter.submitted.len(), 1);
        Ok(())
    }

    #[test]
    fn test_failed_submission_stays_pending() {
        let tasks = vec![TaskRecord::new(0, "a".into(), "b".into(), 1)];
        let mut dataset = DatasetTracker::new("ds".into(), None, tasks);
        let mut submitter = FakeSubmitter {
            fail: true,
            ..FakeSubmitter::default()
        };
        let events = dataset.submit_pending(&mut submitter, SystemTime::UNIX_EPOCH);
        assert_eq!(events.lines().len(), 1);
        assert!(dataset.tasks()[0].is_pending());
        assert_eq!(dataset.started_at(), None);

        submitter.fail = false;
        let events = dataset.submit_pending(&mut submitter, SystemTime::UNIX_EPOCH);
        assert!(events.is_empty());
        assert_eq!(dataset.tasks()[0].state(), TaskState::Submitted);
        assert_eq!(dataset.started_at(), Some(SystemTime::UNIX_EPOCH));
    }

    #[test]
    fn test_operator_resubmit() {
        let mut h = Harness::new(3, 0);
        h.complete(0);
        let running = h.dataset.tasks()[1].job_id().unwrap();
        let snapshot: QueueSnapshot = [(running, QueueState::Running)].into_iter().collect();
        h.reconcile(&snapshot).unwrap();

        let events = h
            .dataset
            .resubmit_missing(Some(&snapshot), &mut h.submitter, SystemTime::UNIX_EPOCH);
        assert_eq!(events.lines().len(), 1);
        assert_eq!(h.submitter.submitted, vec![0, 1, 2, 2]);
        // budget is untouched by operator resubmission:
        assert_eq!(h.dataset.tasks()[2].retry_budget(), 0);
    }
}
