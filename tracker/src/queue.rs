use util::HashMap;

use crate::JobId;

/// Normalized state of a job as reported by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    Idle,
    Running,
    /// Finished, but not yet removed from the queue.
    Completed,
    /// Anything else: held, removed, suspended, transferring...
    Unknown,
}

impl QueueState {
    /// Interpret an HTCondor `JobStatus` code.
    pub fn from_condor_code(code: i64) -> Self {
        match code {
            1 => Self::Idle,
            2 => Self::Running,
            4 => Self::Completed,
            _ => Self::Unknown,
        }
    }

    pub fn is_healthy(self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

/// What the queue snapshot says about one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskQueueState {
    NotFound,
    InQueueHealthy,
    InQueueError,
}

/// Immutable view of every job the scheduler knew about at one point in time.
#[derive(Debug, Default, Clone)]
pub struct QueueSnapshot {
    jobs: HashMap<JobId, QueueState>,
}

impl QueueSnapshot {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            jobs: util::map_with_capacity(cap),
        }
    }

    /// Record a job's state. If the job is already present, the first entry wins
    /// and this returns false.
    pub fn insert(&mut self, job: JobId, state: QueueState) -> bool {
        use std::collections::hash_map::Entry;
        match self.jobs.entry(job) {
            Entry::Occupied(_) => false,
            Entry::Vacant(e) => {
                e.insert(state);
                true
            }
        }
    }

    pub fn get(&self, job: &JobId) -> Option<QueueState> {
        self.jobs.get(job).copied()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Classify a job against this snapshot. Tasks with no job are never in the queue.
    pub fn classify(&self, job: Option<JobId>) -> TaskQueueState {
        match job.and_then(|job| self.get(&job)) {
            None => TaskQueueState::NotFound,
            Some(state) if state.is_healthy() => TaskQueueState::InQueueHealthy,
            Some(_) => TaskQueueState::InQueueError,
        }
    }
}

impl FromIterator<(JobId, QueueState)> for QueueSnapshot {
    fn from_iter<T: IntoIterator<Item = (JobId, QueueState)>>(iter: T) -> Self {
        let mut snapshot = Self::default();
        for (job, state) in iter {
            snapshot.insert(job, state);
        }
        snapshot
    }
}

#[cfg(test)]
mod test {
    use super::*;
    #[test]
    fn test_condor_codes() {
        assert_eq!(QueueState::from_condor_code(1), QueueState::Idle);
        assert_eq!(QueueState::from_condor_code(2), QueueState::Running);
        assert_eq!(QueueState::from_condor_code(4), QueueState::Completed);
        for code in [0, 3, 5, 6, 7, -1] {
            assert_eq!(QueueState::from_condor_code(code), QueueState::Unknown);
        }
    }
    #[test]
    fn test_classify() {
        let snapshot: QueueSnapshot = [
            (JobId::new(10, 0), QueueState::Idle),
            (JobId::new(10, 1), QueueState::Running),
            (JobId::new(10, 2), QueueState::Completed),
            (JobId::new(10, 3), QueueState::Unknown),
        ]
        .into_iter()
        .collect();

        use TaskQueueState::*;
        assert_eq!(snapshot.classify(Some(JobId::new(10, 0))), InQueueHealthy);
        assert_eq!(snapshot.classify(Some(JobId::new(10, 1))), InQueueHealthy);
        assert_eq!(snapshot.classify(Some(JobId::new(10, 2))), InQueueHealthy);
        assert_eq!(snapshot.classify(Some(JobId::new(10, 3))), InQueueError);
        assert_eq!(snapshot.classify(Some(JobId::new(11, 0))), NotFound);
        assert_eq!(snapshot.classify(None), NotFound);
    }
    #[test]
    fn test_duplicate_keeps_first() {
        let mut snapshot = QueueSnapshot::with_capacity(2);
        assert!(snapshot.insert(JobId::new(1, 0), QueueState::Running));
        assert!(!snapshot.insert(JobId::new(1, 0), QueueState::Unknown));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.get(&JobId::new(1, 0)), Some(QueueState::Running));
    }
}
