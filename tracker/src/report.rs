use crate::{DatasetStatus, DatasetTracker};

/// One line of the progress report.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetProgress {
    pub name: String,
    pub completed: usize,
    pub total: usize,
    pub status: DatasetStatus,
}

impl DatasetProgress {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            100.0 * self.completed as f64 / self.total as f64
        }
    }
}

impl From<&DatasetTracker> for DatasetProgress {
    fn from(dataset: &DatasetTracker) -> Self {
        Self {
            name: dataset.name().to_owned(),
            completed: dataset.completed_count(),
            total: dataset.expected_tasks(),
            status: dataset.status(),
        }
    }
}

/// Snapshot of progress across the whole run, ready to be rendered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressReport {
    pub datasets: Vec<DatasetProgress>,
    /// number of completed polling cycles
    pub cycle: usize,
}

impl ProgressReport {
    pub fn new<'a>(datasets: impl IntoIterator<Item = &'a DatasetTracker>, cycle: usize) -> Self {
        Self {
            datasets: datasets.into_iter().map(DatasetProgress::from).collect(),
            cycle,
        }
    }

    pub fn completed(&self) -> usize {
        self.datasets.iter().map(|d| d.completed).sum()
    }

    pub fn total(&self) -> usize {
        self.datasets.iter().map(|d| d.total).sum()
    }

    pub fn all_finished(&self) -> bool {
        self.datasets.iter().all(|d| d.status.is_finished())
    }
}
