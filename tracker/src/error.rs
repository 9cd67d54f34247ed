#[derive(thiserror::Error, Debug)]
pub enum ProbeError {
    #[error("Unable to run scheduler query \"{0}\"")]
    Spawn(String, #[source] std::io::Error),
    #[error("Scheduler query \"{0}\" failed: {1}")]
    Failed(String, String),
    #[error("Unable to parse scheduler query output: {0}")]
    Parse(String),
}

#[derive(thiserror::Error, Debug)]
pub enum SubmissionError {
    #[error("Unable to run submission command \"{0}\"")]
    Spawn(String, #[source] std::io::Error),
    #[error("Submission command \"{0}\" failed: {1}")]
    Failed(String, String),
    #[error("No job id in submission output: \"{0}\"")]
    NoJobId(String),
}

/// The run-wide resubmission rate went over its limit and nobody approved continuing.
#[derive(thiserror::Error, Debug)]
#[error(
    "{resubmitted} of {total} tasks were resubmitted, more than {limit_percent:.0}%; \
     refusing to resubmit more without confirmation"
)]
pub struct PolicyViolation {
    pub resubmitted: usize,
    pub total: usize,
    pub limit_percent: f64,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Policy(#[from] PolicyViolation),
    #[error("Dataset \"{0}\" stalled: nothing is running and {1} tasks are missing")]
    Stalled(String, usize),
    #[error("Unable to get confirmation from operator")]
    Confirm(#[source] anyhow::Error),
}
