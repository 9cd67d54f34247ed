//! HTCondor implementations of the scheduler collaborators.

/// Configurable external commands
mod cmd;
pub use cmd::CommandLine;

/// Querying the queue with `condor_q`
mod probe;
pub use probe::{parse_queue, CondorProbe};

/// Submitting and removing jobs
mod submit;
pub use submit::{parse_terse, CondorSubmitter};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Empty command line for {0}")]
    EmptyCommand(&'static str),
}
