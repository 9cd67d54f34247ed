/// Runs the monitoring loop
mod orchestrator;
pub use orchestrator::{Collaborators, LoopOptions, Orchestrator, Phase};

/// Merges complete datasets
mod merge;
pub use merge::MergeManager;

/// Run a subprocess
mod run_cmd;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Dataset {0} has no merge target")]
    NoMergeTarget(String),
    #[error("Merge of dataset {0} failed; see its merge logs in the work directory")]
    MergeFailed(String),
    #[error("Run aborted")]
    Aborted,
}
