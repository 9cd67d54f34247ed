use clap::{ArgAction, Parser};

const CMD_NAME: &str = "herd";
const DEFAULT_WORKDIR: &str = "workdir";

/// Stores our command-line args format.
#[derive(Parser)]
#[command(name = CMD_NAME, version, about = None, long_about = None)]
pub struct Args {
    /// Task manifest (JSON) listing datasets and their tasks
    #[arg(value_name = "MANIFEST")]
    pub manifest: String,

    /// Directory for checkpoint, missing-file list and merge logs
    #[arg(short, long, value_name = "DIR", default_value = DEFAULT_WORKDIR)]
    #[arg(env = "HERD_WORKDIR")]
    pub workdir: String,

    /// Submit tasks that have not been submitted yet
    #[arg(short, long)]
    pub submit: bool,

    /// Keep polling until every dataset is finished
    #[arg(short, long = "loop")]
    pub loop_check: bool,

    /// Resubmit every missing task that isn't healthy in the queue
    #[arg(short, long)]
    pub resubmit: bool,

    /// Merge each dataset's outputs once all tasks are done
    #[arg(short, long)]
    pub add: bool,

    /// Merge even if the merged file already exists
    #[arg(short, long)]
    pub force_merge: bool,

    /// Wait for merge processes to finish before exiting
    #[arg(long)]
    pub wait_merge: bool,

    /// Only merge histograms, not trees
    #[arg(long)]
    pub only_hists: bool,

    /// Answer yes to every question
    #[arg(short, long)]
    pub keep_going: bool,

    /// Exit with an error instead of asking a question
    #[arg(short, long)]
    pub exit_on_question: bool,

    /// Automatic resubmissions allowed per task (-1 for unlimited)
    #[arg(long, value_name = "N", default_value_t = 3, allow_negative_numbers = true)]
    pub retries: i32,

    /// Restore every task's retry budget after loading a checkpoint
    #[arg(long)]
    pub reset_retries: bool,

    /// Never resubmit automatically
    #[arg(long)]
    pub no_auto_resubmit: bool,

    /// Missed polls before a task that reached the queue is resubmitted
    #[arg(long, value_name = "N", default_value_t = tracker::DEFAULT_RESUBMIT_AFTER)]
    pub resubmit_after: u32,

    /// Missed polls before a task counts toward a stalled dataset
    #[arg(long, value_name = "N", default_value_t = tracker::DEFAULT_STALL_AFTER)]
    pub stall_after: u32,

    /// Share of all tasks that may be resubmitted before asking for confirmation
    #[arg(long, value_name = "RATIO", default_value_t = tracker::DEFAULT_MAX_RESUBMIT_RATIO)]
    pub max_resubmit_ratio: f64,

    /// Seconds between polls
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub poll_interval: u64,

    /// Seconds to wait after a failed queue query
    #[arg(long, value_name = "SECS", default_value_t = 60)]
    pub probe_backoff: u64,

    /// Extra seconds to wait after a cycle that resubmitted tasks
    #[arg(long, value_name = "SECS", default_value_t = 5)]
    pub resubmit_pause: u64,

    /// Queue query command
    #[arg(long, value_name = "CMD", default_value = "condor_q", env = "HERD_QUEUE_CMD")]
    pub queue_cmd: String,

    /// Job submission command
    #[arg(long, value_name = "CMD", default_value = "condor_submit", env = "HERD_SUBMIT_CMD")]
    pub submit_cmd: String,

    /// Job removal command
    #[arg(long, value_name = "CMD", default_value = "condor_rm", env = "HERD_REMOVE_CMD")]
    pub remove_cmd: String,

    /// Merge command, called as `CMD [-T] TARGET INPUTS...`
    #[arg(long, value_name = "CMD", default_value = "hadd", env = "HERD_MERGE_CMD")]
    pub merge_cmd: String,

    /// Print additional debugging info (repeat for more)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}
