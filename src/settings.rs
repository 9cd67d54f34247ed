use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

use condor::CommandLine;
use tracker::{RetryPolicy, UNLIMITED_RETRIES};

use crate::args::Args;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Manifest file {0:?} does not exist")]
    ManifestNotFound(PathBuf),
    #[error("Invalid retry count {0} (should be -1 for unlimited, or 0 or more)")]
    InvalidRetries(i32),
    #[error("Invalid resubmit ratio {0} (should be greater than 0 and at most 1)")]
    InvalidRatio(f64),
    #[error("--keep-going and --exit-on-question can't be used together")]
    ConflictingAnswers,
}

/// How to answer questions that would otherwise block on the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    /// Ask on the terminal.
    Ask,
    /// Always continue.
    Yes,
    /// Abort the run.
    Exit,
}

/// What to do about merging complete datasets.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeSettings {
    pub enabled: bool,
    pub force: bool,
    pub wait: bool,
    pub only_hists: bool,
}

/// Settings are like Args, except all the logic has
/// been applied so e.g. defaults are added in.
#[derive(Debug)]
pub struct Settings {
    pub manifest: PathBuf,
    pub workdir: PathBuf,
    pub verbose: u8,
    pub answer: Answer,

    pub submit: bool,
    pub loop_check: bool,
    pub resubmit: bool,

    pub retries: i32,
    pub reset_retries: bool,
    pub policy: RetryPolicy,
    pub max_resubmit_ratio: f64,

    pub poll_interval: Duration,
    pub probe_backoff: Duration,
    pub resubmit_pause: Duration,

    pub merge: MergeSettings,

    pub queue_cmd: CommandLine,
    pub submit_cmd: CommandLine,
    pub remove_cmd: CommandLine,
    pub merge_cmd: CommandLine,
}

impl TryFrom<Args> for Settings {
    type Error = anyhow::Error;
    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let manifest = PathBuf::from(&args.manifest);
        if !manifest.is_file() {
            return Err(Error::ManifestNotFound(manifest).into());
        }

        if args.retries < UNLIMITED_RETRIES {
            return Err(Error::InvalidRetries(args.retries).into());
        }

        if !(args.max_resubmit_ratio > 0.0 && args.max_resubmit_ratio <= 1.0) {
            return Err(Error::InvalidRatio(args.max_resubmit_ratio).into());
        }

        let answer = match (args.keep_going, args.exit_on_question) {
            (true, true) => return Err(Error::ConflictingAnswers.into()),
            (true, false) => Answer::Yes,
            (false, true) => Answer::Exit,
            (false, false) => Answer::Ask,
        };

        if args.stall_after < args.resubmit_after {
            log::warn!(
                "--stall-after ({}) is below --resubmit-after ({}); datasets may fail before tasks are resubmitted",
                args.stall_after,
                args.resubmit_after,
            );
        }

        Ok(Self {
            manifest,
            workdir: PathBuf::from(&args.workdir),
            verbose: args.verbose,
            answer,

            submit: args.submit,
            loop_check: args.loop_check,
            resubmit: args.resubmit,

            retries: args.retries,
            reset_retries: args.reset_retries,
            policy: RetryPolicy {
                resubmit_after: args.resubmit_after,
                stall_after: args.stall_after,
                auto_resubmit: !args.no_auto_resubmit,
            },
            max_resubmit_ratio: args.max_resubmit_ratio,

            poll_interval: Duration::from_secs(args.poll_interval),
            probe_backoff: Duration::from_secs(args.probe_backoff),
            resubmit_pause: Duration::from_secs(args.resubmit_pause),

            merge: MergeSettings {
                enabled: args.add || args.force_merge,
                force: args.force_merge,
                wait: args.wait_merge,
                only_hists: args.only_hists,
            },

            queue_cmd: CommandLine::parse(&args.queue_cmd, "queue query")?,
            submit_cmd: CommandLine::parse(&args.submit_cmd, "submission")?,
            remove_cmd: CommandLine::parse(&args.remove_cmd, "removal")?,
            merge_cmd: CommandLine::parse(&args.merge_cmd, "merge")?,
        })
    }
}
