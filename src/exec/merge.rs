use std::path::{Path, PathBuf};
use std::process::{Child, Command};

use anyhow::Result;

use condor::CommandLine;
use tracker::{AggregationRequest, Aggregator};

use super::run_cmd::{spawn_logged, wait_logged};
use super::Error;
use crate::fs::Fs;
use crate::settings::MergeSettings;

/// Merges complete datasets in the background with the configured merge tool,
/// at reduced priority.
pub struct MergeManager<'a> {
    merge_cmd: CommandLine,
    settings: MergeSettings,
    fs: &'a Fs,
    running: Vec<(String, Child)>,
    pathbuf: PathBuf,
    verbose: bool,
}

impl<'a> MergeManager<'a> {
    pub fn new(
        merge_cmd: CommandLine,
        settings: MergeSettings,
        fs: &'a Fs,
        verbose: bool,
    ) -> Self {
        Self {
            merge_cmd,
            settings,
            fs,
            running: Vec::new(),
            pathbuf: PathBuf::with_capacity(256),
            verbose,
        }
    }

    /// `nice -n 10 <merge-cmd> [-f] [-T] <target> <outputs...>`
    pub fn command(&self, request: &AggregationRequest, target: &Path) -> Command {
        let mut cmd = Command::new("nice");
        cmd.args(["-n", "10"]);
        cmd.arg(self.merge_cmd.program());
        cmd.args(self.merge_cmd.args());
        if self.settings.force {
            cmd.arg("-f");
        }
        if self.settings.only_hists {
            cmd.arg("-T");
        }
        cmd.arg(target);
        cmd.args(&request.outputs);
        cmd
    }
}

impl Aggregator for MergeManager<'_> {
    fn is_merged(&self, target: &Path) -> bool {
        target.exists()
    }

    fn aggregate(&mut self, request: &AggregationRequest) -> Result<()> {
        let target = request
            .target
            .ok_or_else(|| Error::NoMergeTarget(request.dataset.to_owned()))?;
        log::info!(
            "merging {} outputs of {} into {:?}",
            request.task_count,
            request.dataset,
            target
        );

        let fs = self.fs;
        let out_file = fs.create_file(fs.merge_stdout(request.dataset, &mut self.pathbuf))?;
        let err_file = fs.create_file(fs.merge_stderr(request.dataset, &mut self.pathbuf))?;

        let mut cmd = self.command(request, target);
        let child = spawn_logged(&mut cmd, out_file, err_file, self.verbose)?;
        self.running.push((request.dataset.to_owned(), child));
        Ok(())
    }

    fn wait(&mut self) -> Result<()> {
        for (dataset, mut child) in self.running.drain(..) {
            eprintln!("Waiting for merge of {dataset}...");
            if !wait_logged(&dataset, &mut child, self.verbose)? {
                log::error!("{}", Error::MergeFailed(dataset));
            }
        }
        Ok(())
    }
}
