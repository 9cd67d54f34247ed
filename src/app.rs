use anyhow::{Context, Result};
use colored::Colorize;

use condor::{CondorProbe, CondorSubmitter};
use tracker::{Confirm, DatasetTracker};

use crate::exec::{Collaborators, LoopOptions, MergeManager, Orchestrator};
use crate::fs::{CheckpointStore, Fs, FsOutputCheck};
use crate::manifest::{self, Manifest};
use crate::settings::Settings;
use crate::ui::Ui;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Checkpoint could not be loaded and starting over was declined")]
    CheckpointDeclined,
}

/// This struct actually runs the command-line app.
pub struct App {
    /// Interpreted command line settings
    settings: Settings,
    /// Filesystem interface
    fs: Fs,
    /// User interface
    ui: Ui,
}

impl App {
    /// Create a new `App`.
    pub fn new(settings: Settings) -> Self {
        let fs = Fs::new(&settings.workdir);
        let ui = Ui::new(&settings);
        Self { settings, fs, ui }
    }

    /// Run the app: load state, then hand it to the monitoring loop.
    pub fn run(mut self) -> Result<()> {
        self.ui
            .verbose_msg(&format!("Using work directory {:?}", self.settings.workdir));
        self.fs.ensure_workdir_exists(self.ui.verbose)?;

        let datasets = self.load_datasets()?;
        if datasets.is_empty() {
            eprintln!("{}", "Nothing to do: the manifest has no tasks.".yellow());
            return Ok(());
        }

        let mut probe = CondorProbe::new(self.settings.queue_cmd.clone());
        let mut submitter = CondorSubmitter::new(
            self.settings.submit_cmd.clone(),
            self.settings.remove_cmd.clone(),
        );
        let mut merger = MergeManager::new(
            self.settings.merge_cmd.clone(),
            self.settings.merge,
            &self.fs,
            self.ui.verbose,
        );

        let with = Collaborators {
            probe: &mut probe,
            submitter: &mut submitter,
            outputs: &FsOutputCheck,
            aggregator: &mut merger,
            confirm: &self.ui,
        };
        let options = LoopOptions::from(&self.settings);
        let mut orchestrator = Orchestrator::new(datasets, options, with, &self.fs, &self.ui);
        orchestrator.run()
    }

    /// Trackers from the manifest, replaced by checkpointed state where there is any.
    fn load_datasets(&self) -> Result<Vec<DatasetTracker>> {
        self.ui.verbose_progress("Reading manifest");
        let manifest = Manifest::load(&self.settings.manifest)?;
        let fresh = manifest.into_trackers(self.settings.retries, self.fs.workdir())?;
        self.ui.done();

        let store = CheckpointStore::new(&self.fs);
        let mut datasets = match store.load() {
            Ok(Some(saved)) => {
                self.ui
                    .verbose_msg(&format!("Resuming from checkpoint {:?}", store.path()));
                manifest::merge_checkpoint(fresh, saved)
            }
            Ok(None) => fresh,
            Err(e) => {
                eprintln!("{} {}", "WARNING:".red().bold(), e);
                let prompt = "Start over, ignoring the checkpoint? It will be overwritten.";
                if !self.ui.confirm(prompt).context("asking about checkpoint")? {
                    return Err(Error::CheckpointDeclined.into());
                }
                fresh
            }
        };

        if self.settings.reset_retries {
            log::info!("resetting retry budgets to {}", self.settings.retries);
            for dataset in &mut datasets {
                dataset.reset_budgets(self.settings.retries);
            }
        }
        Ok(datasets)
    }
}
