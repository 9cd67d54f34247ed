use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use colored::Colorize;

use tracker::{
    Aggregator, Confirm, Cycle, DatasetStatus, DatasetTracker, Events, OutputCheck,
    ProgressReport, QueueProbe, QueueSnapshot, ResubmitGuard, RetryPolicy, Submitter,
};
use util::Timer;

use crate::fs::{CheckpointStore, Fs};
use crate::settings::{MergeSettings, Settings};
use crate::ui::Ui;

use super::Error;

/// Where the loop is within a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initializing,
    Polling,
    Reconciling,
    Persisting,
    Reporting,
    Done,
}

/// The parts of `Settings` that drive the loop.
#[derive(Debug, Clone)]
pub struct LoopOptions {
    pub submit: bool,
    pub loop_check: bool,
    pub resubmit: bool,
    pub policy: RetryPolicy,
    pub max_resubmit_ratio: f64,
    pub merge: MergeSettings,
    pub poll_interval: Duration,
    pub probe_backoff: Duration,
    pub resubmit_pause: Duration,
}

impl From<&Settings> for LoopOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            submit: settings.submit,
            loop_check: settings.loop_check,
            resubmit: settings.resubmit,
            policy: settings.policy,
            max_resubmit_ratio: settings.max_resubmit_ratio,
            merge: settings.merge,
            poll_interval: settings.poll_interval,
            probe_backoff: settings.probe_backoff,
            resubmit_pause: settings.resubmit_pause,
        }
    }
}

/// Everything the loop talks to outside of its own state.
pub struct Collaborators<'a> {
    pub probe: &'a mut dyn QueueProbe,
    pub submitter: &'a mut dyn Submitter,
    pub outputs: &'a dyn OutputCheck,
    pub aggregator: &'a mut dyn Aggregator,
    pub confirm: &'a dyn Confirm,
}

/// How a single cycle went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    /// The queue could not be read; nothing was reconciled.
    ProbeFailed,
    Reconciled { resubmitted: usize },
}

/// Polls the scheduler, reconciles every dataset against the result, persists,
/// and reports, until every dataset is finished.
///
/// The orchestrator owns all trackers. One queue snapshot is taken per cycle and
/// shared by every dataset.
pub struct Orchestrator<'a> {
    datasets: Vec<DatasetTracker>,
    options: LoopOptions,
    with: Collaborators<'a>,
    store: CheckpointStore,
    fs: &'a Fs,
    ui: &'a Ui,
    /// run-wide count of autonomous resubmissions
    guard: ResubmitGuard,
    phase: Phase,
    cycle: usize,
    /// operator resubmission still to do (only happens once per run)
    resubmit_requested: bool,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        mut datasets: Vec<DatasetTracker>,
        options: LoopOptions,
        with: Collaborators<'a>,
        fs: &'a Fs,
        ui: &'a Ui,
    ) -> Self {
        let total = datasets.iter().map(|d| d.expected_tasks()).sum();
        if options.merge.force {
            for dataset in &mut datasets {
                dataset.request_reaggregation();
            }
        }
        Self {
            guard: ResubmitGuard::new(total, options.max_resubmit_ratio),
            resubmit_requested: options.resubmit,
            datasets,
            options,
            with,
            store: CheckpointStore::new(fs),
            fs,
            ui,
            phase: Phase::Initializing,
            cycle: 0,
        }
    }

    pub fn datasets(&self) -> &[DatasetTracker] {
        &self.datasets
    }

    pub fn into_datasets(self) -> Vec<DatasetTracker> {
        self.datasets
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Number of cycles run so far, including ones where the probe failed.
    pub fn cycles(&self) -> usize {
        self.cycle
    }

    pub fn guard(&self) -> &ResubmitGuard {
        &self.guard
    }

    pub fn all_finished(&self) -> bool {
        self.datasets.iter().all(|d| d.status().is_finished())
    }

    /// Run cycles until every dataset is finished, or just once if not looping.
    pub fn run(&mut self) -> Result<()> {
        let mut timer = Timer::now();
        loop {
            timer.reset();
            let outcome = self.run_cycle()?;
            self.ui
                .verbose_msg(&format!("Cycle took {:.1}s", timer.elapsed().as_secs_f64()));

            if !self.options.loop_check || self.all_finished() {
                break;
            }

            let wait = match outcome {
                Outcome::ProbeFailed => self.options.probe_backoff,
                Outcome::Reconciled { resubmitted: 0 } => self.options.poll_interval,
                Outcome::Reconciled { .. } => {
                    self.options.poll_interval + self.options.resubmit_pause
                }
            };
            std::thread::sleep(timer.remaining(wait));
        }
        self.finish()
    }

    fn run_cycle(&mut self) -> Result<Outcome> {
        self.cycle += 1;
        self.phase = Phase::Polling;
        self.ui.verbose_progress("Querying queue");
        let snapshot = match self.with.probe.poll() {
            Ok(snapshot) => {
                self.ui.done();
                log::debug!("queue holds {} jobs", snapshot.len());
                snapshot
            }
            Err(e) => {
                log::warn!("{e}");
                eprintln!(
                    "{} {}",
                    "Unable to query the queue; retrying after backoff:".yellow(),
                    e
                );
                self.resubmit_without_snapshot()?;
                return Ok(Outcome::ProbeFailed);
            }
        };

        self.phase = Phase::Reconciling;
        let mut events = Events::default();
        let now = SystemTime::now();

        if self.resubmit_requested {
            self.resubmit_requested = false;
            for dataset in &mut self.datasets {
                let submitter = &mut *self.with.submitter;
                events.append(dataset.resubmit_missing(Some(&snapshot), submitter, now));
            }
        }
        if self.options.submit {
            for dataset in &mut self.datasets {
                events.append(dataset.submit_pending(&mut *self.with.submitter, now));
            }
        }

        if let Err(e) = self.reconcile(&snapshot, now, &mut events) {
            self.ui.events(events.lines());
            self.persist();
            return Err(e).context(Error::Aborted);
        }

        if self.options.merge.enabled {
            self.aggregate_ready(&mut events);
        }

        let resubmitted = events.resubmitted();

        self.phase = Phase::Persisting;
        self.persist();

        self.phase = Phase::Reporting;
        self.ui.events(events.lines());
        self.ui.report(&ProgressReport::new(&self.datasets, self.cycle));

        Ok(Outcome::Reconciled { resubmitted })
    }

    fn reconcile(
        &mut self,
        snapshot: &QueueSnapshot,
        now: SystemTime,
        events: &mut Events,
    ) -> Result<()> {
        for dataset in &mut self.datasets {
            let mut cycle = Cycle {
                snapshot,
                outputs: self.with.outputs,
                submitter: &mut *self.with.submitter,
                confirm: self.with.confirm,
                guard: &mut self.guard,
                policy: self.options.policy,
                now,
            };
            let res = dataset.reconcile_all(&mut cycle);
            match res {
                Ok(new_events) => events.append(new_events),
                Err(e) => {
                    log::error!("{e}");
                    return Err(e.into());
                }
            }
        }
        Ok(())
    }

    /// Operator resubmission while the queue can't be read: the state of every job
    /// is unknown, so ask before resubmitting everything that isn't complete.
    fn resubmit_without_snapshot(&mut self) -> Result<()> {
        if !self.resubmit_requested {
            return Ok(());
        }
        self.resubmit_requested = false;
        let prompt = "The queue could not be read. Resubmit every incomplete task anyway?";
        if !self.with.confirm.confirm(prompt)? {
            eprintln!("Not resubmitting.");
            return Ok(());
        }

        let mut events = Events::default();
        let now = SystemTime::now();
        for dataset in &mut self.datasets {
            events.append(dataset.resubmit_missing(None, &mut *self.with.submitter, now));
        }
        self.ui.events(events.lines());
        self.persist();
        Ok(())
    }

    fn aggregate_ready(&mut self, events: &mut Events) {
        for dataset in self.datasets.iter_mut().filter(|d| d.ready_to_aggregate()) {
            let request = dataset.aggregation_request();
            if let Some(target) = request.target {
                if !self.options.merge.force && self.with.aggregator.is_merged(target) {
                    events.push(format!(
                        "{} is already merged into {:?}",
                        dataset.name(),
                        target
                    ));
                    dataset.mark_already_merged();
                    continue;
                }
            }
            match self.with.aggregator.aggregate(&request) {
                Ok(()) => {
                    events.push(format!("Merging {}", dataset.name()));
                    dataset.mark_merging();
                }
                Err(e) => {
                    log::warn!("{e:#}");
                    events.push(format!(
                        "Unable to start merging {}; will retry",
                        dataset.name()
                    ));
                }
            }
        }
    }

    /// Save all trackers and the missing-file list. Failures are reported loudly,
    /// but the run goes on with the previous checkpoint left in place.
    fn persist(&self) {
        if let Err(e) = self.store.save(&self.datasets) {
            log::error!("{e}");
            eprintln!("{} {}", "WARNING: checkpoint not saved:".red().bold(), e);
        }
        if let Err(e) = self.fs.write_missing_files(&self.datasets) {
            log::warn!("unable to write missing files list: {e:#}");
        }
    }

    fn finish(&mut self) -> Result<()> {
        self.phase = Phase::Done;
        if self.options.merge.wait {
            self.with.aggregator.wait()?;
        }

        let failed: Vec<&str> = self
            .datasets
            .iter()
            .filter(|d| d.status() == DatasetStatus::Failed)
            .map(|d| d.name())
            .collect();
        if !failed.is_empty() {
            eprintln!("{} {}", "Failed datasets:".red(), failed.join(", "));
        } else if self.all_finished() {
            eprintln!("{}", "All datasets finished.".green());
        }
        Ok(())
    }
}
