//! Keeps large sets of batch-scheduler tasks moving: submits them, watches the
//! queue, resubmits the ones that get lost, and merges complete datasets.

/// High-level command line app
mod app;
/// Definition of command-line args
mod args;
/// Monitoring loop and merging
mod exec;
/// Filesystem operations
mod fs;
/// Reading the task manifest
mod manifest;
/// Combined command-line run settings
mod settings;
/// Text UI
mod ui;

// exported for tests:
pub use app::App;
pub use args::Args;
pub use exec::{Collaborators, LoopOptions, MergeManager, Orchestrator, Phase};
pub use fs::{CheckpointStore, Fs, FsOutputCheck, PersistenceError};
pub use manifest::Manifest;
pub use settings::{Answer, MergeSettings, Settings};
pub use ui::Ui;

/// Run the command-line app.
pub fn run() -> Result<(), anyhow::Error> {
    use clap::Parser;
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    simple_logging::log_to_stderr(log_level);

    // INTERPRET SETTINGS ///////////////
    let settings: Settings = args.try_into()?;

    // RUN THE THING /////////////////
    let app = App::new(settings);
    app.run()?;

    Ok(())
}
