use std::cell::RefCell;

use anyhow::Result;
use colored::{ColoredString, Colorize};

use tracker::{Confirm, DatasetStatus, ProgressReport};

use crate::settings::{Answer, Settings};

const SPINNER: [char; 4] = ['|', '/', '-', '\\'];

/// All interactions with the text UI should go through this struct.
pub struct Ui {
    /// -v setting, displays extra text info to user
    pub verbose: bool,
    /// -k and -e settings, decide what happens where the user would be prompted
    answer: Answer,
    /// buffer to hold strings internally when getting input
    strbuf: RefCell<String>,
}

impl Ui {
    pub fn new(settings: &Settings) -> Self {
        Self::with_answer(settings.answer, settings.verbose > 0)
    }

    pub fn with_answer(answer: Answer, verbose: bool) -> Self {
        Self {
            verbose,
            answer,
            // Refcell so we can call confirm() w/o needing a unique reference:
            strbuf: RefCell::new(String::with_capacity(16)),
        }
    }

    pub fn verbose_msg(&self, msg: &str) {
        if self.verbose {
            eprintln!("{}", msg);
        }
    }

    pub fn verbose_progress(&self, msg: &str) {
        if self.verbose {
            eprint!("{}... ", msg.magenta());
        }
    }

    pub fn done(&self) {
        if self.verbose {
            eprintln!("{}.", "done".green());
        }
    }

    pub fn events(&self, lines: &[String]) {
        for line in lines {
            eprintln!("{line}");
        }
    }

    /// Print the status table for one cycle.
    pub fn report(&self, report: &ProgressReport) {
        eprintln!(
            "{:>30}: {:>6} {:>6} {:>5}",
            "Sample Name", "Ready", "#Files", "[%]"
        );
        for row in &report.datasets {
            eprintln!(
                "{:>30}: {:>6} {:>6} {:>5.1} {}",
                row.name,
                row.completed,
                row.total,
                row.percent(),
                status_label(row.status),
            );
        }
        let spin = SPINNER[report.cycle % SPINNER.len()];
        let (completed, total) = (report.completed(), report.total());
        let percent = if total == 0 {
            100.0
        } else {
            100.0 * completed as f64 / total as f64
        };
        eprintln!("Number of files: {completed}/{total} ({percent:.1}%) {spin}");
        eprintln!("{}", "=".repeat(80));
    }
}

impl Confirm for Ui {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        match self.answer {
            Answer::Yes => return Ok(true),
            Answer::Exit => {
                eprintln!("{} {}", prompt, "(exiting on question)".red());
                return Ok(false);
            }
            Answer::Ask => (),
        }
        eprintln!("{} (y/N)", prompt);

        let mut strbuf = self.strbuf.borrow_mut();

        strbuf.clear();
        std::io::stdin().read_line(&mut strbuf)?;
        match strbuf.trim_start().chars().next() {
            Some('y') | Some('Y') => Ok(true),
            _ => Ok(false),
        }
    }
}

fn status_label(status: DatasetStatus) -> ColoredString {
    let label = status.label();
    match status {
        DatasetStatus::Working => label.blue(),
        DatasetStatus::AllTransferred => label.green(),
        DatasetStatus::Merging | DatasetStatus::AlreadyMerged => label.normal(),
        DatasetStatus::Failed => label.red(),
    }
}
