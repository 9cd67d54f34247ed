use std::fs::File;
use std::process::{Child, Command, Stdio};

use anyhow::{Context, Result};
use colored::Colorize;

/// Start a subprocess with its stdout and stderr going to the given files.
/// Does not wait for it to finish.
pub fn spawn_logged(
    cmd: &mut Command,
    out_file: File,
    err_file: File,
    verbose: bool,
) -> Result<Child> {
    if verbose {
        eprintln!(
            "{} {:?} {:?}",
            "Starting".magenta(),
            cmd.get_program(),
            cmd.get_args().collect::<Vec<_>>(),
        );
    }
    let child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::from(out_file))
        .stderr(Stdio::from(err_file))
        .spawn()
        .with_context(|| format!("failed to execute child process {:?}", cmd.get_program()))?;
    Ok(child)
}

/// Wait for a subprocess started with [`spawn_logged`].
pub fn wait_logged(name: &str, child: &mut Child, verbose: bool) -> Result<bool> {
    let status = child
        .wait()
        .with_context(|| format!("waiting on child process for {name}"))?;
    if verbose {
        eprintln!("{} {name} with {status}.", "Process finished".green());
    }
    Ok(status.success())
}
