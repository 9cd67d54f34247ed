use std::path::Path;
use std::process::Command;

use tracker::{JobId, SubmissionError, Submitter, TaskDescriptor};

use crate::cmd::{summarize, CommandLine};

/// Submits jobs with `condor_submit -terse` and removes them with `condor_rm`.
pub struct CondorSubmitter {
    submit_cmd: CommandLine,
    remove_cmd: CommandLine,
}

impl CondorSubmitter {
    pub fn new(submit_cmd: CommandLine, remove_cmd: CommandLine) -> Self {
        Self {
            submit_cmd,
            remove_cmd,
        }
    }

    fn run(&self, cmd: &mut Command, label: &CommandLine) -> Result<String, SubmissionError> {
        let output = cmd
            .output()
            .map_err(|e| SubmissionError::Spawn(label.to_string(), e))?;
        if !output.status.success() {
            return Err(SubmissionError::Failed(
                label.to_string(),
                format!("{}: {}", output.status, summarize(&output.stderr)),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Submitter for CondorSubmitter {
    fn submit(&mut self, task: &TaskDescriptor) -> Result<JobId, SubmissionError> {
        let mut cmd = self.submit_cmd.command();
        cmd.arg("-terse");
        // submit files refer to their neighbours by relative path:
        match (task.submit_file.parent(), task.submit_file.file_name()) {
            (Some(dir), Some(file)) if dir != Path::new("") => {
                cmd.current_dir(dir).arg(file);
            }
            _ => {
                cmd.arg(task.submit_file);
            }
        }
        let stdout = self.run(&mut cmd, &self.submit_cmd)?;
        let job = parse_terse(&stdout)?;
        log::info!("submitted {} task {} as job {job}", task.dataset, task.index);
        Ok(job)
    }

    fn remove(&mut self, job: JobId) -> Result<(), SubmissionError> {
        let mut cmd = self.remove_cmd.command();
        cmd.arg(job.to_string());
        self.run(&mut cmd, &self.remove_cmd)?;
        log::info!("removed job {job} from queue");
        Ok(())
    }
}

/// Get the first job id from `condor_submit -terse` output, e.g. `"1234.0 - 1234.0"`.
pub fn parse_terse(stdout: &str) -> Result<JobId, SubmissionError> {
    stdout
        .split_whitespace()
        .next()
        .and_then(|first| first.parse().ok())
        .ok_or_else(|| SubmissionError::NoJobId(summarize(stdout.as_bytes())))
}

#[cfg(test)]
mod test {
    use super::*;
    #[test]
    fn test_parse_terse() {
        assert_eq!(parse_terse("1234.0 - 1234.0\n").unwrap(), JobId::new(1234, 0));
        assert_eq!(parse_terse("88.3 - 88.3").unwrap(), JobId::new(88, 3));
        assert!(matches!(parse_terse(""), Err(SubmissionError::NoJobId(_))));
        assert!(matches!(
            parse_terse("ERROR: no such file"),
            Err(SubmissionError::NoJobId(_))
        ));
    }
}
